pub mod emergency;
pub mod event;
pub mod geofence;
pub mod job;
pub mod matching;
pub mod professional;
pub mod tracking;
