use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::professional::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Job,
    Patrol,
    Break,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSession {
    pub id: String,
    pub professional_id: String,
    pub job_id: Option<String>,
    pub session_type: SessionType,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub total_distance_km: f64,
    pub stops: u32,
    pub fixes: u32,
    pub first_point: Option<GeoPoint>,
    pub last_point: Option<GeoPoint>,
    #[serde(skip)]
    pub stationary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    /// Kilometres travelled.
    pub total_distance: f64,
    /// Seconds between start and stop.
    pub total_duration: i64,
    /// Kilometres per hour.
    pub average_speed: f64,
    pub stops: u32,
    pub efficiency_score: f64,
}
