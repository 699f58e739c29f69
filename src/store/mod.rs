pub mod calendar;
pub mod memory;
pub mod zones;

use crate::error::AppError;
use crate::models::job::Job;
use crate::models::professional::{Location, Professional};

pub use calendar::{AlwaysAvailable, AvailabilityOracle, CalendarAvailability};
pub use memory::{MemoryJobStore, MemoryProfessionalStore};
pub use zones::{StaticZones, ZoneDirectory};

/// Job records. Status is written only through `compare_and_swap`.
pub trait JobStore: Send + Sync {
    fn fetch_job(&self, job_id: &str) -> Option<Job>;

    /// Jobs a professional could still take (available or offered).
    fn fetch_candidate_jobs(&self) -> Vec<Job>;

    fn list_jobs(&self) -> Vec<Job>;

    fn insert_job(&self, job: Job) -> Result<(), AppError>;

    /// Replace the stored job with `next` iff its version still equals
    /// `expected_version`. Returns whether the write happened.
    fn compare_and_swap(&self, expected_version: u64, next: Job) -> bool;
}

pub trait ProfessionalStore: Send + Sync {
    fn fetch_professional(&self, professional_id: &str) -> Option<Professional>;

    fn list_professionals(&self) -> Vec<Professional>;

    fn upsert_professional(&self, professional: Professional);

    fn update_location(&self, professional_id: &str, location: Location) -> Result<(), AppError>;
}
