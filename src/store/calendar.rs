use dashmap::DashMap;

use crate::models::job::{Job, TimeWindow};

/// Answers whether a professional is free for a job's time window.
pub trait AvailabilityOracle: Send + Sync {
    fn is_available(&self, professional_id: &str, job: &Job) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAvailable;

impl AvailabilityOracle for AlwaysAvailable {
    fn is_available(&self, _professional_id: &str, _job: &Job) -> bool {
        true
    }
}

/// Calendar of blocked windows per professional.
#[derive(Default)]
pub struct CalendarAvailability {
    blocked: DashMap<String, Vec<TimeWindow>>,
}

impl CalendarAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, professional_id: &str, window: TimeWindow) {
        self.blocked
            .entry(professional_id.to_string())
            .or_default()
            .push(window);
    }
}

impl AvailabilityOracle for CalendarAvailability {
    fn is_available(&self, professional_id: &str, job: &Job) -> bool {
        self.blocked
            .get(professional_id)
            .map(|windows| !windows.iter().any(|window| window.overlaps(&job.window)))
            .unwrap_or(true)
    }
}
