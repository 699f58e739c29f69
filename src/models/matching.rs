use serde::{Deserialize, Serialize};

use crate::models::job::Job;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub distance_score: f64,
    pub service_score: f64,
    pub rating_score: f64,
    pub value_score: f64,
    pub availability_score: f64,
    pub urgency_bonus: f64,
    pub customer_rating_bonus: f64,
    pub specialization_bonus: f64,
}

impl ScoreBreakdown {
    pub fn raw_total(&self) -> f64 {
        self.distance_score
            + self.service_score
            + self.rating_score
            + self.value_score
            + self.availability_score
            + self.urgency_bonus
            + self.customer_rating_bonus
            + self.specialization_bonus
    }
}

/// A scored (professional, job) pair. Derived per request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    #[serde(flatten)]
    pub job: Job,
    pub match_score: f64,
    /// Kilometres from the professional's position to the job.
    pub distance: f64,
    /// Minutes at the assumed urban speed.
    pub travel_time: f64,
    pub earnings_potential: f64,
    pub score_breakdown: ScoreBreakdown,
}
