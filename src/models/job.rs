use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::professional::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Available,
    Offered,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
    Declined,
    Expired,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Declined | JobStatus::Expired
        )
    }

    /// Statuses from which a professional can still take the job.
    pub fn is_open(self) -> bool {
        matches!(self, JobStatus::Available | JobStatus::Offered)
    }

    /// Whether the job holds a professional (accepted or on site).
    pub fn is_assigned(self) -> bool {
        matches!(self, JobStatus::Accepted | JobStatus::InProgress)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;

        matches!(
            (self, next),
            (Available, Offered)
                | (Available, Accepted)
                | (Offered, Accepted)
                | (Offered, Declined)
                | (Offered, Expired)
                | (Accepted, InProgress)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Available => "available",
            JobStatus::Offered => "offered",
            JobStatus::Accepted => "accepted",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Declined => "declined",
            JobStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub service_type: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub address: Option<String>,
    pub window: TimeWindow,
    pub amount: f64,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub customer_rating: f64,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub required_certifications: Vec<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    pub status: JobStatus,
    #[serde(default)]
    pub assigned_professional: Option<String>,
    #[serde(default)]
    pub offered_to: Option<String>,
    #[serde(default)]
    pub offer_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub arrived_at: Option<DateTime<Utc>>,
    /// Bumped on every committed transition; the optimistic concurrency guard.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::JobStatus::*;

    #[test]
    fn terminal_states_have_no_exits() {
        let all = [
            Available, Offered, Accepted, InProgress, Completed, Cancelled, Declined, Expired,
        ];
        for from in [Completed, Cancelled, Declined, Expired] {
            assert!(from.is_terminal());
            for to in all {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn lifecycle_follows_the_happy_path() {
        assert!(Available.can_transition_to(Accepted));
        assert!(Offered.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Available.can_transition_to(InProgress));
        assert!(!Accepted.can_transition_to(Available));
    }

    #[test]
    fn only_started_jobs_can_be_cancelled() {
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!Accepted.can_transition_to(Cancelled));
        assert!(!Offered.can_transition_to(Cancelled));
        assert!(!Available.can_transition_to(Cancelled));
    }

    #[test]
    fn status_serializes_snake_case() {
        let raw = serde_json::to_string(&InProgress).unwrap();
        assert_eq!(raw, "\"in_progress\"");
        assert_eq!(InProgress.as_str(), "in_progress");
    }
}
