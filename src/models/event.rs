use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::EtaEstimate;
use crate::models::emergency::EmergencyAlert;
use crate::models::geofence::GeofenceEvent;
use crate::models::job::JobStatus;

/// Everything fanned out to the notification collaborator once committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    JobStatusChanged {
        job_id: String,
        professional_id: Option<String>,
        status: JobStatus,
        at: DateTime<Utc>,
    },
    LocationDelta {
        professional_id: String,
        job_id: Option<String>,
        geofence_events: Vec<GeofenceEvent>,
        eta: Option<EtaEstimate>,
    },
    Arrived {
        job_id: String,
        professional_id: String,
        at: DateTime<Utc>,
    },
    Emergency {
        alert: EmergencyAlert,
    },
}

impl DispatchEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchEvent::JobStatusChanged { .. } => "job_status_changed",
            DispatchEvent::LocationDelta { .. } => "location_delta",
            DispatchEvent::Arrived { .. } => "arrived",
            DispatchEvent::Emergency { .. } => "emergency",
        }
    }
}
