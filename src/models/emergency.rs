use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::professional::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    General,
    Medical,
    Security,
    Accident,
}

impl AlertType {
    pub fn priority(self) -> AlertPriority {
        match self {
            AlertType::Medical | AlertType::Accident => AlertPriority::Critical,
            AlertType::General | AlertType::Security => AlertPriority::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::General => "general",
            AlertType::Medical => "medical",
            AlertType::Security => "security",
            AlertType::Accident => "accident",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub id: String,
    pub professional_id: String,
    pub alert_type: AlertType,
    pub location: GeoPoint,
    pub message: String,
    pub priority: AlertPriority,
    pub status: AlertStatus,
    pub notified: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medical_and_accident_are_critical() {
        assert_eq!(AlertType::Medical.priority(), AlertPriority::Critical);
        assert_eq!(AlertType::Accident.priority(), AlertPriority::Critical);
        assert_eq!(AlertType::Security.priority(), AlertPriority::High);
        assert_eq!(AlertType::General.priority(), AlertPriority::High);
    }
}
