use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::professional::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeofenceZone {
    pub id: String,
    pub name: String,
    pub center: GeoPoint,
    pub radius_km: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceTransition {
    Entered,
    Exited,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeofenceEvent {
    pub zone_id: String,
    pub zone_name: String,
    pub transition: GeofenceTransition,
    pub at: DateTime<Utc>,
}
