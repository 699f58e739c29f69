use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Last reported fix of a professional's device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    /// Metres per second, as reported by the device.
    #[serde(default)]
    pub speed: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub rating: f64,
    pub service_radius_km: f64,
    #[serde(default)]
    pub has_vehicle: bool,
    #[serde(default)]
    pub has_equipment: bool,
    pub updated_at: DateTime<Utc>,
}

impl Professional {
    pub fn offers(&self, service_type: &str) -> bool {
        self.capabilities
            .iter()
            .any(|capability| capability.eq_ignore_ascii_case(service_type))
    }

    pub fn specializes_in_any(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| {
            self.specializations
                .iter()
                .any(|specialization| specialization.eq_ignore_ascii_case(tag))
        })
    }

    pub fn holds_all(&self, certifications: &[String]) -> bool {
        certifications
            .iter()
            .all(|required| self.certifications.iter().any(|held| held == required))
    }
}
