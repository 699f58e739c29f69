use std::env;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::geofence::GeofenceZone;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub location_min_interval_secs: u64,
    pub accept_timeout_ms: u64,
    pub arrival_radius_km: f64,
    pub traffic_multiplier: f64,
    pub default_match_limit: usize,
    pub max_match_limit: usize,
    pub decline_cooldown_mins: i64,
    pub offer_ttl_secs: i64,
    pub offer_sweep_interval_secs: u64,
    pub platform_fee_rate: f64,
    pub nearby_help_radius_km: f64,
    pub geofence_zones: Vec<GeofenceZone>,
    pub emergency_contacts: Vec<EmergencyContact>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            location_min_interval_secs: 5,
            accept_timeout_ms: 2000,
            arrival_radius_km: 0.1,
            traffic_multiplier: 1.3,
            default_match_limit: 20,
            max_match_limit: 100,
            decline_cooldown_mins: 30,
            offer_ttl_secs: 300,
            offer_sweep_interval_secs: 15,
            platform_fee_rate: 0.15,
            nearby_help_radius_km: 5.0,
            geofence_zones: Vec::new(),
            emergency_contacts: default_emergency_contacts(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            location_min_interval_secs: parse_or_default(
                "LOCATION_MIN_INTERVAL_SECS",
                defaults.location_min_interval_secs,
            )?,
            accept_timeout_ms: parse_or_default("ACCEPT_TIMEOUT_MS", defaults.accept_timeout_ms)?,
            arrival_radius_km: parse_or_default("ARRIVAL_RADIUS_KM", defaults.arrival_radius_km)?,
            traffic_multiplier: parse_or_default(
                "TRAFFIC_MULTIPLIER",
                defaults.traffic_multiplier,
            )?,
            default_match_limit: parse_or_default(
                "DEFAULT_MATCH_LIMIT",
                defaults.default_match_limit,
            )?,
            max_match_limit: parse_or_default("MAX_MATCH_LIMIT", defaults.max_match_limit)?,
            decline_cooldown_mins: parse_or_default(
                "DECLINE_COOLDOWN_MINS",
                defaults.decline_cooldown_mins,
            )?,
            offer_ttl_secs: parse_or_default("OFFER_TTL_SECS", defaults.offer_ttl_secs)?,
            offer_sweep_interval_secs: parse_or_default(
                "OFFER_SWEEP_INTERVAL_SECS",
                defaults.offer_sweep_interval_secs,
            )?,
            platform_fee_rate: parse_or_default("PLATFORM_FEE_RATE", defaults.platform_fee_rate)?,
            nearby_help_radius_km: parse_or_default(
                "NEARBY_HELP_RADIUS_KM",
                defaults.nearby_help_radius_km,
            )?,
            geofence_zones: parse_json_or_default("GEOFENCE_ZONES", defaults.geofence_zones)?,
            emergency_contacts: parse_json_or_default(
                "EMERGENCY_CONTACTS",
                defaults.emergency_contacts,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.traffic_multiplier < 1.0 || !self.traffic_multiplier.is_finite() {
            return Err(AppError::Internal(
                "TRAFFIC_MULTIPLIER must be a finite value >= 1.0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.platform_fee_rate) {
            return Err(AppError::Internal(
                "PLATFORM_FEE_RATE must be in [0, 1)".to_string(),
            ));
        }
        if self.default_match_limit == 0 || self.default_match_limit > self.max_match_limit {
            return Err(AppError::Internal(
                "DEFAULT_MATCH_LIMIT must be in 1..=MAX_MATCH_LIMIT".to_string(),
            ));
        }
        if self.arrival_radius_km <= 0.0 {
            return Err(AppError::Internal(
                "ARRIVAL_RADIUS_KM must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_emergency_contacts() -> Vec<EmergencyContact> {
    vec![
        EmergencyContact {
            name: "Emergency Services".to_string(),
            phone: "000".to_string(),
        },
        EmergencyContact {
            name: "Dispatch Operations".to_string(),
            phone: "1300 000 111".to_string(),
        },
    ]
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_json_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    match env::var(key) {
        Ok(raw) => serde_json::from_str(&raw)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.location_min_interval_secs, 5);
        assert_eq!(config.arrival_radius_km, 0.1);
        assert_eq!(config.default_match_limit, 20);
    }

    #[test]
    fn traffic_multiplier_below_one_is_rejected() {
        let config = Config {
            traffic_multiplier: 0.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zones_parse_from_json() {
        let raw = r#"[{"id":"cbd","name":"Sydney CBD","center":{"lat":-33.87,"lng":151.21},"radius_km":1.5}]"#;
        let zones: Vec<GeofenceZone> = serde_json::from_str(raw).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].id, "cbd");
    }
}
