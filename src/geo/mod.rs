use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::professional::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;
pub const URBAN_AVERAGE_SPEED_KMH: f64 = 40.0;

pub fn validate(lat: f64, lng: f64) -> Result<GeoPoint, AppError> {
    let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
    let lng_ok = lng.is_finite() && (-180.0..=180.0).contains(&lng);

    if lat_ok && lng_ok {
        Ok(GeoPoint { lat, lng })
    } else {
        Err(AppError::InvalidCoordinates { lat, lng })
    }
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * central_angle
}

/// Great-circle distance with coordinate validation.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Result<f64, AppError> {
    let a = validate(lat1, lng1)?;
    let b = validate(lat2, lng2)?;
    Ok(haversine_km(&a, &b))
}

pub fn travel_time_minutes(distance_km: f64) -> f64 {
    distance_km.max(0.0) / URBAN_AVERAGE_SPEED_KMH * 60.0
}

/// Source of the congestion multiplier applied on top of the base estimate.
pub trait TrafficProvider: Send + Sync {
    fn multiplier(&self, from: &GeoPoint, to: &GeoPoint, at: DateTime<Utc>) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct StaticTraffic(pub f64);

impl TrafficProvider for StaticTraffic {
    fn multiplier(&self, _from: &GeoPoint, _to: &GeoPoint, _at: DateTime<Utc>) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EtaEstimate {
    pub distance_km: f64,
    pub duration_no_traffic_mins: f64,
    pub duration_with_traffic_mins: f64,
    pub arrival: DateTime<Utc>,
}

pub fn eta_with_traffic(
    from: &GeoPoint,
    to: &GeoPoint,
    traffic: &dyn TrafficProvider,
    now: DateTime<Utc>,
) -> EtaEstimate {
    let distance_km = haversine_km(from, to);
    let base = travel_time_minutes(distance_km);
    let multiplier = traffic.multiplier(from, to, now).max(1.0);
    let with_traffic = base * multiplier;

    EtaEstimate {
        distance_km,
        duration_no_traffic_mins: base,
        duration_with_traffic_mins: with_traffic,
        arrival: now + Duration::seconds((with_traffic * 60.0).round() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: -33.8820,
            lng: 151.2069,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let distance = distance_km(51.5074, -0.1278, 48.8566, 2.3522).unwrap();
        assert!((distance - 343.0).abs() < 5.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            ((-33.8820, 151.2069), (-33.8915, 151.2767)),
            ((51.5074, -0.1278), (40.7128, -74.0060)),
            ((89.9, 179.9), (-89.9, -179.9)),
        ];
        for ((a_lat, a_lng), (b_lat, b_lng)) in pairs {
            let ab = distance_km(a_lat, a_lng, b_lat, b_lng).unwrap();
            let ba = distance_km(b_lat, b_lng, a_lat, a_lng).unwrap();
            assert_eq!(ab, ba);
        }
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(matches!(
            distance_km(91.0, 0.0, 0.0, 0.0),
            Err(AppError::InvalidCoordinates { .. })
        ));
        assert!(distance_km(0.0, 0.0, 0.0, -180.5).is_err());
        assert!(distance_km(f64::NAN, 0.0, 0.0, 0.0).is_err());
        assert!(distance_km(90.0, 180.0, -90.0, -180.0).is_ok());
    }

    #[test]
    fn travel_time_assumes_forty_kmh() {
        assert_eq!(travel_time_minutes(40.0), 60.0);
        assert_eq!(travel_time_minutes(10.0), 15.0);
        assert_eq!(travel_time_minutes(0.0), 0.0);
    }

    #[test]
    fn traffic_multiplier_stretches_duration() {
        let now = Utc::now();
        let from = GeoPoint::new(-33.8820, 151.2069);
        let to = GeoPoint::new(-33.8915, 151.2767);

        let eta = eta_with_traffic(&from, &to, &StaticTraffic(1.5), now);

        assert!((eta.duration_with_traffic_mins - eta.duration_no_traffic_mins * 1.5).abs() < 1e-9);
        assert!(eta.arrival > now);
    }
}
