use chrono::{Duration, Utc};

use crate::models::job::{Job, JobStatus, TimeWindow};
use crate::models::professional::{GeoPoint, Location, Professional};

pub fn professional(id: &str, lat: f64, lng: f64) -> Professional {
    let now = Utc::now();
    Professional {
        id: id.to_string(),
        name: format!("Pro {id}"),
        location: Some(Location {
            lat,
            lng,
            accuracy: Some(5.0),
            heading: None,
            speed: None,
            recorded_at: now,
        }),
        capabilities: vec!["cleaning".to_string(), "gardening".to_string()],
        specializations: vec![],
        certifications: vec![],
        rating: 4.9,
        service_radius_km: 25.0,
        has_vehicle: true,
        has_equipment: true,
        updated_at: now,
    }
}

pub fn job(id: &str, lat: f64, lng: f64) -> Job {
    let now = Utc::now();
    Job {
        id: id.to_string(),
        service_type: "cleaning".to_string(),
        location: GeoPoint::new(lat, lng),
        address: None,
        window: TimeWindow {
            start: now + Duration::hours(2),
            end: now + Duration::hours(4),
        },
        amount: 85.0,
        urgent: false,
        customer_rating: 4.8,
        requirements: vec![],
        required_certifications: vec![],
        min_rating: None,
        status: JobStatus::Available,
        assigned_professional: None,
        offered_to: None,
        offer_expires_at: None,
        arrived_at: None,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}
