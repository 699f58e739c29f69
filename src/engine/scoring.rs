use crate::geo::haversine_km;
use crate::models::job::Job;
use crate::models::matching::ScoreBreakdown;
use crate::models::professional::{GeoPoint, Professional};

const DISTANCE_WEIGHT: f64 = 30.0;
const DISTANCE_DECAY_PER_KM: f64 = 2.0;
const SERVICE_WEIGHT: f64 = 25.0;
const RATING_WEIGHT: f64 = 20.0;
const VALUE_WEIGHT: f64 = 15.0;
const VALUE_PER_HUNDRED: f64 = 5.0;
const AVAILABILITY_WEIGHT: f64 = 10.0;

const URGENCY_BONUS: f64 = 5.0;
const CUSTOMER_RATING_BONUS: f64 = 3.0;
const CUSTOMER_RATING_THRESHOLD: f64 = 4.5;
const SPECIALIZATION_BONUS: f64 = 5.0;

pub const MAX_SCORE: f64 = 100.0;

/// Score a job for a professional standing at `position`.
///
/// `available` is the calendar answer for the job's window. The total is
/// capped at [`MAX_SCORE`] and is a pure function of its inputs.
pub fn compute_score(
    professional: &Professional,
    job: &Job,
    position: &GeoPoint,
    available: bool,
) -> (f64, ScoreBreakdown) {
    let distance_km = haversine_km(position, &job.location);

    let breakdown = ScoreBreakdown {
        distance_score: distance_score(distance_km),
        service_score: if professional.offers(&job.service_type) {
            SERVICE_WEIGHT
        } else {
            0.0
        },
        rating_score: rating_score(professional.rating),
        value_score: value_score(job.amount),
        availability_score: if available { AVAILABILITY_WEIGHT } else { 0.0 },
        urgency_bonus: if job.urgent { URGENCY_BONUS } else { 0.0 },
        customer_rating_bonus: if job.customer_rating >= CUSTOMER_RATING_THRESHOLD {
            CUSTOMER_RATING_BONUS
        } else {
            0.0
        },
        specialization_bonus: if professional.specializes_in_any(&job.requirements) {
            SPECIALIZATION_BONUS
        } else {
            0.0
        },
    };

    let score = breakdown.raw_total().clamp(0.0, MAX_SCORE);
    (score, breakdown)
}

fn distance_score(distance_km: f64) -> f64 {
    (DISTANCE_WEIGHT - DISTANCE_DECAY_PER_KM * distance_km.max(0.0)).max(0.0)
}

fn rating_score(rating: f64) -> f64 {
    (rating.clamp(0.0, 5.0) / 5.0) * RATING_WEIGHT
}

fn value_score(amount: f64) -> f64 {
    ((amount.max(0.0) / 100.0) * VALUE_PER_HUNDRED).min(VALUE_WEIGHT)
}
