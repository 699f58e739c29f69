use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::filter::CandidateConstraints;
use crate::error::AppError;
use crate::models::matching::Match;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/matches", get(find_matches))
}

#[derive(Serialize)]
pub struct MatchesResponse {
    pub success: bool,
    pub total_matches: usize,
    pub total_candidates: usize,
    pub jobs: Vec<Match>,
    pub timestamp: DateTime<Utc>,
}

/// Pairs are kept raw so repeated keys such as `service_types[]` survive.
async fn find_matches(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<MatchesResponse>, AppError> {
    let started = Instant::now();

    let mut professional_id = None;
    let mut lat = None;
    let mut lng = None;
    let mut limit = None;
    let mut options = Vec::new();

    for (key, value) in &params {
        match key.as_str() {
            "professional_id" => professional_id = Some(value.as_str()),
            "lat" | "latitude" => lat = Some(parse(key, value)?),
            "lng" | "longitude" => lng = Some(parse(key, value)?),
            "limit" => limit = Some(parse::<usize>(key, value)?),
            _ => options.push((key.as_str(), value.as_str())),
        }
    }

    let professional_id = professional_id
        .ok_or_else(|| AppError::BadRequest("professional_id is required".to_string()))?;
    let position = match (lat, lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "lat and lng must be given together".to_string(),
            ))
        }
    };
    let constraints = CandidateConstraints::from_options(options)?;

    let result = state
        .matcher
        .find_matches(professional_id, position, &constraints, limit)?;

    state
        .metrics
        .match_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    Ok(Json(MatchesResponse {
        success: true,
        total_matches: result.matches.len(),
        total_candidates: result.total_candidates,
        jobs: result.matches,
        timestamp: state.clock.now(),
    }))
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{key} is not a valid number: {value}")))
}
