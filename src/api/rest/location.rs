use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::engine::tracker::{ArrivalCheck, LocationUpdate, RouteStatus};
use crate::error::AppError;
use crate::geo::EtaEstimate;
use crate::models::event::DispatchEvent;
use crate::models::geofence::GeofenceEvent;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/location", post(update_location))
        .route("/arrival", post(check_arrival))
}

#[derive(Serialize)]
pub struct LocationResponse {
    pub success: bool,
    pub geofence_events: Vec<GeofenceEvent>,
    pub route_status: RouteStatus,
    pub eta_update: Option<EtaEstimate>,
}

#[derive(Deserialize)]
pub struct ArrivalRequest {
    pub professional_id: String,
    pub job_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize)]
pub struct ArrivalResponse {
    pub success: bool,
    #[serde(flatten)]
    pub check: ArrivalCheck,
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LocationUpdate>,
) -> Result<Json<LocationResponse>, AppError> {
    let result = state.tracker.update_location(&payload);

    let outcome = match &result {
        Ok(_) => "accepted",
        Err(AppError::RateLimited { .. }) => "rate_limited",
        Err(_) => "rejected",
    };
    state
        .metrics
        .location_updates_total
        .with_label_values(&[outcome])
        .inc();

    let delta = result?;

    if !delta.geofence_events.is_empty() || delta.eta_update.is_some() {
        state.notify(DispatchEvent::LocationDelta {
            professional_id: delta.professional_id.clone(),
            job_id: delta.job_id.clone(),
            geofence_events: delta.geofence_events.clone(),
            eta: delta.eta_update,
        });
    }

    Ok(Json(LocationResponse {
        success: true,
        geofence_events: delta.geofence_events,
        route_status: delta.route_status,
        eta_update: delta.eta_update,
    }))
}

async fn check_arrival(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ArrivalRequest>,
) -> Result<Json<ArrivalResponse>, AppError> {
    let check = state.tracker.check_arrival(
        &payload.professional_id,
        &payload.job_id,
        payload.latitude,
        payload.longitude,
    )?;

    Ok(Json(ArrivalResponse {
        success: true,
        check,
    }))
}
