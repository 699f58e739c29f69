use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::tracking::{SessionSummary, SessionType, TrackingSession};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tracking/start", post(start_tracking))
        .route("/tracking/stop", post(stop_tracking))
}

fn default_tracking_type() -> SessionType {
    SessionType::Job
}

#[derive(Deserialize)]
pub struct StartTrackingRequest {
    pub professional_id: String,
    pub job_id: Option<String>,
    #[serde(default = "default_tracking_type")]
    pub tracking_type: SessionType,
}

#[derive(Deserialize)]
pub struct StopTrackingRequest {
    pub session_id: String,
    pub professional_id: String,
}

#[derive(Serialize)]
pub struct StartTrackingResponse {
    pub success: bool,
    pub session_id: String,
    pub session: TrackingSession,
}

#[derive(Serialize)]
pub struct StopTrackingResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: SessionSummary,
}

async fn start_tracking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StartTrackingRequest>,
) -> Result<Json<StartTrackingResponse>, AppError> {
    let session = state.ledger.start_tracking(
        &payload.professional_id,
        payload.job_id,
        payload.tracking_type,
    )?;
    state.refresh_session_gauge();

    Ok(Json(StartTrackingResponse {
        success: true,
        session_id: session.id.clone(),
        session,
    }))
}

async fn stop_tracking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StopTrackingRequest>,
) -> Result<Json<StopTrackingResponse>, AppError> {
    let summary = state
        .ledger
        .stop_tracking(&payload.session_id, &payload.professional_id)?;
    state.refresh_session_gauge();

    Ok(Json(StopTrackingResponse {
        success: true,
        summary,
    }))
}
