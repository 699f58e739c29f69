use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::config::EmergencyContact;
use crate::engine::emergency::NearbyHelp;
use crate::error::AppError;
use crate::models::emergency::{AlertPriority, AlertType, EmergencyAlert};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/emergency", post(raise_alert).get(list_alerts))
        .route("/emergency/:id/resolve", post(resolve_alert))
}

fn default_alert_type() -> AlertType {
    AlertType::General
}

#[derive(Deserialize)]
pub struct EmergencyRequest {
    pub professional_id: String,
    #[serde(default = "default_alert_type")]
    pub alert_type: AlertType,
    pub latitude: f64,
    pub longitude: f64,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct EmergencyResponse {
    pub success: bool,
    pub alert_id: String,
    pub priority: AlertPriority,
    pub notified: bool,
    pub response_plan: Vec<&'static str>,
    pub nearby_help: Vec<NearbyHelp>,
    pub emergency_contacts: Vec<EmergencyContact>,
}

#[derive(Deserialize)]
pub struct ListAlertsQuery {
    #[serde(default)]
    pub active: bool,
}

#[derive(Serialize)]
pub struct AlertsResponse {
    pub success: bool,
    pub alerts: Vec<EmergencyAlert>,
}

#[derive(Serialize)]
pub struct AlertResponse {
    pub success: bool,
    pub alert: EmergencyAlert,
}

async fn raise_alert(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmergencyRequest>,
) -> Result<Json<EmergencyResponse>, AppError> {
    let response = state.emergency.raise(
        &payload.professional_id,
        payload.alert_type,
        payload.latitude,
        payload.longitude,
        payload.message,
    )?;

    state
        .metrics
        .emergency_alerts_total
        .with_label_values(&[payload.alert_type.as_str()])
        .inc();
    if !response.alert.notified {
        state
            .metrics
            .notification_failures_total
            .with_label_values(&["emergency"])
            .inc();
    }

    Ok(Json(EmergencyResponse {
        success: true,
        alert_id: response.alert.id,
        priority: response.alert.priority,
        notified: response.alert.notified,
        response_plan: response.response_plan,
        nearby_help: response.nearby_help,
        emergency_contacts: response.emergency_contacts,
    }))
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAlertsQuery>,
) -> Json<AlertsResponse> {
    Json(AlertsResponse {
        success: true,
        alerts: state.emergency.list(query.active),
    })
}

async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AlertResponse>, AppError> {
    let alert = state.emergency.resolve(&id)?;
    Ok(Json(AlertResponse {
        success: true,
        alert,
    }))
}
