use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::validate;
use crate::models::professional::{Location, Professional};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/professionals", post(upsert_professional))
        .route("/professionals/:id", get(get_professional))
}

fn default_radius() -> f64 {
    25.0
}

#[derive(Deserialize)]
pub struct ProfessionalRequest {
    pub id: Option<String>,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub rating: f64,
    #[serde(default = "default_radius")]
    pub service_radius_km: f64,
    #[serde(default)]
    pub has_vehicle: bool,
    #[serde(default)]
    pub has_equipment: bool,
}

#[derive(Serialize)]
pub struct ProfessionalResponse {
    pub success: bool,
    pub professional: Professional,
}

async fn upsert_professional(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProfessionalRequest>,
) -> Result<Json<ProfessionalResponse>, AppError> {
    if !(0.0..=5.0).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 0 and 5".to_string()));
    }
    if !payload.service_radius_km.is_finite() || payload.service_radius_km <= 0.0 {
        return Err(AppError::BadRequest(
            "service_radius_km must be positive".to_string(),
        ));
    }

    let now = state.clock.now();
    let location = match (payload.latitude, payload.longitude) {
        (Some(lat), Some(lng)) => {
            let point = validate(lat, lng)?;
            Some(Location {
                lat: point.lat,
                lng: point.lng,
                accuracy: None,
                heading: None,
                speed: None,
                recorded_at: now,
            })
        }
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "latitude and longitude must be given together".to_string(),
            ))
        }
    };

    let professional = Professional {
        id: payload.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: payload.name,
        location,
        capabilities: payload.capabilities,
        specializations: payload.specializations,
        certifications: payload.certifications,
        rating: payload.rating,
        service_radius_km: payload.service_radius_km,
        has_vehicle: payload.has_vehicle,
        has_equipment: payload.has_equipment,
        updated_at: now,
    };

    state.professionals.upsert_professional(professional.clone());
    tracing::info!(professional_id = %professional.id, "professional registered");

    Ok(Json(ProfessionalResponse {
        success: true,
        professional,
    }))
}

async fn get_professional(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProfessionalResponse>, AppError> {
    let professional = state
        .professionals
        .fetch_professional(&id)
        .ok_or_else(|| AppError::NotFound(format!("professional {id} not found")))?;

    Ok(Json(ProfessionalResponse {
        success: true,
        professional,
    }))
}
