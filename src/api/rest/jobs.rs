use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::validate;
use crate::models::event::DispatchEvent;
use crate::models::job::{Job, JobStatus, TimeWindow};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/accept", post(accept_job))
        .route("/jobs/decline", post(decline_job))
        .route("/jobs/offer", post(offer_job))
        .route("/jobs/start", post(start_job))
        .route("/jobs/complete", post(complete_job))
        .route("/jobs/cancel", post(cancel_job))
}

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub id: Option<String>,
    pub service_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub amount: f64,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub customer_rating: f64,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub required_certifications: Vec<String>,
    pub min_rating: Option<f64>,
}

#[derive(Deserialize)]
pub struct AcceptRequest {
    pub job_id: String,
    pub professional_id: String,
    /// Version seen in the candidate list; the accept fails if the job moved since.
    pub version: Option<u64>,
}

#[derive(Deserialize)]
pub struct DeclineRequest {
    pub job_id: String,
    pub professional_id: String,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct JobActionRequest {
    pub job_id: String,
    pub professional_id: String,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub job_id: String,
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct JobResponse {
    pub success: bool,
    pub job: Job,
}

#[derive(Serialize)]
pub struct AcceptResponse {
    pub success: bool,
    pub job_details: Job,
    pub next_steps: Vec<&'static str>,
}

fn job_response(job: Job) -> Json<JobResponse> {
    Json(JobResponse { success: true, job })
}

fn announce(state: &AppState, job: &Job, professional_id: Option<&str>) {
    state.notify(DispatchEvent::JobStatusChanged {
        job_id: job.id.clone(),
        professional_id: professional_id.map(str::to_string),
        status: job.status,
        at: job.updated_at,
    });
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateJobRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let location = validate(payload.latitude, payload.longitude)?;
    let now = state.clock.now();

    let job = state.ledger.create_job(Job {
        id: payload.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        service_type: payload.service_type,
        location,
        address: payload.address,
        window: TimeWindow {
            start: payload.window_start,
            end: payload.window_end,
        },
        amount: payload.amount,
        urgent: payload.urgent,
        customer_rating: payload.customer_rating,
        requirements: payload.requirements,
        required_certifications: payload.required_certifications,
        min_rating: payload.min_rating,
        status: JobStatus::Available,
        assigned_professional: None,
        offered_to: None,
        offer_expires_at: None,
        arrived_at: None,
        version: 0,
        created_at: now,
        updated_at: now,
    })?;

    Ok(job_response(job))
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    Ok(job_response(state.ledger.job(&id)?))
}

async fn accept_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AcceptRequest>,
) -> Result<Json<AcceptResponse>, Response> {
    let ledger = state.ledger.clone();
    let job_id = payload.job_id.clone();
    let professional_id = payload.professional_id.clone();
    let budget = Duration::from_millis(state.config.accept_timeout_ms);

    let attempt = tokio::task::spawn_blocking(move || {
        ledger.accept(&job_id, &professional_id, payload.version)
    });

    // On timeout the accept may still commit; callers re-fetch the job.
    let result = match timeout(budget, attempt).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(AppError::Internal(format!("accept task failed: {join_err}"))),
        Err(_) => Err(AppError::AcceptTimedOut(payload.job_id.clone())),
    };

    let outcome = match &result {
        Ok(_) => "accepted",
        Err(AppError::JobNoLongerAvailable(_)) => "lost_race",
        Err(AppError::IneligibleProfessional(_)) => "ineligible",
        Err(AppError::AcceptTimedOut(_)) => "timed_out",
        Err(_) => "error",
    };
    state
        .metrics
        .dispatch_accepts_total
        .with_label_values(&[outcome])
        .inc();

    match result {
        Ok(job) => {
            announce(&state, &job, Some(&payload.professional_id));
            Ok(Json(AcceptResponse {
                success: true,
                job_details: job,
                next_steps: vec![
                    "Confirm the appointment with the customer",
                    "Start tracking when you set off",
                    "Check in on arrival at the job address",
                ],
            }))
        }
        Err(err @ AppError::JobNoLongerAvailable(_)) => {
            let candidates = state
                .matcher
                .refresh_for(&payload.professional_id)
                .unwrap_or_default();
            let mut body = err.body();
            body["candidates"] = serde_json::to_value(&candidates).unwrap_or_default();
            Err((err.status(), Json(body)).into_response())
        }
        Err(err) => Err(err.into_response()),
    }
}

async fn decline_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DeclineRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state
        .ledger
        .decline(&payload.job_id, &payload.professional_id, payload.reason)?;

    if job.status == JobStatus::Declined {
        announce(&state, &job, Some(&payload.professional_id));
    }
    Ok(job_response(job))
}

async fn offer_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JobActionRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state.ledger.offer(&payload.job_id, &payload.professional_id)?;
    announce(&state, &job, Some(&payload.professional_id));
    Ok(job_response(job))
}

async fn start_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JobActionRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state
        .ledger
        .start_job(&payload.job_id, &payload.professional_id)?;
    announce(&state, &job, Some(&payload.professional_id));
    Ok(job_response(job))
}

async fn complete_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JobActionRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state
        .ledger
        .complete_job(&payload.job_id, &payload.professional_id)?;
    announce(&state, &job, Some(&payload.professional_id));
    Ok(job_response(job))
}

async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state
        .ledger
        .cancel_job(&payload.job_id, payload.reason.as_deref())?;
    announce(&state, &job, job.assigned_professional.as_deref());
    Ok(job_response(job))
}
