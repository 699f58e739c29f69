use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("invalid coordinates: lat={lat}, lng={lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },

    #[error("location update throttled, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("job {0} is no longer available")]
    JobNoLongerAvailable(String),

    #[error("professional is not eligible: {0}")]
    IneligibleProfessional(String),

    #[error("tracking session {0} is already active")]
    TrackingSessionAlreadyActive(String),

    #[error("emergency notification failed: {0}")]
    EmergencyDispatchFailed(String),

    #[error("accept timed out; re-fetch job {0} before retrying")]
    AcceptTimedOut(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code carried in every failure body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCoordinates { .. } => "InvalidCoordinates",
            AppError::RateLimited { .. } => "RateLimited",
            AppError::JobNoLongerAvailable(_) => "JobNoLongerAvailable",
            AppError::IneligibleProfessional(_) => "IneligibleProfessional",
            AppError::TrackingSessionAlreadyActive(_) => "TrackingSessionAlreadyActive",
            AppError::EmergencyDispatchFailed(_) => "EmergencyDispatchFailed",
            AppError::AcceptTimedOut(_) => "AcceptTimedOut",
            AppError::InvalidTransition(_) => "InvalidTransition",
            AppError::NotFound(_) => "NotFound",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCoordinates { .. } | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::JobNoLongerAvailable(_)
            | AppError::TrackingSessionAlreadyActive(_)
            | AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::IneligibleProfessional(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AcceptTimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::EmergencyDispatchFailed(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn body(&self) -> serde_json::Value {
        json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string(),
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();

        if let AppError::RateLimited { retry_after_secs } = &self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert("retry-after", value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::http::StatusCode;

    #[test]
    fn codes_are_variant_names() {
        let err = AppError::JobNoLongerAvailable("job_001".to_string());
        assert_eq!(err.code(), "JobNoLongerAvailable");
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.body()["success"], false);
    }

    #[test]
    fn rate_limit_maps_to_429() {
        let err = AppError::RateLimited { retry_after_secs: 3 };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.body()["error"], "RateLimited");
    }
}
