use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::professional::GeoPoint;
use crate::models::tracking::{SessionSummary, SessionType, TrackingSession};

/// Displacement below which a fix counts as standing still.
const STATIONARY_KM: f64 = 0.02;
/// Device speed (m/s) below which a fix counts as standing still.
const STATIONARY_SPEED_MPS: f64 = 0.5;

/// Open and closed tracking sessions; at most one open per professional.
#[derive(Default)]
pub struct SessionBook {
    sessions: DashMap<String, TrackingSession>,
    active: DashMap<String, String>,
}

impl SessionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(
        &self,
        professional_id: &str,
        job_id: Option<String>,
        session_type: SessionType,
        now: DateTime<Utc>,
    ) -> Result<TrackingSession, AppError> {
        match self.active.entry(professional_id.to_string()) {
            Entry::Occupied(existing) => Err(AppError::TrackingSessionAlreadyActive(
                existing.get().clone(),
            )),
            Entry::Vacant(slot) => {
                let session = TrackingSession {
                    id: Uuid::new_v4().to_string(),
                    professional_id: professional_id.to_string(),
                    job_id,
                    session_type,
                    started_at: now,
                    ended_at: None,
                    total_distance_km: 0.0,
                    stops: 0,
                    fixes: 0,
                    first_point: None,
                    last_point: None,
                    stationary: false,
                };
                self.sessions.insert(session.id.clone(), session.clone());
                slot.insert(session.id.clone());
                Ok(session)
            }
        }
    }

    pub fn stop(
        &self,
        session_id: &str,
        professional_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionSummary, AppError> {
        let summary = {
            let mut session = self
                .sessions
                .get_mut(session_id)
                .filter(|session| session.professional_id == professional_id)
                .ok_or_else(|| AppError::NotFound(format!("tracking session {session_id} not found")))?;

            if session.ended_at.is_some() {
                return Err(AppError::InvalidTransition(format!(
                    "tracking session {session_id} already stopped"
                )));
            }

            session.ended_at = Some(now);
            summarize(&session, now)
        };

        self.active
            .remove_if(professional_id, |_, active_id| active_id == session_id);

        Ok(summary)
    }

    /// Fold a new fix into the professional's open session, if any.
    pub fn record_fix(&self, professional_id: &str, point: GeoPoint, speed_mps: Option<f64>) {
        let Some(session_id) = self.active.get(professional_id).map(|id| id.value().clone()) else {
            return;
        };
        let Some(mut session) = self.sessions.get_mut(&session_id) else {
            return;
        };

        if let Some(previous) = session.last_point {
            let step_km = haversine_km(&previous, &point);
            session.total_distance_km += step_km;

            let still = step_km < STATIONARY_KM
                || speed_mps.is_some_and(|speed| speed < STATIONARY_SPEED_MPS);
            if still && !session.stationary {
                session.stops += 1;
            }
            session.stationary = still;
        }

        session.fixes += 1;
        session.first_point.get_or_insert(point);
        session.last_point = Some(point);
    }

    pub fn active_for(&self, professional_id: &str) -> Option<TrackingSession> {
        let session_id = self.active.get(professional_id)?.value().clone();
        self.sessions.get(&session_id).map(|s| s.value().clone())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

fn summarize(session: &TrackingSession, now: DateTime<Utc>) -> SessionSummary {
    let total_duration = (now - session.started_at).num_seconds().max(0);
    let hours = total_duration as f64 / 3600.0;
    let average_speed = if hours > 0.0 {
        session.total_distance_km / hours
    } else {
        0.0
    };

    let efficiency_score = match (session.first_point, session.last_point) {
        (Some(first), Some(last)) if session.total_distance_km > 0.0 => {
            (haversine_km(&first, &last) / session.total_distance_km * 100.0).min(100.0)
        }
        _ => 0.0,
    };

    SessionSummary {
        session_id: session.id.clone(),
        total_distance: session.total_distance_km,
        total_duration,
        average_speed,
        stops: session.stops,
        efficiency_score,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn second_session_is_rejected_until_first_stops() {
        let book = SessionBook::new();
        let now = Utc::now();

        let first = book.start("pro_1", None, SessionType::Patrol, now).unwrap();
        let err = book.start("pro_1", None, SessionType::Job, now).unwrap_err();
        assert!(matches!(err, AppError::TrackingSessionAlreadyActive(id) if id == first.id));

        book.stop(&first.id, "pro_1", now + Duration::minutes(5)).unwrap();
        assert!(book.start("pro_1", None, SessionType::Job, now).is_ok());
    }

    #[test]
    fn stop_requires_owner() {
        let book = SessionBook::new();
        let now = Utc::now();
        let session = book.start("pro_1", None, SessionType::Patrol, now).unwrap();

        assert!(matches!(
            book.stop(&session.id, "pro_2", now),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(book.active_count(), 1);
    }

    #[test]
    fn summary_accumulates_distance_and_stops() {
        let book = SessionBook::new();
        let start = Utc::now();
        let session = book.start("pro_1", None, SessionType::Job, start).unwrap();

        book.record_fix("pro_1", GeoPoint::new(-33.8820, 151.2069), Some(10.0));
        book.record_fix("pro_1", GeoPoint::new(-33.8820, 151.2169), Some(10.0));
        book.record_fix("pro_1", GeoPoint::new(-33.8820, 151.2169), Some(0.0));
        book.record_fix("pro_1", GeoPoint::new(-33.8820, 151.2269), Some(10.0));

        let summary = book
            .stop(&session.id, "pro_1", start + Duration::minutes(30))
            .unwrap();

        assert!((summary.total_distance - 1.85).abs() < 0.1);
        assert_eq!(summary.total_duration, 1800);
        assert_eq!(summary.stops, 1);
        assert!(summary.average_speed > 3.0 && summary.average_speed < 4.0);
        assert!(summary.efficiency_score > 99.0);
        assert_eq!(book.active_count(), 0);
    }

    #[test]
    fn stopping_twice_is_invalid() {
        let book = SessionBook::new();
        let now = Utc::now();
        let session = book.start("pro_1", None, SessionType::Break, now).unwrap();
        book.stop(&session.id, "pro_1", now).unwrap();

        assert!(matches!(
            book.stop(&session.id, "pro_1", now),
            Err(AppError::InvalidTransition(_))
        ));
    }
}
