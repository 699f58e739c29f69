use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::engine::ledger::DispatchLedger;
use crate::engine::notify::{fan_out, Notifier};
use crate::engine::rate_limit::RateLimiter;
use crate::error::AppError;
use crate::geo::{eta_with_traffic, haversine_km, validate, EtaEstimate, TrafficProvider};
use crate::models::event::DispatchEvent;
use crate::models::geofence::{GeofenceEvent, GeofenceTransition};
use crate::models::professional::{GeoPoint, Location};
use crate::store::{ProfessionalStore, ZoneDirectory};

const LOCATION_OPERATION: &str = "location";

#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    pub min_interval: Duration,
    pub arrival_radius_km: f64,
    pub approaching_radius_km: f64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::seconds(5),
            arrival_radius_km: 0.1,
            approaching_radius_km: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationUpdate {
    pub professional_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    NoActiveJob,
    EnRoute,
    Approaching,
    AtDestination,
}

/// What changed because of one accepted location fix.
#[derive(Debug, Clone, Serialize)]
pub struct LocationDelta {
    pub professional_id: String,
    pub job_id: Option<String>,
    pub geofence_events: Vec<GeofenceEvent>,
    pub route_status: RouteStatus,
    pub eta_update: Option<EtaEstimate>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrivalCheck {
    pub job_id: String,
    /// Sticky: true once the job has ever been reached.
    pub arrived: bool,
    /// Whether this reported position is inside the arrival radius.
    pub within_radius: bool,
    pub distance_m: f64,
    pub arrived_at: Option<DateTime<Utc>>,
}

/// Ingests position fixes and derives geofence, ETA and arrival state.
pub struct LocationTracker {
    ledger: Arc<DispatchLedger>,
    professionals: Arc<dyn ProfessionalStore>,
    zones: Arc<dyn ZoneDirectory>,
    traffic: Arc<dyn TrafficProvider>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    memberships: DashMap<String, BTreeSet<String>>,
    settings: TrackerSettings,
}

impl LocationTracker {
    pub fn new(
        ledger: Arc<DispatchLedger>,
        professionals: Arc<dyn ProfessionalStore>,
        zones: Arc<dyn ZoneDirectory>,
        traffic: Arc<dyn TrafficProvider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            limiter: RateLimiter::new(clock.clone(), settings.min_interval),
            ledger,
            professionals,
            zones,
            traffic,
            notifier,
            clock,
            memberships: DashMap::new(),
            settings,
        }
    }

    pub fn update_location(&self, update: &LocationUpdate) -> Result<LocationDelta, AppError> {
        let point = validate(update.latitude, update.longitude)?;
        let professional_id = update.professional_id.as_str();

        if self
            .professionals
            .fetch_professional(professional_id)
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "professional {professional_id} not found"
            )));
        }

        let now = self.limiter.check(professional_id, LOCATION_OPERATION)?;

        self.professionals.update_location(
            professional_id,
            Location {
                lat: point.lat,
                lng: point.lng,
                accuracy: update.accuracy,
                heading: update.heading,
                speed: update.speed,
                recorded_at: now,
            },
        )?;
        self.ledger.record_fix(professional_id, point, update.speed);

        let geofence_events = self.diff_zones(professional_id, &point, now);

        let active_job = self.ledger.active_job_for(professional_id);
        let (route_status, eta_update) = match &active_job {
            Some(job) => {
                let eta = eta_with_traffic(&point, &job.location, self.traffic.as_ref(), now);
                (self.route_status(eta.distance_km), Some(eta))
            }
            None => (RouteStatus::NoActiveJob, None),
        };

        debug!(
            professional_id,
            events = geofence_events.len(),
            route_status = ?route_status,
            "location accepted"
        );

        Ok(LocationDelta {
            professional_id: professional_id.to_string(),
            job_id: active_job.map(|job| job.id),
            geofence_events,
            route_status,
            eta_update,
            recorded_at: now,
        })
    }

    /// Store a position outside the rate limit. Used by emergency alerts.
    pub fn record_position(&self, professional_id: &str, point: GeoPoint) -> Result<(), AppError> {
        let now = self.clock.now();
        self.professionals.update_location(
            professional_id,
            Location {
                lat: point.lat,
                lng: point.lng,
                accuracy: None,
                heading: None,
                speed: None,
                recorded_at: now,
            },
        )?;
        self.ledger.record_fix(professional_id, point, None);
        Ok(())
    }

    pub fn current_position(&self, professional_id: &str) -> Option<GeoPoint> {
        self.professionals
            .fetch_professional(professional_id)?
            .location
            .map(|location| location.point())
    }

    /// Declare arrival once within the arrival radius of the job. The arrival
    /// stamp is permanent and notified exactly once.
    pub fn check_arrival(
        &self,
        professional_id: &str,
        job_id: &str,
        lat: f64,
        lng: f64,
    ) -> Result<ArrivalCheck, AppError> {
        let point = validate(lat, lng)?;
        let job = self.ledger.job(job_id)?;

        if job.assigned_professional.as_deref() != Some(professional_id) {
            return Err(AppError::IneligibleProfessional(format!(
                "job {job_id} is not assigned to {professional_id}"
            )));
        }

        let distance_km = haversine_km(&point, &job.location);
        let distance_m = (distance_km * 1000.0).round();

        if distance_km > self.settings.arrival_radius_km {
            return Ok(ArrivalCheck {
                job_id: job_id.to_string(),
                arrived: job.arrived_at.is_some(),
                within_radius: false,
                distance_m,
                arrived_at: job.arrived_at,
            });
        }

        let (job, first_arrival) = self.ledger.mark_arrived(job_id, professional_id)?;
        if first_arrival {
            if let Some(at) = job.arrived_at {
                info!(job_id, professional_id, distance_m, "arrival declared");
                fan_out(
                    self.notifier.as_ref(),
                    DispatchEvent::Arrived {
                        job_id: job_id.to_string(),
                        professional_id: professional_id.to_string(),
                        at,
                    },
                );
            }
        }

        Ok(ArrivalCheck {
            job_id: job_id.to_string(),
            arrived: true,
            within_radius: true,
            distance_m,
            arrived_at: job.arrived_at,
        })
    }

    fn route_status(&self, distance_km: f64) -> RouteStatus {
        if distance_km <= self.settings.arrival_radius_km {
            RouteStatus::AtDestination
        } else if distance_km <= self.settings.approaching_radius_km {
            RouteStatus::Approaching
        } else {
            RouteStatus::EnRoute
        }
    }

    fn diff_zones(
        &self,
        professional_id: &str,
        point: &GeoPoint,
        now: DateTime<Utc>,
    ) -> Vec<GeofenceEvent> {
        let inside: Vec<_> = self.zones.zones_containing(point);
        let current: BTreeSet<String> = inside.iter().map(|zone| zone.id.clone()).collect();

        let mut previous = self
            .memberships
            .entry(professional_id.to_string())
            .or_default();

        let mut events = Vec::new();
        for zone in &inside {
            if !previous.contains(&zone.id) {
                events.push(GeofenceEvent {
                    zone_id: zone.id.clone(),
                    zone_name: zone.name.clone(),
                    transition: GeofenceTransition::Entered,
                    at: now,
                });
            }
        }

        if previous.iter().any(|id| !current.contains(id)) {
            let names: Vec<(String, String)> = self
                .zones
                .zones()
                .into_iter()
                .map(|zone| (zone.id, zone.name))
                .collect();
            for id in previous.iter().filter(|id| !current.contains(*id)) {
                let zone_name = names
                    .iter()
                    .find(|(zone_id, _)| zone_id == id)
                    .map(|(_, name)| name.clone())
                    .unwrap_or_else(|| id.clone());
                events.push(GeofenceEvent {
                    zone_id: id.clone(),
                    zone_name,
                    transition: GeofenceTransition::Exited,
                    at: now,
                });
            }
        }

        *previous = current;
        events
    }
}
