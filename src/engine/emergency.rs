use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EmergencyContact;
use crate::engine::notify::Notifier;
use crate::engine::tracker::LocationTracker;
use crate::error::AppError;
use crate::geo::{haversine_km, validate};
use crate::models::emergency::{AlertStatus, AlertType, EmergencyAlert};
use crate::models::event::DispatchEvent;
use crate::models::professional::GeoPoint;
use crate::store::ProfessionalStore;

const MAX_NEARBY_HELP: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct NearbyHelp {
    pub professional_id: String,
    pub name: String,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmergencyResponse {
    pub alert: EmergencyAlert,
    pub response_plan: Vec<&'static str>,
    pub nearby_help: Vec<NearbyHelp>,
    pub emergency_contacts: Vec<EmergencyContact>,
}

/// Escalates alerts from professionals in the field. Alerts are kept for
/// audit and only ever move from active to resolved.
pub struct EmergencyDispatcher {
    professionals: Arc<dyn ProfessionalStore>,
    tracker: Arc<LocationTracker>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    contacts: Vec<EmergencyContact>,
    help_radius_km: f64,
    alerts: DashMap<String, EmergencyAlert>,
}

impl EmergencyDispatcher {
    pub fn new(
        professionals: Arc<dyn ProfessionalStore>,
        tracker: Arc<LocationTracker>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        contacts: Vec<EmergencyContact>,
        help_radius_km: f64,
    ) -> Self {
        Self {
            professionals,
            tracker,
            notifier,
            clock,
            contacts,
            help_radius_km,
            alerts: DashMap::new(),
        }
    }

    /// Create the alert and notify. Only invalid coordinates fail; a failed
    /// notification leaves the alert in place with `notified == false`.
    pub fn raise(
        &self,
        professional_id: &str,
        alert_type: AlertType,
        lat: f64,
        lng: f64,
        message: Option<String>,
    ) -> Result<EmergencyResponse, AppError> {
        let location = validate(lat, lng)?;
        let now = self.clock.now();

        let mut alert = EmergencyAlert {
            id: Uuid::new_v4().to_string(),
            professional_id: professional_id.to_string(),
            alert_type,
            location,
            message: message.unwrap_or_default(),
            priority: alert_type.priority(),
            status: AlertStatus::Active,
            notified: false,
            created_at: now,
            resolved_at: None,
        };
        self.alerts.insert(alert.id.clone(), alert.clone());

        warn!(
            alert_id = %alert.id,
            professional_id,
            alert_type = alert_type.as_str(),
            priority = ?alert.priority,
            "emergency alert raised"
        );

        if let Err(err) = self.tracker.record_position(professional_id, location) {
            // Unknown professionals still get their alert recorded.
            warn!(professional_id, error = %err, "emergency position not stored");
        }

        match self.notifier.dispatch(DispatchEvent::Emergency {
            alert: alert.clone(),
        }) {
            Ok(reached) => {
                alert.notified = true;
                if let Some(mut stored) = self.alerts.get_mut(&alert.id) {
                    stored.notified = true;
                }
                info!(alert_id = %alert.id, reached, "emergency fan-out delivered");
            }
            Err(err) => {
                let failure = AppError::EmergencyDispatchFailed(err.to_string());
                error!(alert_id = %alert.id, error = %failure, "emergency fan-out failed");
            }
        }

        Ok(EmergencyResponse {
            response_plan: response_plan(alert_type),
            nearby_help: self.nearby_help(professional_id, &location),
            emergency_contacts: self.contacts.clone(),
            alert,
        })
    }

    pub fn get(&self, alert_id: &str) -> Option<EmergencyAlert> {
        self.alerts.get(alert_id).map(|alert| alert.value().clone())
    }

    /// All alerts, newest first, optionally only those still active.
    pub fn list(&self, active_only: bool) -> Vec<EmergencyAlert> {
        let mut alerts: Vec<EmergencyAlert> = self
            .alerts
            .iter()
            .filter(|alert| !active_only || alert.status == AlertStatus::Active)
            .map(|alert| alert.value().clone())
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        alerts
    }

    pub fn active_count(&self) -> usize {
        self.alerts
            .iter()
            .filter(|alert| alert.status == AlertStatus::Active)
            .count()
    }

    pub fn resolve(&self, alert_id: &str) -> Result<EmergencyAlert, AppError> {
        let mut alert = self
            .alerts
            .get_mut(alert_id)
            .ok_or_else(|| AppError::NotFound(format!("alert {alert_id} not found")))?;

        if alert.status != AlertStatus::Active {
            return Err(AppError::InvalidTransition(format!(
                "alert {alert_id} is already resolved"
            )));
        }

        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(self.clock.now());
        info!(alert_id, "emergency alert resolved");
        Ok(alert.clone())
    }

    fn nearby_help(&self, professional_id: &str, location: &GeoPoint) -> Vec<NearbyHelp> {
        let mut nearby: Vec<NearbyHelp> = self
            .professionals
            .list_professionals()
            .into_iter()
            .filter(|other| other.id != professional_id)
            .filter_map(|other| {
                let position = other.location.as_ref()?.point();
                let distance_km = haversine_km(location, &position);
                (distance_km <= self.help_radius_km).then(|| NearbyHelp {
                    professional_id: other.id,
                    name: other.name,
                    distance_km,
                })
            })
            .collect();

        nearby.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.professional_id.cmp(&b.professional_id))
        });
        nearby.truncate(MAX_NEARBY_HELP);
        nearby
    }
}

fn response_plan(alert_type: AlertType) -> Vec<&'static str> {
    match alert_type {
        AlertType::Medical => vec![
            "Call emergency services on 000 and request an ambulance",
            "Stay with the person and follow the operator's first-aid instructions",
            "Send your exact location to dispatch operations",
            "Do not resume work until cleared by dispatch",
        ],
        AlertType::Accident => vec![
            "Move to a safe position away from traffic or hazards",
            "Call emergency services on 000 if anyone is injured",
            "Photograph the scene once it is safe to do so",
            "Report the incident to dispatch operations",
        ],
        AlertType::Security => vec![
            "Leave the property and move to a public place",
            "Call police on 000 if you are in immediate danger",
            "Keep your phone on; dispatch will call you back",
        ],
        AlertType::General => vec![
            "Stay where you are if it is safe",
            "Dispatch operations will contact you within 5 minutes",
        ],
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::ledger::{DispatchLedger, LedgerSettings};
    use crate::engine::notify::BroadcastNotifier;
    use crate::engine::test_support::professional;
    use crate::engine::tracker::{LocationUpdate, TrackerSettings};
    use crate::geo::StaticTraffic;
    use crate::models::emergency::AlertPriority;
    use crate::store::{MemoryJobStore, MemoryProfessionalStore, StaticZones};

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn dispatch(&self, _event: DispatchEvent) -> Result<usize, AppError> {
            Err(AppError::Internal("sms gateway unreachable".to_string()))
        }
    }

    struct Fixture {
        dispatcher: EmergencyDispatcher,
        tracker: Arc<LocationTracker>,
        professionals: Arc<MemoryProfessionalStore>,
    }

    fn fixture(notifier: Arc<dyn Notifier>) -> Fixture {
        let professionals = Arc::new(MemoryProfessionalStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = Arc::new(DispatchLedger::new(
            Arc::new(MemoryJobStore::new()),
            professionals.clone(),
            clock.clone(),
            LedgerSettings::default(),
        ));
        let tracker = Arc::new(LocationTracker::new(
            ledger,
            professionals.clone(),
            Arc::new(StaticZones::default()),
            Arc::new(StaticTraffic(1.3)),
            notifier.clone(),
            clock.clone(),
            TrackerSettings::default(),
        ));

        professionals.upsert_professional(professional("pro_1", -33.8820, 151.2069));
        professionals.upsert_professional(professional("near", -33.8830, 151.2080));
        professionals.upsert_professional(professional("nearer", -33.8821, 151.2070));
        professionals.upsert_professional(professional("far", -33.9500, 151.3500));

        let dispatcher = EmergencyDispatcher::new(
            professionals.clone(),
            tracker.clone(),
            notifier,
            clock,
            vec![EmergencyContact {
                name: "Emergency Services".to_string(),
                phone: "000".to_string(),
            }],
            5.0,
        );

        Fixture {
            dispatcher,
            tracker,
            professionals,
        }
    }

    #[test]
    fn medical_alert_is_critical_with_nearest_help_first() {
        let f = fixture(Arc::new(BroadcastNotifier::new(8)));

        let response = f
            .dispatcher
            .raise("pro_1", AlertType::Medical, -33.8820, 151.2069, Some("fell".to_string()))
            .unwrap();

        assert_eq!(response.alert.priority, AlertPriority::Critical);
        assert!(response.alert.notified);
        assert!(!response.response_plan.is_empty());
        assert_eq!(response.emergency_contacts.len(), 1);

        let helpers: Vec<&str> = response
            .nearby_help
            .iter()
            .map(|help| help.professional_id.as_str())
            .collect();
        assert_eq!(helpers, vec!["nearer", "near"]);
    }

    #[test]
    fn failed_notification_still_records_alert() {
        let f = fixture(Arc::new(FailingNotifier));

        let response = f
            .dispatcher
            .raise("pro_1", AlertType::Security, -33.8820, 151.2069, None)
            .unwrap();

        assert!(!response.alert.notified);
        let stored = f.dispatcher.get(&response.alert.id).unwrap();
        assert_eq!(stored.status, AlertStatus::Active);
        assert_eq!(f.dispatcher.active_count(), 1);
    }

    #[test]
    fn invalid_coordinates_create_nothing() {
        let f = fixture(Arc::new(BroadcastNotifier::new(8)));
        assert!(matches!(
            f.dispatcher
                .raise("pro_1", AlertType::General, 91.0, 0.0, None),
            Err(AppError::InvalidCoordinates { .. })
        ));
        assert!(f.dispatcher.list(false).is_empty());
    }

    #[test]
    fn alerts_are_never_throttled() {
        let f = fixture(Arc::new(BroadcastNotifier::new(8)));
        f.tracker
            .update_location(&LocationUpdate {
                professional_id: "pro_1".to_string(),
                latitude: -33.8820,
                longitude: 151.2069,
                accuracy: None,
                heading: None,
                speed: None,
            })
            .unwrap();

        for _ in 0..3 {
            assert!(f
                .dispatcher
                .raise("pro_1", AlertType::Accident, -33.8700, 151.2000, None)
                .is_ok());
        }

        let stored = f.professionals.fetch_professional("pro_1").unwrap();
        let position = stored.location.unwrap().point();
        assert_eq!(position, GeoPoint::new(-33.8700, 151.2000));
        assert_eq!(f.dispatcher.list(true).len(), 3);
    }

    #[test]
    fn resolve_is_one_way() {
        let f = fixture(Arc::new(BroadcastNotifier::new(8)));
        let alert = f
            .dispatcher
            .raise("pro_1", AlertType::General, -33.8820, 151.2069, None)
            .unwrap()
            .alert;

        let resolved = f.dispatcher.resolve(&alert.id).unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        assert!(matches!(
            f.dispatcher.resolve(&alert.id),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(f.dispatcher.list(true).is_empty());
        assert_eq!(f.dispatcher.list(false).len(), 1);
    }
}
