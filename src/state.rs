use std::sync::Arc;

use chrono::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::engine::emergency::EmergencyDispatcher;
use crate::engine::ledger::{DispatchLedger, LedgerSettings};
use crate::engine::matcher::{MatchSettings, Matcher};
use crate::engine::notify::{fan_out, BroadcastNotifier, Notifier};
use crate::engine::tracker::{LocationTracker, TrackerSettings};
use crate::geo::{StaticTraffic, TrafficProvider};
use crate::models::event::DispatchEvent;
use crate::observability::metrics::Metrics;
use crate::store::{
    AlwaysAvailable, AvailabilityOracle, JobStore, MemoryJobStore, MemoryProfessionalStore,
    ProfessionalStore, StaticZones, ZoneDirectory,
};

/// External systems the engine talks to. Anything left `None` falls back to
/// the in-process default built from [`Config`].
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub jobs: Arc<dyn JobStore>,
    pub professionals: Arc<dyn ProfessionalStore>,
    pub availability: Arc<dyn AvailabilityOracle>,
    pub zones: Option<Arc<dyn ZoneDirectory>>,
    pub traffic: Option<Arc<dyn TrafficProvider>>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            jobs: Arc::new(MemoryJobStore::new()),
            professionals: Arc::new(MemoryProfessionalStore::new()),
            availability: Arc::new(AlwaysAvailable),
            zones: None,
            traffic: None,
            notifier: None,
        }
    }
}

pub struct AppState {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub jobs: Arc<dyn JobStore>,
    pub professionals: Arc<dyn ProfessionalStore>,
    pub ledger: Arc<DispatchLedger>,
    pub matcher: Matcher,
    pub tracker: Arc<LocationTracker>,
    pub emergency: EmergencyDispatcher,
    pub notifier: Arc<dyn Notifier>,
    pub events: BroadcastNotifier,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_collaborators(config, Collaborators::default())
    }

    pub fn with_collaborators(config: Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            clock,
            jobs,
            professionals,
            availability,
            zones,
            traffic,
            notifier,
        } = collaborators;

        let events = BroadcastNotifier::new(config.event_buffer_size);
        let notifier: Arc<dyn Notifier> = match notifier {
            Some(notifier) => notifier,
            None => Arc::new(events.clone()),
        };
        let zones: Arc<dyn ZoneDirectory> = match zones {
            Some(zones) => zones,
            None => Arc::new(StaticZones::new(config.geofence_zones.clone())),
        };
        let traffic: Arc<dyn TrafficProvider> = match traffic {
            Some(traffic) => traffic,
            None => Arc::new(StaticTraffic(config.traffic_multiplier)),
        };

        let ledger = Arc::new(DispatchLedger::new(
            jobs.clone(),
            professionals.clone(),
            clock.clone(),
            LedgerSettings {
                offer_ttl: Duration::seconds(config.offer_ttl_secs),
                decline_cooldown: Duration::minutes(config.decline_cooldown_mins),
            },
        ));

        let matcher = Matcher::new(
            jobs.clone(),
            professionals.clone(),
            availability,
            ledger.clone(),
            MatchSettings {
                default_limit: config.default_match_limit,
                max_limit: config.max_match_limit,
                platform_fee_rate: config.platform_fee_rate,
            },
        );

        let tracker = Arc::new(LocationTracker::new(
            ledger.clone(),
            professionals.clone(),
            zones,
            traffic,
            notifier.clone(),
            clock.clone(),
            TrackerSettings {
                min_interval: Duration::seconds(config.location_min_interval_secs as i64),
                arrival_radius_km: config.arrival_radius_km,
                ..TrackerSettings::default()
            },
        ));

        let emergency = EmergencyDispatcher::new(
            professionals.clone(),
            tracker.clone(),
            notifier.clone(),
            clock.clone(),
            config.emergency_contacts.clone(),
            config.nearby_help_radius_km,
        );

        Self {
            config,
            clock,
            jobs,
            professionals,
            ledger,
            matcher,
            tracker,
            emergency,
            notifier,
            events,
            metrics: Metrics::new(),
        }
    }

    /// Fan an already-committed change out to the notifier.
    pub fn notify(&self, event: DispatchEvent) {
        let kind = event.kind();
        if !fan_out(self.notifier.as_ref(), event) {
            self.metrics
                .notification_failures_total
                .with_label_values(&[kind])
                .inc();
        }
    }

    pub fn refresh_session_gauge(&self) {
        self.metrics
            .active_tracking_sessions
            .set(self.ledger.active_session_count() as i64);
    }
}
