use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatch_accepts_total: IntCounterVec,
    pub location_updates_total: IntCounterVec,
    pub emergency_alerts_total: IntCounterVec,
    pub notification_failures_total: IntCounterVec,
    pub match_latency_seconds: Histogram,
    pub active_tracking_sessions: IntGauge,
    pub jobs_expired_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatch_accepts_total = IntCounterVec::new(
            Opts::new("dispatch_accepts_total", "Accept attempts by outcome"),
            &["outcome"],
        )
        .expect("valid dispatch_accepts_total metric");

        let location_updates_total = IntCounterVec::new(
            Opts::new("location_updates_total", "Location updates by outcome"),
            &["outcome"],
        )
        .expect("valid location_updates_total metric");

        let emergency_alerts_total = IntCounterVec::new(
            Opts::new("emergency_alerts_total", "Emergency alerts raised by type"),
            &["alert_type"],
        )
        .expect("valid emergency_alerts_total metric");

        let notification_failures_total = IntCounterVec::new(
            Opts::new(
                "notification_failures_total",
                "Failed notification fan-outs by event kind",
            ),
            &["kind"],
        )
        .expect("valid notification_failures_total metric");

        let match_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "match_latency_seconds",
            "Latency of candidate matching in seconds",
        ))
        .expect("valid match_latency_seconds metric");

        let active_tracking_sessions = IntGauge::new(
            "active_tracking_sessions",
            "Currently open tracking sessions",
        )
        .expect("valid active_tracking_sessions metric");

        let jobs_expired_total =
            IntCounter::new("jobs_expired_total", "Offers moved to expired by the sweeper")
                .expect("valid jobs_expired_total metric");

        registry
            .register(Box::new(dispatch_accepts_total.clone()))
            .expect("register dispatch_accepts_total");
        registry
            .register(Box::new(location_updates_total.clone()))
            .expect("register location_updates_total");
        registry
            .register(Box::new(emergency_alerts_total.clone()))
            .expect("register emergency_alerts_total");
        registry
            .register(Box::new(notification_failures_total.clone()))
            .expect("register notification_failures_total");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");
        registry
            .register(Box::new(active_tracking_sessions.clone()))
            .expect("register active_tracking_sessions");
        registry
            .register(Box::new(jobs_expired_total.clone()))
            .expect("register jobs_expired_total");

        Self {
            registry,
            dispatch_accepts_total,
            location_updates_total,
            emergency_alerts_total,
            notification_failures_total,
            match_latency_seconds,
            active_tracking_sessions,
            jobs_expired_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
