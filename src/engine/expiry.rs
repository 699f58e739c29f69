use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::models::event::DispatchEvent;
use crate::state::AppState;

pub async fn run_offer_expiry(state: Arc<AppState>, every: Duration) {
    info!(interval_secs = every.as_secs(), "offer expiry sweeper started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let expired = sweep_expired_offers(&state);
        if expired > 0 {
            debug!(expired, "offer sweep finished");
        }
    }
}

/// Expire stale offers once and notify each affected job.
pub fn sweep_expired_offers(state: &AppState) -> usize {
    let expired = state.ledger.expire_offers();

    for job in &expired {
        state.metrics.jobs_expired_total.inc();
        state.notify(DispatchEvent::JobStatusChanged {
            job_id: job.id.clone(),
            professional_id: job.offered_to.clone(),
            status: job.status,
            at: job.updated_at,
        });
    }

    expired.len()
}
