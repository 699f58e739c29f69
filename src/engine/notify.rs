use tokio::sync::broadcast;
use tracing::warn;

use crate::error::AppError;
use crate::models::event::DispatchEvent;

/// Push/SMS/email fan-out. Called only after the triggering state commits.
pub trait Notifier: Send + Sync {
    /// Returns the number of recipients reached.
    fn dispatch(&self, event: DispatchEvent) -> Result<usize, AppError>;
}

/// Fans events out to in-process subscribers such as websocket clients.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<DispatchEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn dispatch(&self, event: DispatchEvent) -> Result<usize, AppError> {
        // No subscribers is not a delivery failure.
        Ok(self.tx.send(event).unwrap_or(0))
    }
}

/// Best-effort dispatch. Failures are logged and reported, never raised.
pub fn fan_out(notifier: &dyn Notifier, event: DispatchEvent) -> bool {
    let kind = event.kind();
    match notifier.dispatch(event) {
        Ok(_) => true,
        Err(err) => {
            warn!(event = kind, error = %err, "notification fan-out failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::job::JobStatus;

    #[tokio::test]
    async fn subscribers_receive_dispatched_events() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();

        let delivered = notifier
            .dispatch(DispatchEvent::JobStatusChanged {
                job_id: "job_001".to_string(),
                professional_id: Some("pro_1".to_string()),
                status: JobStatus::Accepted,
                at: Utc::now(),
            })
            .unwrap();

        assert_eq!(delivered, 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "job_status_changed");
    }

    #[test]
    fn dispatch_without_subscribers_succeeds() {
        let notifier = BroadcastNotifier::new(8);
        assert!(fan_out(
            &notifier,
            DispatchEvent::Arrived {
                job_id: "job_001".to_string(),
                professional_id: "pro_1".to_string(),
                at: Utc::now(),
            }
        ));
    }
}
