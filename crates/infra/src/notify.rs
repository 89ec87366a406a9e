//! Best-effort stock notifications.
//!
//! Side-channel delivery (push, email) must never block or fail the primary
//! operation, so notifications run as detached tasks: failures are logged and
//! never reach the caller's result.

use std::sync::Arc;

use async_trait::async_trait;

use storefront_core::ProductId;

/// Inventory events worth telling the business owner about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockEvent {
    /// A tracked product just hit zero stock.
    Depleted {
        product_id: ProductId,
        product_name: String,
    },
}

/// Delivery channel for stock events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: StockEvent) -> Result<(), String>;
}

/// Notifier that drops everything (tests, disabled channels).
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: StockEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Dispatch `event` on a detached task. The task logs failure and is never
/// awaited by the caller.
pub fn spawn_notify(notifier: Arc<dyn Notifier>, event: StockEvent) {
    tokio::spawn(async move {
        let descr = format!("{event:?}");
        if let Err(err) = notifier.notify(event).await {
            tracing::warn!(event = %descr, error = %err, "stock notification failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<StockEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, event: StockEvent) -> Result<(), String> {
            self.events.lock().unwrap().push(event);
            if self.fail {
                Err("channel down".to_string())
            } else {
                Ok(())
            }
        }
    }

    /// Helper: give the detached task time to run.
    async fn wait_for_delivery() {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn spawn_notify_delivers_without_blocking() {
        let notifier = Arc::new(RecordingNotifier::default());
        spawn_notify(
            notifier.clone(),
            StockEvent::Depleted {
                product_id: ProductId::new(),
                product_name: "soap".to_string(),
            },
        );

        wait_for_delivery().await;
        assert_eq!(notifier.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn notifier_failure_is_swallowed() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        spawn_notify(
            notifier.clone(),
            StockEvent::Depleted {
                product_id: ProductId::new(),
                product_name: "soap".to_string(),
            },
        );

        // Nothing to assert beyond "no panic reaches us"; the task logs.
        wait_for_delivery().await;
    }
}
