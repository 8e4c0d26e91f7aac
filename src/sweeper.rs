//! Expiry reconciliation sweeper.
//!
//! A recurring background task, independent of any HTTP request, that finds
//! orders whose rental window has elapsed, returns their reserved stock and
//! marks them completed. Each order is reconciled in its own transaction so
//! one order's fault never blocks the rest of the batch; failed orders stay
//! non-completed and past due, so the next cycle naturally retries them.

use crate::stores::{CompletionOutcome, RentalStore};
use crate::SweeperConfig;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Counters for one sweep cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Orders matched by the expiry query.
    pub examined: usize,
    /// Orders whose stock was returned and status set to completed.
    pub completed: usize,
    /// Orders skipped because they turned terminal (or vanished) since the
    /// query ran.
    pub skipped: usize,
    /// Orders whose reconciliation failed; retried next cycle.
    pub failed: usize,
}

/// Recurring task that reconciles expired rental orders.
pub struct ExpirySweeper {
    store: Arc<dyn RentalStore>,
    interval: Duration,
    initial_delay: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl ExpirySweeper {
    /// Create a sweeper from configuration and a shutdown channel.
    #[must_use]
    pub fn new(
        store: Arc<dyn RentalStore>,
        config: &SweeperConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            store,
            interval: Duration::from_secs(config.interval_secs),
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            shutdown,
        }
    }

    /// Run until the shutdown channel fires.
    ///
    /// Sleeps the initial delay (letting startup and migrations settle),
    /// then sweeps on a fixed interval. The first tick fires immediately
    /// after the delay.
    pub async fn run(mut self) {
        info!(
            interval_secs = self.interval.as_secs(),
            initial_delay_secs = self.initial_delay.as_secs(),
            "expiry sweeper starting"
        );

        tokio::select! {
            () = tokio::time::sleep(self.initial_delay) => {}
            _ = self.shutdown.recv() => {
                info!("expiry sweeper stopped before first sweep");
                return;
            }
        }

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = sweep_expired(self.store.as_ref()).await;
                    if report.examined > 0 {
                        info!(
                            examined = report.examined,
                            completed = report.completed,
                            skipped = report.skipped,
                            failed = report.failed,
                            "expiry sweep finished"
                        );
                    }
                }
                _ = self.shutdown.recv() => {
                    info!("expiry sweeper shutting down");
                    return;
                }
            }
        }
    }
}

/// Run one sweep cycle: select expired non-completed orders and reconcile
/// each independently.
///
/// Never returns an error; failures are logged and deferred to the next
/// cycle. Idempotent across back-to-back runs because completed orders drop
/// out of the expiry query.
pub async fn sweep_expired(store: &dyn RentalStore) -> SweepReport {
    let today = Utc::now().date_naive();
    let mut report = SweepReport::default();

    let expired = match store.expired_orders(today).await {
        Ok(orders) => orders,
        Err(error) => {
            warn!(%error, "expiry sweep could not select expired orders");
            report.failed += 1;
            return report;
        }
    };
    report.examined = expired.len();

    for entry in expired {
        let order_id = entry.order.id;
        match store.complete_order(order_id).await {
            Ok(CompletionOutcome::Completed) => {
                report.completed += 1;
                info!(
                    %order_id,
                    quantity = entry.order.quantity,
                    use_end = %entry.order.use_end,
                    "expired rental order completed, stock returned"
                );
            }
            Ok(CompletionOutcome::AlreadyTerminal(status)) => {
                report.skipped += 1;
                debug!(%order_id, %status, "expired order already terminal, skipping");
            }
            Ok(CompletionOutcome::Gone) => {
                report.skipped += 1;
                debug!(%order_id, "expired order deleted since selection, skipping");
            }
            Err(error) => {
                report.failed += 1;
                warn!(%order_id, %error, "failed to reconcile expired order, will retry");
            }
        }
    }

    report
}
