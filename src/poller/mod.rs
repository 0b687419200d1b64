//! Status polling for instant-transfer payments.
//!
//! One poller instance runs per payment screen. Ticks are strictly
//! sequential: the next interval starts only after the previous
//! `check_status` call resolves, so a slow backend never causes
//! overlapping requests. Teardown is a single deterministic operation on
//! the returned handle; a result that arrives after cancellation is
//! discarded without side effects.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::PaymentRecord;
use crate::error::AppError;
use crate::gateway::RechargeGateway;
use crate::service::reconciliation::ReconciliationHandler;

pub struct StatusPoller {
    gateway: Arc<dyn RechargeGateway>,
    interval: Duration,
}

/// Owns the polling task. Dropping the handle cancels it, mirroring the
/// screen-unmount teardown the original flow performs.
pub struct PollerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Waits for the task to wind down after a terminal status or a
    /// cancellation.
    pub async fn stopped(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl StatusPoller {
    pub fn new(gateway: Arc<dyn RechargeGateway>, interval: Duration) -> Self {
        Self { gateway, interval }
    }

    /// Spawns the polling task for a pending instant-transfer payment.
    /// Callers gate on [`PaymentRecord::needs_polling`]; see
    /// `RechargeService::track` for the entry condition.
    pub fn spawn(&self, record: PaymentRecord, handler: Arc<ReconciliationHandler>) -> PollerHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            self.gateway.clone(),
            record,
            self.interval,
            handler,
            token.clone(),
        ));
        PollerHandle {
            token,
            task: Some(task),
        }
    }
}

async fn poll_loop(
    gateway: Arc<dyn RechargeGateway>,
    record: PaymentRecord,
    interval: Duration,
    handler: Arc<ReconciliationHandler>,
    token: CancellationToken,
) {
    let payment_id = record.id.clone();
    tracing::debug!("Polling payment {} every {:?}", payment_id, interval);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("Poller for {} cancelled", payment_id);
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        // Racing the request against the token means a response landing
        // after teardown is dropped on the floor, never acted on.
        let result = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("Poller for {} cancelled mid-flight", payment_id);
                return;
            }
            result = gateway.check_status(&payment_id) => result,
        };

        if token.is_cancelled() {
            return;
        }

        match result {
            Ok(updated) if updated.is_terminal() => {
                tracing::debug!(
                    "Payment {} reached terminal status {:?}",
                    payment_id,
                    updated.status
                );
                handler.handle_terminal(&updated).await;
                return;
            }
            Ok(updated) => {
                handler.status_updated(&updated).await;
            }
            Err(AppError::NotFound(_)) => {
                tracing::warn!("Payment {} no longer exists, stopping poller", payment_id);
                handler.payment_missing(&payment_id).await;
                return;
            }
            Err(AppError::Unauthorized) => {
                tracing::warn!("Session expired while polling {}", payment_id);
                handler.session_expired().await;
                return;
            }
            Err(e) if e.is_transient() => {
                // Swallowed per tick; transient outages keep the fixed
                // cadence and the screen lifetime bounds the polling.
                tracing::warn!("Status check for {} failed: {}", payment_id, e);
            }
            Err(e) => {
                tracing::warn!("Unexpected error polling {}: {}", payment_id, e);
            }
        }
    }
}
