use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{BillingRail, PaymentRecord, PaymentStatus, WalletBalance};
use crate::gateway::RechargeGateway;

/// Lifecycle notifications delivered to the hosting screen.
#[derive(Debug, Clone)]
pub enum RechargeEvent {
    /// The payment is still pending; rail artifacts (QR code, copy-paste
    /// code) may have populated since the last fetch.
    StatusUpdated(PaymentRecord),
    /// The payment cleared. `balance` is the re-fetched ledger value, or
    /// `None` when the refresh call failed (the wallet view re-reads it
    /// on entry either way).
    Settled {
        record: PaymentRecord,
        balance: Option<WalletBalance>,
    },
    /// The payment was reversed; the user must re-initiate.
    Failed(PaymentRecord),
    /// The payment lapsed past its due date. For bank slips this is
    /// expected deferred settlement, not a failure; observers pick the
    /// message by rail.
    Expired(PaymentRecord),
    /// The payment id no longer resolves for this user.
    Missing { payment_id: String },
    /// An authenticated call was rejected; the application's global auth
    /// handling takes over from here.
    SessionExpired,
}

#[async_trait]
pub trait RechargeObserver: Send + Sync {
    async fn handle_event(&self, event: &RechargeEvent);
}

/// Reacts to terminal transitions surfaced by the status poller or by a
/// direct check on an already-resolved payment. One instance per payment
/// screen: created on mount, dropped on unmount.
pub struct ReconciliationHandler {
    gateway: Arc<dyn RechargeGateway>,
    observer: Arc<dyn RechargeObserver>,
    settled: AtomicBool,
}

impl ReconciliationHandler {
    pub fn new(gateway: Arc<dyn RechargeGateway>, observer: Arc<dyn RechargeObserver>) -> Self {
        Self {
            gateway,
            observer,
            settled: AtomicBool::new(false),
        }
    }

    pub async fn status_updated(&self, record: &PaymentRecord) {
        self.observer
            .handle_event(&RechargeEvent::StatusUpdated(record.clone()))
            .await;
    }

    /// Dispatches a terminal record. Safe to call more than once for the
    /// same payment: the success path fires at most one settle event.
    pub async fn handle_terminal(&self, record: &PaymentRecord) {
        match record.status {
            PaymentStatus::Confirmed | PaymentStatus::Received => {
                self.settle(record).await;
            }
            PaymentStatus::Refunded => {
                tracing::warn!("Payment {} was refunded", record.id);
                self.observer
                    .handle_event(&RechargeEvent::Failed(record.clone()))
                    .await;
            }
            PaymentStatus::Overdue => {
                match record.billing_type {
                    BillingRail::BankSlip => {
                        tracing::info!(
                            "Bank slip {} is past due; tracking stops here",
                            record.id
                        );
                    }
                    _ => tracing::warn!("Payment {} expired unresolved", record.id),
                }
                self.observer
                    .handle_event(&RechargeEvent::Expired(record.clone()))
                    .await;
            }
            PaymentStatus::Pending => {
                // Not terminal; nothing to reconcile.
            }
        }
    }

    pub async fn payment_missing(&self, payment_id: &str) {
        self.observer
            .handle_event(&RechargeEvent::Missing {
                payment_id: payment_id.to_string(),
            })
            .await;
    }

    pub async fn session_expired(&self) {
        self.observer
            .handle_event(&RechargeEvent::SessionExpired)
            .await;
    }

    async fn settle(&self, record: &PaymentRecord) {
        // One-shot: a second terminal dispatch for the same payment must
        // not duplicate the navigation/refresh side effect.
        if self.settled.swap(true, Ordering::SeqCst) {
            tracing::debug!("Payment {} already reconciled, ignoring", record.id);
            return;
        }

        // Always re-fetch; the balance is never computed locally.
        let balance = match self.gateway.get_balance().await {
            Ok(balance) => Some(balance),
            Err(e) => {
                tracing::warn!(
                    "Balance refresh failed after payment {} settled: {}",
                    record.id,
                    e
                );
                None
            }
        };

        tracing::info!("Payment {} settled", record.id);
        self.observer
            .handle_event(&RechargeEvent::Settled {
                record: record.clone(),
                balance,
            })
            .await;
    }
}
