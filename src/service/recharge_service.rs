use std::sync::Arc;

use crate::config::RechargeConfig;
use crate::domain::{
    BillingRequest, PaymentRecord, PaymentStatus, RechargeLimits, RechargeRequest, WalletBalance,
};
use crate::error::Result;
use crate::gateway::RechargeGateway;
use crate::poller::{PollerHandle, StatusPoller};
use crate::service::reconciliation::ReconciliationHandler;

/// Entry point the UI collaborators call into: amount validation, intent
/// creation, pending-payment guard, and lifecycle tracking.
pub struct RechargeService {
    gateway: Arc<dyn RechargeGateway>,
    config: RechargeConfig,
}

impl RechargeService {
    pub fn new(gateway: Arc<dyn RechargeGateway>, config: RechargeConfig) -> Self {
        Self { gateway, config }
    }

    pub fn limits(&self) -> RechargeLimits {
        RechargeLimits::new(self.config.min_amount_cents, self.config.max_amount_cents)
    }

    /// Configured fixed-amount shortcuts. Presets bypass free-text
    /// parsing but are still re-validated by [`Self::create_recharge`].
    pub fn preset_amounts(&self) -> &[i64] {
        &self.config.preset_amounts_cents
    }

    /// Pending-payment guard, run on entry to the recharge flow. Returns
    /// the user's unresolved payment so the flow can offer to resume it
    /// instead of creating a duplicate.
    ///
    /// Advisory only: the backend still rejects a true double-charge if
    /// this is bypassed by stale client state or a second device.
    pub async fn check_pending_payment(&self) -> Result<Option<PaymentRecord>> {
        let pending = self.gateway.get_pending().await?;
        match pending {
            Some(record) if record.status == PaymentStatus::Pending => {
                tracing::info!(
                    "Found resumable pending payment {} ({} via {})",
                    record.id,
                    record.amount,
                    record.billing_type
                );
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }

    /// Validates and submits a recharge intent. Amounts are re-validated
    /// here even when they came from a preset button.
    pub async fn create_recharge(
        &self,
        amount_cents: i64,
        billing: BillingRequest,
    ) -> Result<PaymentRecord> {
        let request = RechargeRequest::build(amount_cents, billing, &self.limits())?;
        self.gateway.create_recharge(&request).await
    }

    /// Full record fetch, used for initial page load and resume.
    pub async fn load_payment(&self, id: &str) -> Result<PaymentRecord> {
        self.gateway.get_by_id(id).await
    }

    pub async fn refresh_balance(&self) -> Result<WalletBalance> {
        self.gateway.get_balance().await
    }

    /// Starts lifecycle tracking for a payment the user is looking at.
    ///
    /// Already-terminal records (e.g. a payment that cleared between
    /// creation and page view) run the reconciliation path immediately
    /// and never start a poller. Pending instant transfers get a poller;
    /// pending bank slips settle out-of-band over days and are left
    /// alone.
    pub async fn track(
        &self,
        record: PaymentRecord,
        handler: Arc<ReconciliationHandler>,
    ) -> Option<PollerHandle> {
        if record.is_terminal() {
            handler.handle_terminal(&record).await;
            return None;
        }

        if !record.needs_polling() {
            tracing::debug!(
                "Payment {} ({}) settles out-of-band, not polling",
                record.id,
                record.billing_type
            );
            return None;
        }

        let poller = StatusPoller::new(self.gateway.clone(), self.config.poll_interval());
        Some(poller.spawn(record, handler))
    }
}
