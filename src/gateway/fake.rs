//! In-memory gateway used by unit and integration tests. Status
//! responses are scripted per call so tests can walk a payment through
//! its lifecycle deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    BillingRail, PaymentRecord, PaymentStatus, RechargeRequest, WalletBalance,
};
use crate::error::{AppError, Result};
use crate::gateway::RechargeGateway;

#[derive(Default)]
struct FakeState {
    records: HashMap<String, PaymentRecord>,
    pending_id: Option<String>,
    status_script: VecDeque<PaymentStatus>,
    error_script: VecDeque<AppError>,
    balance: f64,
    reject_create_as_duplicate: bool,
}

#[derive(Default)]
pub struct CallCounts {
    pub create_recharge: AtomicUsize,
    pub get_by_id: AtomicUsize,
    pub check_status: AtomicUsize,
    pub get_pending: AtomicUsize,
    pub get_balance: AtomicUsize,
}

#[derive(Default)]
pub struct FakeRechargeGateway {
    state: Mutex<FakeState>,
    pub calls: CallCounts,
    check_delay: Mutex<Duration>,
}

impl FakeRechargeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_balance(&self, balance: f64) {
        self.state.lock().await.balance = balance;
    }

    /// Queues statuses returned by successive `check_status` calls. Once
    /// the script runs out, the record's last status keeps answering.
    pub async fn script_statuses(&self, statuses: impl IntoIterator<Item = PaymentStatus>) {
        self.state.lock().await.status_script.extend(statuses);
    }

    /// Delays every `check_status` response, for cancellation tests.
    pub async fn set_check_delay(&self, delay: Duration) {
        *self.check_delay.lock().await = delay;
    }

    /// Queues errors returned by successive `check_status` calls before
    /// the scripted statuses start answering.
    pub async fn script_check_errors(&self, errors: impl IntoIterator<Item = AppError>) {
        self.state.lock().await.error_script.extend(errors);
    }

    /// The next `n` status checks fail with a transient gateway error.
    pub async fn fail_checks_with_transient(&self, n: usize) {
        self.script_check_errors(
            (0..n).map(|_| AppError::GatewayUnavailable("fake gateway outage".to_string())),
        )
        .await;
    }

    pub async fn remove_record(&self, id: &str) {
        let mut state = self.state.lock().await;
        state.records.remove(id);
        if state.pending_id.as_deref() == Some(id) {
            state.pending_id = None;
        }
    }

    pub async fn reject_creates_as_duplicate(&self, reject: bool) {
        self.state.lock().await.reject_create_as_duplicate = reject;
    }

    /// Seeds a record as the current user's unresolved payment.
    pub async fn seed_pending(&self, record: PaymentRecord) {
        let mut state = self.state.lock().await;
        state.pending_id = Some(record.id.clone());
        state.records.insert(record.id.clone(), record);
    }

    pub async fn seed_record(&self, record: PaymentRecord) {
        self.state
            .lock()
            .await
            .records
            .insert(record.id.clone(), record);
    }

    pub fn check_status_calls(&self) -> usize {
        self.calls.check_status.load(Ordering::SeqCst)
    }

    pub fn get_balance_calls(&self) -> usize {
        self.calls.get_balance.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RechargeGateway for FakeRechargeGateway {
    async fn create_recharge(&self, request: &RechargeRequest) -> Result<PaymentRecord> {
        self.calls.create_recharge.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;

        if state.reject_create_as_duplicate || state.pending_id.is_some() {
            return Err(AppError::DuplicatePending);
        }

        let rail = request.rail();
        let record = PaymentRecord {
            id: format!("pay_{}", Uuid::new_v4()),
            amount: request.amount_cents() as f64 / 100.0,
            billing_type: rail,
            status: PaymentStatus::Pending,
            pix_qr_code: matches!(rail, BillingRail::InstantTransfer)
                .then(|| "data:image/png;base64,fake".to_string()),
            pix_copy_paste: matches!(rail, BillingRail::InstantTransfer)
                .then(|| "00020126fakecopypaste".to_string()),
            invoice_url: matches!(rail, BillingRail::BankSlip)
                .then(|| "https://fake.example/slip".to_string()),
            due_date: matches!(rail, BillingRail::BankSlip)
                .then(|| Utc::now() + ChronoDuration::days(3)),
        };

        state.pending_id = Some(record.id.clone());
        state.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<PaymentRecord> {
        self.calls.get_by_id.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .await
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Payment {} not found", id)))
    }

    async fn check_status(&self, id: &str) -> Result<PaymentRecord> {
        self.calls.check_status.fetch_add(1, Ordering::SeqCst);

        let delay = *self.check_delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if let Some(err) = state.error_script.pop_front() {
            return Err(err);
        }
        let next_status = state.status_script.pop_front();
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Payment {} not found", id)))?;
        if let Some(status) = next_status {
            record.status = status;
        }
        let record = record.clone();
        if record.is_terminal() {
            state.pending_id = None;
        }
        Ok(record)
    }

    async fn get_pending(&self) -> Result<Option<PaymentRecord>> {
        self.calls.get_pending.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;
        Ok(state
            .pending_id
            .as_ref()
            .and_then(|id| state.records.get(id))
            .cloned())
    }

    async fn get_balance(&self) -> Result<WalletBalance> {
        self.calls.get_balance.fetch_add(1, Ordering::SeqCst);
        Ok(WalletBalance {
            balance: self.state.lock().await.balance,
        })
    }
}
