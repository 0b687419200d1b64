use async_trait::async_trait;

use crate::domain::{PaymentRecord, RechargeRequest, WalletBalance};
use crate::error::Result;

pub mod http;

#[cfg(feature = "test-utils")]
pub mod fake;

pub use http::HttpRechargeGateway;

#[cfg(feature = "test-utils")]
pub use fake::FakeRechargeGateway;

/// Client facade over the backend payment API. All reads are safe to
/// repeat; creation is best-effort and the backend rejects a second
/// concurrent pending payment with `DuplicatePending`.
///
/// Authentication failures surface as `AppError::Unauthorized`, distinct
/// from not-found and business errors, so callers can tell "session
/// expired" apart from "no pending payment".
#[async_trait]
pub trait RechargeGateway: Send + Sync {
    async fn create_recharge(&self, request: &RechargeRequest) -> Result<PaymentRecord>;
    async fn get_by_id(&self, id: &str) -> Result<PaymentRecord>;
    /// Lighter-weight than `get_by_id`; intended for high-frequency polling.
    async fn check_status(&self, id: &str) -> Result<PaymentRecord>;
    async fn get_pending(&self) -> Result<Option<PaymentRecord>>;
    async fn get_balance(&self) -> Result<WalletBalance>;
}
