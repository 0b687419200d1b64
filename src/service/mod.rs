pub mod recharge_service;
pub mod reconciliation;

pub use recharge_service::RechargeService;
pub use reconciliation::{RechargeEvent, RechargeObserver, ReconciliationHandler};
