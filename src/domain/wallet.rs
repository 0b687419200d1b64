use serde::{Deserialize, Serialize};

/// Read-only snapshot of the user's available funds. The backend ledger
/// owns this value; the client re-fetches it after every confirmed
/// recharge instead of incrementing a local copy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub balance: f64,
}
