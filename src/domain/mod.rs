pub mod money;
pub mod recharge;
pub mod wallet;

pub use money::*;
pub use recharge::*;
pub use wallet::*;
