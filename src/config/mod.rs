use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub recharge: RechargeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RechargeConfig {
    pub min_amount_cents: i64,
    pub max_amount_cents: i64,
    pub poll_interval_ms: u64,
    /// Fixed-amount shortcuts offered before free-text entry. Presets are
    /// re-validated against the min/max bounds at submission time.
    pub preset_amounts_cents: Vec<i64>,
}

impl RechargeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RechargeConfig {
    fn default() -> Self {
        Self {
            min_amount_cents: 500,
            max_amount_cents: 1_000_000,
            poll_interval_ms: 5_000,
            preset_amounts_cents: vec![1_000, 2_500, 5_000, 10_000],
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("gateway.base_url", "http://localhost:8080")?
            .set_default("gateway.request_timeout_secs", 15)?
            .set_default("recharge.min_amount_cents", 500)?
            .set_default("recharge.max_amount_cents", 1_000_000)?
            .set_default("recharge.poll_interval_ms", 5_000)?
            .set_default(
                "recharge.preset_amounts_cents",
                vec![1_000i64, 2_500, 5_000, 10_000],
            )?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with CARTEIRA__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("CARTEIRA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                base_url: "http://localhost:8080".to_string(),
                api_token: None,
                request_timeout_secs: 15,
            },
            recharge: RechargeConfig::default(),
        }
    }
}
