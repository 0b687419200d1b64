use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Incomplete card data: {0}")]
    IncompleteCardData(String),

    #[error("A pending payment already exists for this user")]
    DuplicatePending,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Transient errors are swallowed per poll tick; everything else
    /// stops the poller or surfaces to the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::GatewayUnavailable(_) | AppError::Transport(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            AppError::GatewayUnavailable(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
