use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

use crate::config::GatewayConfig;
use crate::domain::{PaymentRecord, RechargeRequest, WalletBalance};
use crate::error::{AppError, Result};
use crate::gateway::RechargeGateway;

pub struct HttpRechargeGateway {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpRechargeGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn handle_response(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("error")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| status.to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized,
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::CONFLICT => AppError::DuplicatePending,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                AppError::Validation(message)
            }
            s if s.is_server_error() => AppError::GatewayUnavailable(message),
            _ => AppError::Transport(format!("Unexpected status {}: {}", status, message)),
        })
    }

    async fn get_record(&self, path: &str) -> Result<PaymentRecord> {
        let response = self.authorize(self.client.get(self.url(path))).send().await?;
        let response = self.handle_response(response).await?;
        Ok(response.json::<PaymentRecord>().await?)
    }
}

#[async_trait]
impl RechargeGateway for HttpRechargeGateway {
    async fn create_recharge(&self, request: &RechargeRequest) -> Result<PaymentRecord> {
        let response = self
            .authorize(self.client.post(self.url("/recharge")))
            .json(&request.to_payload())
            .send()
            .await?;
        let response = self.handle_response(response).await?;
        let record = response.json::<PaymentRecord>().await?;
        tracing::info!(
            "Created recharge {} ({} via {})",
            record.id,
            record.amount,
            record.billing_type
        );
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<PaymentRecord> {
        self.get_record(&format!("/recharge/{}", id)).await
    }

    async fn check_status(&self, id: &str) -> Result<PaymentRecord> {
        self.get_record(&format!("/recharge/{}/status", id)).await
    }

    async fn get_pending(&self) -> Result<Option<PaymentRecord>> {
        let response = self
            .authorize(self.client.get(self.url("/recharge/pending")))
            .send()
            .await?;

        // No unresolved payment is an expected outcome, not an error.
        if response.status() == StatusCode::NOT_FOUND
            || response.status() == StatusCode::NO_CONTENT
        {
            return Ok(None);
        }

        let response = self.handle_response(response).await?;
        Ok(Some(response.json::<PaymentRecord>().await?))
    }

    async fn get_balance(&self) -> Result<WalletBalance> {
        let response = self
            .authorize(self.client.get(self.url("/balance")))
            .send()
            .await?;
        let response = self.handle_response(response).await?;
        Ok(response.json::<WalletBalance>().await?)
    }
}
