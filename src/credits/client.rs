//! HTTP client for the credits microservice
//!
//! Endpoints:
//! - GET  {base}/users/{id}/balance  -> {"balance": i64}
//! - POST {base}/users/{id}/rewards  <- {"amount": i64}

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::CreditsService;
use crate::config::CreditsConfig;
use crate::error::AppError;
use crate::metrics::observe_credits_request;

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: i64,
}

#[derive(Debug, Serialize)]
struct RewardRequest {
    amount: i64,
}

/// `reqwest`-backed [`CreditsService`]
#[derive(Clone)]
pub struct HttpCreditsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCreditsClient {
    pub fn new(config: &CreditsConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("IdeaForge/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }

    fn user_url(&self, user_id: &str, resource: &str) -> String {
        format!("{}/users/{}/{}", self.base_url, user_id, resource)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AppError> {
        let started = Instant::now();

        let response = match self.authorize(request).send().await {
            Ok(response) => response,
            Err(error) => {
                observe_credits_request(operation, "error", started.elapsed());
                return Err(AppError::Credits(format!("{operation} request failed: {error}")));
            }
        };

        let status = response.status();
        if !status.is_success() {
            observe_credits_request(operation, "error", started.elapsed());
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(operation, %status, body = %body, "Credits service returned an error");
            return Err(AppError::Credits(format!(
                "{operation} returned status {status}"
            )));
        }

        observe_credits_request(operation, "success", started.elapsed());
        Ok(response)
    }
}

#[async_trait]
impl CreditsService for HttpCreditsClient {
    async fn balance(&self, user_id: &str) -> Result<i64, AppError> {
        let request = self.http.get(self.user_url(user_id, "balance"));
        let response = self.send("balance", request).await?;

        let body: BalanceResponse = response
            .json()
            .await
            .map_err(|e| AppError::Credits(format!("invalid balance response: {e}")))?;

        Ok(body.balance)
    }

    async fn reward(&self, user_id: &str, amount: i64) -> Result<(), AppError> {
        if amount <= 0 {
            return Err(AppError::Validation(format!(
                "reward amount must be positive, got {amount}"
            )));
        }

        let request = self
            .http
            .post(self.user_url(user_id, "rewards"))
            .json(&RewardRequest { amount });
        self.send("reward", request).await?;

        tracing::info!(user_id, amount, "Credits rewarded");
        Ok(())
    }
}
