//! x402 settlement client
//!
//! Settles the payment header presented on a viewer resolve. A declined or
//! malformed payment surfaces as a typed payment-required error carrying the
//! requirements the client must satisfy.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::PurserConfig;
use crate::errors::{AppError, AppResult};
use crate::models::PaymentRequirements;

#[async_trait]
pub trait PurserClient: Send + Sync {
    /// Settle the payment for `resource` on behalf of `tenant_id`
    async fn settle(&self, payment_header: &str, tenant_id: &str, resource: &str) -> AppResult<()>;
}

#[derive(Debug, Deserialize)]
struct SettleResponse {
    settled: bool,
    #[serde(default)]
    requirements: Option<PaymentRequirements>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpPurserClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPurserClient {
    pub fn new(config: &PurserConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PurserClient for HttpPurserClient {
    async fn settle(&self, payment_header: &str, tenant_id: &str, resource: &str) -> AppResult<()> {
        let url = format!("{}/api/x402/settle", self.base_url);
        let body = serde_json::json!({
            "payment": payment_header,
            "tenant_id": tenant_id,
            "resource": resource,
        });
        let response: SettleResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::external_service("purser", e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::external_service("purser", e.to_string()))?;

        if response.settled {
            Ok(())
        } else {
            Err(AppError::PaymentRequired {
                message: response
                    .message
                    .unwrap_or_else(|| "payment settlement declined".to_string()),
                requirements: response.requirements,
            })
        }
    }
}
