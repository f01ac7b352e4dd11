//! Billing service client
//!
//! Source of suspension and balance signals. Only the admission cache talks
//! to this client; everything else reads through the cache.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;

use crate::config::BillingConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{BillingModel, TenantBillingState};

#[async_trait]
pub trait BillingClient: Send + Sync {
    async fn fetch_tenant_state(&self, tenant_id: &str) -> AppResult<TenantBillingState>;
}

#[derive(Debug, Deserialize)]
struct TenantStateBody {
    is_suspended: bool,
    billing_model: String,
    is_balance_negative: bool,
}

#[derive(Clone)]
pub struct HttpBillingClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBillingClient {
    pub fn new(base_url: &str, config: &BillingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BillingClient for HttpBillingClient {
    async fn fetch_tenant_state(&self, tenant_id: &str) -> AppResult<TenantBillingState> {
        let url = format!("{}/api/tenants/{}/billing-state", self.base_url, tenant_id);
        let body: TenantStateBody = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::external_service("billing", e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::external_service("billing", e.to_string()))?;

        Ok(TenantBillingState {
            tenant_id: tenant_id.to_string(),
            is_suspended: body.is_suspended,
            billing_model: BillingModel::from_str(&body.billing_model)
                .unwrap_or(BillingModel::Postpaid),
            is_balance_negative: body.is_balance_negative,
            fetched_at: Utc::now(),
        })
    }
}
