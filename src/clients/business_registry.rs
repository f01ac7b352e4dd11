//! Business registry client
//!
//! The registry owns tenant/user/title/retention metadata and is the
//! authority for hash minting. The orchestrator only reads from it here;
//! denormalized tenant/user columns on artifacts are a fallback, never the
//! source of truth.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::errors::{AppError, AppResult};

/// Stream resolution result for view keys and stream keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStream {
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub internal_name: String,
    pub stream_id: Option<String>,
    pub playback_id: Option<String>,
}

/// Artifact-hash resolution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryArtifact {
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub internal_name: String,
    pub stream_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterDvrRequest {
    pub internal_name: String,
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub retention_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDvrResponse {
    pub dvr_hash: String,
    pub playback_id: Option<String>,
}

#[async_trait]
pub trait BusinessRegistryClient: Send + Sync {
    async fn resolve_stream(&self, view_key: &str) -> AppResult<Option<RegistryStream>>;
    async fn validate_stream_key(&self, stream_key: &str) -> AppResult<Option<RegistryStream>>;
    async fn resolve_clip_hash(&self, clip_hash: &str) -> AppResult<Option<RegistryArtifact>>;
    async fn resolve_dvr_hash(&self, dvr_hash: &str) -> AppResult<Option<RegistryArtifact>>;
    async fn register_dvr(&self, request: &RegisterDvrRequest) -> AppResult<RegisterDvrResponse>;
}

/// Wire shape shared by the registry's lookup endpoints
#[derive(Debug, Deserialize)]
struct LookupEnvelope<T> {
    found: bool,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Clone)]
pub struct HttpBusinessRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBusinessRegistryClient {
    pub fn new(base_url: &str, config: &RegistryConfig) -> Self {
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

    async fn lookup<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
    ) -> AppResult<Option<T>> {
        let url = format!("{}/{}/{}", self.base_url, path, key);
        let envelope: LookupEnvelope<T> = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::external_service("business-registry", e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::external_service("business-registry", e.to_string()))?;
        if envelope.found {
            Ok(envelope.body)
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl BusinessRegistryClient for HttpBusinessRegistryClient {
    async fn resolve_stream(&self, view_key: &str) -> AppResult<Option<RegistryStream>> {
        self.lookup("api/streams/resolve", view_key).await
    }

    async fn validate_stream_key(&self, stream_key: &str) -> AppResult<Option<RegistryStream>> {
        self.lookup("api/streams/validate-key", stream_key).await
    }

    async fn resolve_clip_hash(&self, clip_hash: &str) -> AppResult<Option<RegistryArtifact>> {
        self.lookup("api/clips/resolve", clip_hash).await
    }

    async fn resolve_dvr_hash(&self, dvr_hash: &str) -> AppResult<Option<RegistryArtifact>> {
        self.lookup("api/dvr/resolve", dvr_hash).await
    }

    async fn register_dvr(&self, request: &RegisterDvrRequest) -> AppResult<RegisterDvrResponse> {
        let url = format!("{}/api/dvr/register", self.base_url);
        self.client
            .post(&url)
            .json(request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::external_service("business-registry", e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::external_service("business-registry", e.to_string()))
    }
}
