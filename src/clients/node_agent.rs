//! Node agent RPC client
//!
//! Typed commands dispatched to per-node agents over unary HTTP/JSON.
//! Failures are classified transient (connection errors, timeouts, 5xx) or
//! fatal (4xx, malformed responses); dispatch retries transient failures a
//! bounded number of times within the operation and never beyond it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::NodeRpcConfig;
use crate::errors::{RpcError, RpcResult};
use crate::models::{Node, StreamMeta};

/// Command to pull a clip out of a live buffer onto a storage node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipPullRequest {
    pub clip_hash: String,
    pub stream_name: String,
    pub format: String,
    pub output_name: String,
    pub source_base_url: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_unix: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_unix: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipDeleteRequest {
    pub clip_hash: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DvrConfig {
    pub enabled: bool,
    pub retention_days: u32,
    pub format: String,
    pub segment_duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DvrStartRequest {
    pub dvr_hash: String,
    pub internal_name: String,
    pub source_base_url: String,
    pub request_id: String,
    pub config: DvrConfig,
    pub stream_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DvrStopRequest {
    pub dvr_hash: String,
    pub internal_name: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DvrDeleteRequest {
    pub dvr_hash: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VodDeleteRequest {
    pub artifact_hash: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopSessionsRequest {
    pub stream_names: Vec<String>,
    pub tenant_id: String,
    pub reason: String,
}

/// Outbound command surface of a node agent
#[async_trait]
pub trait NodeAgentClient: Send + Sync {
    async fn clip_pull(&self, node: &Node, request: &ClipPullRequest) -> RpcResult<()>;
    async fn clip_delete(&self, node: &Node, request: &ClipDeleteRequest) -> RpcResult<()>;
    async fn dvr_start(&self, node: &Node, request: &DvrStartRequest) -> RpcResult<()>;
    async fn dvr_stop(&self, node: &Node, request: &DvrStopRequest) -> RpcResult<()>;
    async fn dvr_delete(&self, node: &Node, request: &DvrDeleteRequest) -> RpcResult<()>;
    async fn vod_delete(&self, node: &Node, request: &VodDeleteRequest) -> RpcResult<()>;
    async fn stop_sessions(&self, node: &Node, request: &StopSessionsRequest) -> RpcResult<u64>;

    /// Create a synthetic session record on the node so viewer counts stay
    /// consistent with HTTP-path resolves
    async fn create_virtual_viewer(
        &self,
        node: &Node,
        internal_name: &str,
        request_id: &str,
    ) -> RpcResult<()>;

    /// Fetch and schema-validate the node's per-stream metadata blob
    async fn fetch_stream_meta(&self, node: &Node, internal_name: &str) -> RpcResult<StreamMeta>;
}

/// HTTP/JSON implementation posting to each node's base URL
#[derive(Clone)]
pub struct HttpNodeAgentClient {
    client: reqwest::Client,
    retry_attempts: u32,
}

impl HttpNodeAgentClient {
    pub fn new(config: &NodeRpcConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            retry_attempts: config.retry_attempts.max(1),
        }
    }

    fn classify(node_id: &str, err: reqwest::Error) -> RpcError {
        if err.is_timeout() || err.is_connect() {
            return RpcError::Transient {
                node_id: node_id.to_string(),
                message: err.to_string(),
            };
        }
        match err.status() {
            Some(status) if status.is_server_error() => RpcError::Transient {
                node_id: node_id.to_string(),
                message: format!("node returned {status}"),
            },
            Some(status) => RpcError::Fatal {
                node_id: node_id.to_string(),
                message: format!("node returned {status}"),
            },
            None => RpcError::Transient {
                node_id: node_id.to_string(),
                message: err.to_string(),
            },
        }
    }

    /// POST a command, retrying transient failures within the bounded budget
    async fn post_command<T: Serialize>(
        &self,
        node: &Node,
        path: &str,
        body: &T,
    ) -> RpcResult<Value> {
        let url = format!("{}/{}", node.base_url.trim_end_matches('/'), path);
        let mut last_err = None;
        for attempt in 1..=self.retry_attempts {
            let result = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            match result {
                Ok(response) => {
                    debug!(node_id = %node.node_id, path, attempt, "node command dispatched");
                    return response.json::<Value>().await.map_err(|e| RpcError::Fatal {
                        node_id: node.node_id.clone(),
                        message: format!("invalid response body: {e}"),
                    });
                }
                Err(e) => {
                    let classified = Self::classify(&node.node_id, e);
                    if classified.is_transient() && attempt < self.retry_attempts {
                        warn!(node_id = %node.node_id, path, attempt, error = %classified, "transient dispatch failure, retrying");
                        last_err = Some(classified);
                        continue;
                    }
                    return Err(classified);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| RpcError::Transient {
            node_id: node.node_id.clone(),
            message: "dispatch retries exhausted".to_string(),
        }))
    }
}

#[async_trait]
impl NodeAgentClient for HttpNodeAgentClient {
    async fn clip_pull(&self, node: &Node, request: &ClipPullRequest) -> RpcResult<()> {
        self.post_command(node, "api/clip/pull", request).await.map(|_| ())
    }

    async fn clip_delete(&self, node: &Node, request: &ClipDeleteRequest) -> RpcResult<()> {
        self.post_command(node, "api/clip/delete", request).await.map(|_| ())
    }

    async fn dvr_start(&self, node: &Node, request: &DvrStartRequest) -> RpcResult<()> {
        self.post_command(node, "api/dvr/start", request).await.map(|_| ())
    }

    async fn dvr_stop(&self, node: &Node, request: &DvrStopRequest) -> RpcResult<()> {
        self.post_command(node, "api/dvr/stop", request).await.map(|_| ())
    }

    async fn dvr_delete(&self, node: &Node, request: &DvrDeleteRequest) -> RpcResult<()> {
        self.post_command(node, "api/dvr/delete", request).await.map(|_| ())
    }

    async fn vod_delete(&self, node: &Node, request: &VodDeleteRequest) -> RpcResult<()> {
        self.post_command(node, "api/vod/delete", request).await.map(|_| ())
    }

    async fn stop_sessions(&self, node: &Node, request: &StopSessionsRequest) -> RpcResult<u64> {
        let response = self.post_command(node, "api/sessions/stop", request).await?;
        Ok(response
            .get("sessions_terminated")
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    async fn create_virtual_viewer(
        &self,
        node: &Node,
        internal_name: &str,
        request_id: &str,
    ) -> RpcResult<()> {
        let body = serde_json::json!({
            "stream_name": internal_name,
            "request_id": request_id,
        });
        self.post_command(node, "api/viewers/virtual", &body).await.map(|_| ())
    }

    async fn fetch_stream_meta(&self, node: &Node, internal_name: &str) -> RpcResult<StreamMeta> {
        let url = format!(
            "{}/json_{}.js",
            node.base_url.trim_end_matches('/'),
            internal_name
        );
        let raw: Value = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Self::classify(&node.node_id, e))?
            .json()
            .await
            .map_err(|e| RpcError::Fatal {
                node_id: node.node_id.clone(),
                message: format!("invalid meta document: {e}"),
            })?;
        Ok(StreamMeta::from_raw(&raw))
    }
}
