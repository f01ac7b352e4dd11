//! Tenant-level enforcement
//!
//! Fleet-wide stream termination for suspended tenants and the
//! cross-service cache invalidation entrypoint the billing service calls.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::admission::AdmissionService;
use crate::balancer::LoadBalancer;
use crate::clients::{NodeAgentClient, StopSessionsRequest};
use crate::directory::NodeDirectory;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TerminateStreamsResponse {
    pub streams_terminated: usize,
    pub sessions_terminated: u64,
    pub stream_names: Vec<String>,
}

#[derive(Clone)]
pub struct TenantService {
    balancer: LoadBalancer,
    directory: NodeDirectory,
    admission: AdmissionService,
    node_agent: Arc<dyn NodeAgentClient>,
}

impl TenantService {
    pub fn new(
        balancer: LoadBalancer,
        directory: NodeDirectory,
        admission: AdmissionService,
        node_agent: Arc<dyn NodeAgentClient>,
    ) -> Self {
        Self {
            balancer,
            directory,
            admission,
            node_agent,
        }
    }

    /// Stop every active session of the tenant's streams, node by node
    ///
    /// Returns an audit record of what was terminated. Nodes that fail the
    /// stop command are logged and skipped; enforcement converges through
    /// subsequent heartbeats.
    pub async fn terminate_tenant_streams(
        &self,
        tenant_id: &str,
        reason: &str,
    ) -> AppResult<TerminateStreamsResponse> {
        if tenant_id.trim().is_empty() {
            return Err(AppError::invalid_input("tenant_id is required"));
        }

        let by_node = self.balancer.streams_by_tenant(tenant_id).await;
        let mut all_streams: Vec<String> = by_node.values().flatten().cloned().collect();
        all_streams.sort();
        all_streams.dedup();

        let dispatches = by_node.iter().map(|(node_id, stream_names)| {
            let request = StopSessionsRequest {
                stream_names: stream_names.clone(),
                tenant_id: tenant_id.to_string(),
                reason: reason.to_string(),
            };
            async move {
                let node = self.directory.lookup(node_id).await?;
                match self.node_agent.stop_sessions(&node, &request).await {
                    Ok(count) => Some(count),
                    Err(e) => {
                        warn!(tenant_id = %request.tenant_id, node_id = %node.node_id, error = %e, "stop sessions dispatch failed");
                        None
                    }
                }
            }
        });
        let sessions_terminated: u64 = join_all(dispatches).await.into_iter().flatten().sum();

        info!(
            tenant_id,
            reason,
            streams = all_streams.len(),
            sessions = sessions_terminated,
            "tenant streams terminated"
        );
        Ok(TerminateStreamsResponse {
            streams_terminated: all_streams.len(),
            sessions_terminated,
            stream_names: all_streams,
        })
    }

    /// Cross-service invalidation: the billing service calls this when a
    /// tenant's state changes so the next resolve refetches
    pub async fn invalidate_tenant_cache(&self, tenant_id: &str) -> AppResult<bool> {
        if tenant_id.trim().is_empty() {
            return Err(AppError::invalid_input("tenant_id is required"));
        }
        Ok(self.admission.invalidate(tenant_id).await)
    }
}
