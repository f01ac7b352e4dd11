//! Node directory
//!
//! Process-wide authoritative view of the fleet: identity, capabilities,
//! output templates, health, last-seen load, geo position. Mutated only by
//! the registration/heartbeat path; stale nodes are flagged by a sweeper
//! tick and excluded from selection but never deleted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::models::{Node, NodeCapability, NodeHeartbeat};

/// In-memory fleet state with secondary indexes
#[derive(Default)]
struct DirectoryState {
    nodes: HashMap<String, Node>,
    by_host: HashMap<String, String>,
    by_capability: HashMap<NodeCapability, HashSet<String>>,
}

/// Process-wide node directory
///
/// Read-heavy: reads take the lock briefly and clone what they need, so
/// callers never hold the lock across await points.
#[derive(Clone)]
pub struct NodeDirectory {
    state: Arc<RwLock<DirectoryState>>,
    stale_ttl: Duration,
}

impl NodeDirectory {
    pub fn new(stale_ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState::default())),
            stale_ttl,
        }
    }

    /// Idempotent registration/heartbeat upsert
    ///
    /// Updates load, heartbeat, outputs and stream carriage; re-registers a
    /// previously stale node as alive.
    pub async fn upsert_node(&self, report: NodeHeartbeat) -> AppResult<()> {
        if report.node_id.trim().is_empty() {
            return Err(AppError::invalid_input("node_id must not be empty"));
        }

        let mut state = self.state.write().await;
        let state = &mut *state;

        // host or capabilities may have changed since the last report
        if let Some(existing) = state.nodes.get(&report.node_id) {
            if existing.host != report.host {
                state.by_host.remove(&existing.host);
            }
            for cap in &existing.capabilities {
                if let Some(set) = state.by_capability.get_mut(cap) {
                    set.remove(&report.node_id);
                }
            }
        }

        state.by_host.insert(report.host.clone(), report.node_id.clone());
        for cap in &report.capabilities {
            state
                .by_capability
                .entry(*cap)
                .or_default()
                .insert(report.node_id.clone());
        }

        let node = Node {
            node_id: report.node_id.clone(),
            host: report.host,
            base_url: report.base_url,
            capabilities: report.capabilities,
            geo: report.geo,
            location_name: report.location_name,
            outputs: report.outputs,
            last_heartbeat: Utc::now(),
            load_score: report.load_score.clamp(0, 10_000),
            tenant_streams: report.tenant_streams,
            alive: true,
        };
        debug!(node_id = %node.node_id, load = node.load_score, "node heartbeat");
        state.nodes.insert(report.node_id, node);
        Ok(())
    }

    /// Flag nodes whose heartbeat is older than the stale TTL
    ///
    /// Stale nodes stay in the directory so lookups and operator listings
    /// still see them; only selection excludes them.
    pub async fn mark_stale(&self, now: DateTime<Utc>) -> usize {
        let ttl = chrono::Duration::from_std(self.stale_ttl).unwrap_or(chrono::Duration::seconds(15));
        let cutoff = now - ttl;
        let mut flipped = 0;
        let mut state = self.state.write().await;
        for node in state.nodes.values_mut() {
            if node.alive && node.last_heartbeat < cutoff {
                node.alive = false;
                flipped += 1;
                warn!(node_id = %node.node_id, last_heartbeat = %node.last_heartbeat, "node marked stale");
            }
        }
        flipped
    }

    pub async fn lookup(&self, node_id: &str) -> Option<Node> {
        self.state.read().await.nodes.get(node_id).cloned()
    }

    pub async fn lookup_host(&self, host: &str) -> Option<String> {
        self.state.read().await.by_host.get(host).cloned()
    }

    /// Alive nodes advertising the capability
    pub async fn nodes_with_capability(&self, cap: NodeCapability) -> Vec<Node> {
        let state = self.state.read().await;
        state
            .by_capability
            .get(&cap)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.nodes.get(id))
                    .filter(|n| n.alive)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Output URL templates for a node, used by endpoint synthesis
    pub async fn outputs_for(&self, node_id: &str) -> Option<HashMap<String, String>> {
        self.state
            .read()
            .await
            .nodes
            .get(node_id)
            .map(|n| n.outputs.clone())
    }

    /// Full fleet snapshot for operator listings and health reporting
    pub async fn snapshot(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.state.read().await.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        nodes
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.nodes.is_empty()
    }

    /// Active streams owned by a tenant, grouped by the node carrying them
    pub async fn streams_by_tenant(&self, tenant_id: &str) -> HashMap<String, Vec<String>> {
        let state = self.state.read().await;
        let mut by_node: HashMap<String, Vec<String>> = HashMap::new();
        for node in state.nodes.values().filter(|n| n.alive) {
            for (internal_name, owner) in &node.tenant_streams {
                if owner == tenant_id {
                    by_node
                        .entry(node.node_id.clone())
                        .or_default()
                        .push(internal_name.clone());
                }
            }
        }
        for streams in by_node.values_mut() {
            streams.sort();
        }
        by_node
    }

    /// Spawn the fixed-tick stale sweeper
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let directory = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let flipped = directory.mark_stale(Utc::now()).await;
                if flipped > 0 {
                    debug!(count = flipped, "stale sweep flagged nodes");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat(node_id: &str, host: &str, caps: &[NodeCapability]) -> NodeHeartbeat {
        NodeHeartbeat {
            node_id: node_id.to_string(),
            host: host.to_string(),
            base_url: format!("http://{host}:4242"),
            capabilities: caps.iter().copied().collect(),
            geo: None,
            location_name: None,
            outputs: HashMap::new(),
            load_score: 100,
            tenant_streams: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn upsert_rejects_empty_node_id() {
        let directory = NodeDirectory::new(Duration::from_secs(15));
        let report = heartbeat("", "edge-1.example.com", &[NodeCapability::Edge]);
        assert!(matches!(
            directory.upsert_node(report).await,
            Err(AppError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn capability_index_follows_reregistration() {
        let directory = NodeDirectory::new(Duration::from_secs(15));
        directory
            .upsert_node(heartbeat("n1", "a.example.com", &[NodeCapability::Ingest]))
            .await
            .unwrap();
        assert_eq!(directory.nodes_with_capability(NodeCapability::Ingest).await.len(), 1);

        // node reregisters as storage-only
        directory
            .upsert_node(heartbeat("n1", "a.example.com", &[NodeCapability::Storage]))
            .await
            .unwrap();
        assert!(directory.nodes_with_capability(NodeCapability::Ingest).await.is_empty());
        assert_eq!(directory.nodes_with_capability(NodeCapability::Storage).await.len(), 1);
    }

    #[tokio::test]
    async fn stale_nodes_are_flagged_not_deleted() {
        let directory = NodeDirectory::new(Duration::from_secs(15));
        directory
            .upsert_node(heartbeat("n1", "a.example.com", &[NodeCapability::Edge]))
            .await
            .unwrap();

        let future = Utc::now() + chrono::Duration::seconds(60);
        assert_eq!(directory.mark_stale(future).await, 1);

        // excluded from selection, still visible to lookups
        assert!(directory.nodes_with_capability(NodeCapability::Edge).await.is_empty());
        let node = directory.lookup("n1").await.unwrap();
        assert!(!node.alive);

        // heartbeat revives
        directory
            .upsert_node(heartbeat("n1", "a.example.com", &[NodeCapability::Edge]))
            .await
            .unwrap();
        assert_eq!(directory.nodes_with_capability(NodeCapability::Edge).await.len(), 1);
    }

    #[tokio::test]
    async fn streams_by_tenant_groups_by_node() {
        let directory = NodeDirectory::new(Duration::from_secs(15));
        let mut report = heartbeat("n1", "a.example.com", &[NodeCapability::Ingest]);
        report.tenant_streams =
            HashMap::from([("live+foo".to_string(), "T1".to_string()),
                           ("live+bar".to_string(), "T2".to_string())]);
        directory.upsert_node(report).await.unwrap();

        let grouped = directory.streams_by_tenant("T1").await;
        assert_eq!(grouped.get("n1").unwrap(), &vec!["live+foo".to_string()]);
        assert!(directory.streams_by_tenant("T3").await.is_empty());
    }
}
