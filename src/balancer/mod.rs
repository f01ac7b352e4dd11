//! Load balancer
//!
//! Scores candidate nodes for a (stream, viewer-geo, capability) triple and
//! returns the best node or a ranked list. Capability and liveness are hard
//! gates; stream locality, load headroom, and geographic proximity shape the
//! score; saturated nodes only serve when nothing else qualifies.

pub mod geo;

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use tracing::debug;

use crate::config::BalancerConfig;
use crate::directory::NodeDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::{GeoPosition, Node, NodeCapability};
use crate::utils::geoip::GeoIpResolver;

/// One node-selection request
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    /// Required capability; nodes lacking it are never considered
    pub capability: NodeCapability,
    pub internal_name: String,
    pub viewer_geo: Option<GeoPosition>,
    /// Used to resolve viewer geo when the caller did not
    pub client_ip: Option<IpAddr>,
    /// Nodes the caller already tried or wants avoided
    pub exclude: HashSet<String>,
    /// Prefer nodes already carrying the stream as a source
    pub source_selection: bool,
}

impl SelectionRequest {
    pub fn new(capability: NodeCapability, internal_name: impl Into<String>) -> Self {
        Self {
            capability,
            internal_name: internal_name.into(),
            viewer_geo: None,
            client_ip: None,
            exclude: HashSet::new(),
            source_selection: false,
        }
    }

    pub fn with_source_selection(mut self) -> Self {
        self.source_selection = true;
        self
    }

    pub fn with_viewer_geo(mut self, geo: Option<GeoPosition>) -> Self {
        self.viewer_geo = geo;
        self
    }

    pub fn with_client_ip(mut self, ip: Option<IpAddr>) -> Self {
        self.client_ip = ip;
        self
    }

    pub fn with_exclusions(mut self, exclude: HashSet<String>) -> Self {
        self.exclude = exclude;
        self
    }
}

/// A candidate with its computed score and tie-break inputs
#[derive(Debug, Clone)]
pub struct ScoredNode {
    pub node: Node,
    /// Final scalar in [0, 10000]; higher is better
    pub score: i64,
    pub carries_stream: bool,
    pub distance_km: Option<f64>,
}

#[derive(Clone)]
pub struct LoadBalancer {
    directory: NodeDirectory,
    geoip: GeoIpResolver,
    config: BalancerConfig,
}

impl LoadBalancer {
    pub fn new(directory: NodeDirectory, geoip: GeoIpResolver, config: BalancerConfig) -> Self {
        Self {
            directory,
            geoip,
            config,
        }
    }

    /// Best node for the request, or `Unavailable` when the gated set is
    /// empty
    pub async fn get_best_node(&self, request: &SelectionRequest) -> AppResult<ScoredNode> {
        let ranked = self.get_top_nodes(request, 1).await?;
        ranked.into_iter().next().ok_or_else(|| {
            AppError::unavailable(format!(
                "no {} node available for {}",
                request.capability, request.internal_name
            ))
        })
    }

    /// Ranked list of up to `k` candidates
    ///
    /// Ranking is deterministic for a fixed directory snapshot: stream
    /// locality first, then proximity, then load headroom, then node id.
    pub async fn get_top_nodes(
        &self,
        request: &SelectionRequest,
        k: usize,
    ) -> AppResult<Vec<ScoredNode>> {
        let viewer_geo = match request.viewer_geo {
            Some(geo) => Some(geo),
            None => request.client_ip.and_then(|ip| self.geoip.lookup(ip)),
        };

        // capability and liveness gates happen in the directory read
        let candidates: Vec<Node> = self
            .directory
            .nodes_with_capability(request.capability)
            .await
            .into_iter()
            .filter(|n| !request.exclude.contains(&n.node_id))
            .collect();

        if candidates.is_empty() {
            return Err(AppError::unavailable(format!(
                "no {} node available for {}",
                request.capability, request.internal_name
            )));
        }

        let (unsaturated, saturated): (Vec<Node>, Vec<Node>) = candidates
            .into_iter()
            .partition(|n| n.load_score < self.config.saturation_threshold);
        // saturated nodes only serve when nothing else qualifies
        let pool = if unsaturated.is_empty() { saturated } else { unsaturated };

        let mut scored: Vec<ScoredNode> = pool
            .into_iter()
            .map(|node| self.score(node, request, viewer_geo))
            .collect();

        scored.sort_by(|a, b| {
            b.carries_stream
                .cmp(&a.carries_stream)
                .then_with(|| {
                    let da = a.distance_km.unwrap_or(f64::MAX);
                    let db = b.distance_km.unwrap_or(f64::MAX);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.node.load_score.cmp(&b.node.load_score))
                .then_with(|| a.node.node_id.cmp(&b.node.node_id))
        });
        scored.truncate(k);

        debug!(
            stream = %request.internal_name,
            capability = %request.capability,
            candidates = scored.len(),
            best = scored.first().map(|s| s.node.node_id.as_str()).unwrap_or("-"),
            "node selection"
        );
        Ok(scored)
    }

    fn score(
        &self,
        node: Node,
        request: &SelectionRequest,
        viewer_geo: Option<GeoPosition>,
    ) -> ScoredNode {
        let carries_stream = request.source_selection && node.carries_stream(&request.internal_name);

        let headroom = 10_000 - node.load_score.clamp(0, 10_000);
        let locality = if carries_stream { self.config.locality_bonus } else { 0 };

        let distance_km = match (viewer_geo, node.geo) {
            (Some(viewer), Some(node_geo)) => Some(geo::haversine_km(viewer, node_geo)),
            _ => None,
        };
        let proximity_penalty = distance_km
            .map(|d| {
                let normalized = (d / self.config.max_distance_km).min(1.0);
                (normalized * self.config.distance_weight) as i64
            })
            .unwrap_or(0);

        let score = (headroom + locality - proximity_penalty).clamp(0, 10_000);
        ScoredNode {
            node,
            score,
            carries_stream,
            distance_km,
        }
    }

    /// Active streams owned by a tenant, grouped by carrying node; supports
    /// fleet-wide suspension enforcement
    pub async fn streams_by_tenant(&self, tenant_id: &str) -> HashMap<String, Vec<String>> {
        self.directory.streams_by_tenant(tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn make_heartbeat(
        node_id: &str,
        caps: &[NodeCapability],
        load: i64,
        geo: Option<GeoPosition>,
        streams: &[(&str, &str)],
    ) -> crate::models::NodeHeartbeat {
        crate::models::NodeHeartbeat {
            node_id: node_id.to_string(),
            host: format!("{node_id}.example.com"),
            base_url: format!("http://{node_id}.example.com:4242"),
            capabilities: caps.iter().copied().collect(),
            geo,
            location_name: None,
            outputs: HashMap::new(),
            load_score: load,
            tenant_streams: streams
                .iter()
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
        }
    }

    async fn balancer_with(nodes: Vec<crate::models::NodeHeartbeat>) -> LoadBalancer {
        let directory = NodeDirectory::new(Duration::from_secs(15));
        for node in nodes {
            directory.upsert_node(node).await.unwrap();
        }
        LoadBalancer::new(directory, GeoIpResolver::disabled(), BalancerConfig::default())
    }

    #[tokio::test]
    async fn capability_gate_is_hard() {
        let lb = balancer_with(vec![make_heartbeat(
            "n1",
            &[NodeCapability::Ingest],
            100,
            None,
            &[],
        )])
        .await;

        let request = SelectionRequest::new(NodeCapability::Storage, "live+foo");
        assert!(matches!(
            lb.get_best_node(&request).await,
            Err(AppError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn stream_locality_beats_lower_load() {
        let lb = balancer_with(vec![
            make_heartbeat("idle", &[NodeCapability::Ingest], 0, None, &[]),
            make_heartbeat(
                "carrier",
                &[NodeCapability::Ingest],
                5000,
                None,
                &[("live+foo", "T1")],
            ),
        ])
        .await;

        let request =
            SelectionRequest::new(NodeCapability::Ingest, "live+foo").with_source_selection();
        let best = lb.get_best_node(&request).await.unwrap();
        assert_eq!(best.node.node_id, "carrier");
        assert!(best.carries_stream);

        // without source selection the idle node wins
        let request = SelectionRequest::new(NodeCapability::Ingest, "live+foo");
        let best = lb.get_best_node(&request).await.unwrap();
        assert_eq!(best.node.node_id, "idle");
    }

    #[tokio::test]
    async fn closer_node_wins_on_equal_locality() {
        let viewer = GeoPosition { lat: 52.52, lon: 13.405 }; // Berlin
        let lb = balancer_with(vec![
            make_heartbeat(
                "faraway",
                &[NodeCapability::Edge],
                100,
                Some(GeoPosition { lat: 35.68, lon: 139.69 }), // Tokyo
                &[],
            ),
            make_heartbeat(
                "nearby",
                &[NodeCapability::Edge],
                100,
                Some(GeoPosition { lat: 50.11, lon: 8.68 }), // Frankfurt
                &[],
            ),
        ])
        .await;

        let request = SelectionRequest::new(NodeCapability::Edge, "live+foo")
            .with_viewer_geo(Some(viewer));
        let ranked = lb.get_top_nodes(&request, 10).await.unwrap();
        assert_eq!(ranked[0].node.node_id, "nearby");
        assert_eq!(ranked[1].node.node_id, "faraway");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[tokio::test]
    async fn saturated_nodes_serve_only_as_last_resort() {
        let lb = balancer_with(vec![
            make_heartbeat("hot", &[NodeCapability::Edge], 9500, None, &[]),
            make_heartbeat("cool", &[NodeCapability::Edge], 2000, None, &[]),
        ])
        .await;

        let request = SelectionRequest::new(NodeCapability::Edge, "live+foo");
        let ranked = lb.get_top_nodes(&request, 10).await.unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].node.node_id, "cool");

        // exclude the only unsaturated node and the hot one steps in
        let request = SelectionRequest::new(NodeCapability::Edge, "live+foo")
            .with_exclusions(HashSet::from(["cool".to_string()]));
        let best = lb.get_best_node(&request).await.unwrap();
        assert_eq!(best.node.node_id, "hot");
    }

    #[tokio::test]
    async fn ranking_is_deterministic_over_ties() {
        let lb = balancer_with(vec![
            make_heartbeat("b", &[NodeCapability::Edge], 100, None, &[]),
            make_heartbeat("a", &[NodeCapability::Edge], 100, None, &[]),
            make_heartbeat("c", &[NodeCapability::Edge], 100, None, &[]),
        ])
        .await;

        let request = SelectionRequest::new(NodeCapability::Edge, "live+foo");
        for _ in 0..5 {
            let ranked = lb.get_top_nodes(&request, 10).await.unwrap();
            let ids: Vec<&str> = ranked.iter().map(|s| s.node.node_id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
        }
    }

    #[tokio::test]
    async fn exclusions_remove_candidates() {
        let lb = balancer_with(vec![
            make_heartbeat("n1", &[NodeCapability::Storage], 100, None, &[]),
            make_heartbeat("n2", &[NodeCapability::Storage], 200, None, &[]),
        ])
        .await;

        let request = SelectionRequest::new(NodeCapability::Storage, "live+foo")
            .with_exclusions(HashSet::from(["n1".to_string()]));
        let best = lb.get_best_node(&request).await.unwrap();
        assert_eq!(best.node.node_id, "n2");
    }
}
