//! Viewer endpoint resolution
//!
//! The read-heavy hot path: resolve the public content ID, admit the tenant,
//! pick a node, synthesize playback endpoints from the node's output
//! templates, and emit a routing event. The caller's claimed content type is
//! never consulted; the ID alone decides which path runs.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::admission::AdmissionService;
use crate::analytics::AnalyticsSink;
use crate::balancer::{LoadBalancer, SelectionRequest};
use crate::clients::{NodeAgentClient, PurserClient};
use crate::database::repositories::ArtifactNodeRepository;
use crate::directory::NodeDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::events::bucket_coordinate;
use crate::models::{
    Admission, Artifact, GeoPosition, LoadBalancingData, MistTrigger, Node, NodeCapability,
    StorageLocation, StreamTarget, TriggerPayload,
};
use crate::observability::AppObservability;
use crate::resolver::{ContentResolver, ResolvedContent};
use crate::utils::geoip::GeoIpResolver;
use crate::utils::url::{derive_whep_url, synthesize_output_url};

/// Hint handed back with defrosting rejections
const DEFROST_RETRY_AFTER_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResolveViewerRequest {
    pub content_id: String,
    /// Accepted on the wire but never consulted: the ID alone determines
    /// the content type
    pub content_type: Option<String>,
    #[serde(skip)]
    pub payment: Option<String>,
    #[serde(skip)]
    pub client_ip: Option<IpAddr>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlaybackEndpoint {
    pub protocol: String,
    pub url: String,
    pub can_seek: bool,
    pub can_switch_quality: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResolveViewerResponse {
    pub content_type: String,
    pub internal_name: String,
    pub node_id: String,
    pub host: String,
    pub endpoints: Vec<PlaybackEndpoint>,
    pub score: i64,
}

/// Seek and quality-switch support per output protocol
fn protocol_capabilities(protocol: &str, is_live: bool) -> (bool, bool) {
    match protocol.to_ascii_uppercase().as_str() {
        "WHEP" => (false, false),
        "HLS" | "DASH" => (!is_live, true),
        "MP4" | "WEBM" => (true, false),
        "MIST_HTML" | "PLAYER_JS" => (!is_live, true),
        _ => (false, false),
    }
}

#[derive(Clone)]
pub struct ViewerService {
    resolver: ContentResolver,
    admission: AdmissionService,
    balancer: LoadBalancer,
    directory: NodeDirectory,
    placements: ArtifactNodeRepository,
    node_agent: Arc<dyn NodeAgentClient>,
    purser: Option<Arc<dyn PurserClient>>,
    analytics: AnalyticsSink,
    geoip: GeoIpResolver,
    observability: Option<AppObservability>,
    cluster_id: String,
    infra_tenant_id: String,
}

impl ViewerService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: ContentResolver,
        admission: AdmissionService,
        balancer: LoadBalancer,
        directory: NodeDirectory,
        placements: ArtifactNodeRepository,
        node_agent: Arc<dyn NodeAgentClient>,
        purser: Option<Arc<dyn PurserClient>>,
        analytics: AnalyticsSink,
        geoip: GeoIpResolver,
        observability: Option<AppObservability>,
        cluster_id: String,
        infra_tenant_id: String,
    ) -> Self {
        Self {
            resolver,
            admission,
            balancer,
            directory,
            placements,
            node_agent,
            purser,
            analytics,
            geoip,
            observability,
            cluster_id,
            infra_tenant_id,
        }
    }

    pub async fn resolve_viewer_endpoint(
        &self,
        request: ResolveViewerRequest,
    ) -> AppResult<ResolveViewerResponse> {
        let started = Instant::now();
        if let Some(obs) = &self.observability {
            obs.resolves_total.add(1, &[]);
        }

        let result = self.resolve_inner(&request, started).await;
        match &result {
            Ok(_) => {
                if let Some(obs) = &self.observability {
                    obs.resolve_latency.record(started.elapsed().as_secs_f64(), &[]);
                }
            }
            Err(
                AppError::PaymentRequired { .. }
                | AppError::Unavailable { .. }
                | AppError::Defrosting { .. },
            ) => {
                if let Some(obs) = &self.observability {
                    obs.resolve_rejections.add(1, &[]);
                }
            }
            Err(_) => {}
        }
        result
    }

    async fn resolve_inner(
        &self,
        request: &ResolveViewerRequest,
        started: Instant,
    ) -> AppResult<ResolveViewerResponse> {
        let resolved = self.resolver.resolve(&request.content_id).await?;
        let tenant_id = resolved.tenant_id().map(|t| t.to_string());

        // explicit payment settles before admission is consulted
        let mut x402_paid = false;
        if let (Some(payment), Some(purser)) = (&request.payment, &self.purser) {
            purser
                .settle(payment, tenant_id.as_deref().unwrap_or_default(), &request.content_id)
                .await?;
            x402_paid = true;
        }

        if let Some(tenant) = tenant_id.as_deref() {
            if !x402_paid {
                match self.admission.check_admission(tenant).await {
                    Admission::Allowed => {}
                    Admission::Suspended => {
                        return Err(AppError::payment_required(
                            "payment required - owner account suspended",
                        ));
                    }
                    Admission::PrepaidExhausted => {
                        return Err(AppError::payment_required(
                            "payment required - prepaid balance exhausted",
                        ));
                    }
                }
            }
        }

        let viewer_geo = request.client_ip.and_then(|ip| self.geoip.lookup(ip));

        match resolved {
            ResolvedContent::Live(target) => {
                self.resolve_live_playback(request, target, viewer_geo, started)
                    .await
            }
            ResolvedContent::Artifact(artifact) => {
                self.resolve_artifact_playback(artifact, viewer_geo, started)
                    .await
            }
        }
    }

    async fn resolve_live_playback(
        &self,
        request: &ResolveViewerRequest,
        target: StreamTarget,
        viewer_geo: Option<GeoPosition>,
        started: Instant,
    ) -> AppResult<ResolveViewerResponse> {
        let selection = SelectionRequest::new(NodeCapability::Edge, target.internal_name.clone())
            .with_viewer_geo(viewer_geo)
            .with_client_ip(request.client_ip)
            .with_exclusions(HashSet::new());
        let ranked = self.balancer.get_top_nodes(&selection, 5).await?;
        let best = ranked
            .first()
            .cloned()
            .ok_or_else(|| AppError::unavailable("no edge node available"))?;

        let endpoints = build_endpoints(&best.node, &target.internal_name, true);
        if endpoints.is_empty() {
            return Err(AppError::unavailable("selected node advertises no outputs"));
        }

        // synthetic session so viewer counts include this resolve
        if let Err(e) = self
            .node_agent
            .create_virtual_viewer(&best.node, &target.internal_name, &Uuid::new_v4().to_string())
            .await
        {
            debug!(node_id = %best.node.node_id, error = %e, "virtual viewer creation failed");
        }

        self.emit_routing_event(
            &target.tenant_id,
            target.stream_id.clone(),
            &target.internal_name,
            &best.node,
            best.score,
            ranked.len(),
            viewer_geo,
            started,
        );

        Ok(ResolveViewerResponse {
            content_type: "live".to_string(),
            internal_name: target.internal_name,
            node_id: best.node.node_id.clone(),
            host: best.node.host.clone(),
            endpoints,
            score: best.score,
        })
    }

    async fn resolve_artifact_playback(
        &self,
        artifact: Artifact,
        viewer_geo: Option<GeoPosition>,
        started: Instant,
    ) -> AppResult<ResolveViewerResponse> {
        let placements = self.placements.placements_for(&artifact.artifact_hash).await?;
        let candidate_count = placements.len();

        let mut serving: Option<Node> = None;
        for placement in placements.iter().filter(|p| !p.is_orphaned) {
            if let Some(node) = self.directory.lookup(&placement.node_id).await {
                if node.alive {
                    serving = Some(node);
                    break;
                }
            }
        }

        let Some(node) = serving else {
            // an S3-only artifact is being promoted back to a warm node
            if artifact.storage_location == StorageLocation::S3 {
                return Err(AppError::Defrosting {
                    message: format!("artifact {} is defrosting", artifact.artifact_hash),
                    retry_after: DEFROST_RETRY_AFTER_SECS,
                });
            }
            return Err(AppError::unavailable("no node holds this artifact"));
        };

        let endpoints = build_endpoints(&node, &artifact.artifact_internal_name, false);
        if endpoints.is_empty() {
            return Err(AppError::unavailable("serving node advertises no outputs"));
        }

        if let Some(tenant_id) = artifact.tenant_id.as_deref() {
            self.emit_routing_event(
                tenant_id,
                artifact.stream_id.clone(),
                &artifact.internal_name,
                &node,
                0,
                candidate_count,
                viewer_geo,
                started,
            );
        }

        Ok(ResolveViewerResponse {
            content_type: artifact.artifact_type.to_string(),
            internal_name: artifact.internal_name,
            node_id: node.node_id.clone(),
            host: node.host.clone(),
            endpoints,
            score: 0,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_routing_event(
        &self,
        stream_tenant_id: &str,
        stream_id: Option<String>,
        internal_name: &str,
        node: &Node,
        score: i64,
        candidate_count: usize,
        viewer_geo: Option<GeoPosition>,
        started: Instant,
    ) {
        self.analytics.emit_trigger(MistTrigger {
            trigger_type: "load_balancing".to_string(),
            stream_id,
            tenant_id: self.infra_tenant_id.clone(),
            payload: TriggerPayload::LoadBalancing(LoadBalancingData {
                tenant_id: self.infra_tenant_id.clone(),
                stream_tenant_id: stream_tenant_id.to_string(),
                cluster_id: self.cluster_id.clone(),
                internal_name: internal_name.to_string(),
                selected_node_id: node.node_id.clone(),
                candidate_count,
                score,
                client_lat: viewer_geo.map(|g| bucket_coordinate(g.lat)),
                client_lon: viewer_geo.map(|g| bucket_coordinate(g.lon)),
                node_lat: node.geo.map(|g| bucket_coordinate(g.lat)),
                node_lon: node.geo.map(|g| bucket_coordinate(g.lon)),
                latency_ms: started.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            }),
        });
    }
}

/// Build the playback endpoint list from a node's output templates
///
/// A WHEP endpoint is derived from the MIST_HTML URL when the node
/// advertises no explicit WHEP template.
fn build_endpoints(node: &Node, identifier: &str, is_live: bool) -> Vec<PlaybackEndpoint> {
    let mut endpoints: Vec<PlaybackEndpoint> = node
        .outputs
        .iter()
        .map(|(protocol, template)| {
            let (can_seek, can_switch_quality) = protocol_capabilities(protocol, is_live);
            PlaybackEndpoint {
                protocol: protocol.clone(),
                url: synthesize_output_url(template, identifier, &node.host),
                can_seek,
                can_switch_quality,
            }
        })
        .collect();

    let has_whep = endpoints
        .iter()
        .any(|e| e.protocol.eq_ignore_ascii_case("WHEP"));
    if !has_whep {
        if let Some(mist) = endpoints
            .iter()
            .find(|e| e.protocol.eq_ignore_ascii_case("MIST_HTML"))
        {
            if let Some(url) = derive_whep_url(&mist.url, identifier) {
                let (can_seek, can_switch_quality) = protocol_capabilities("WHEP", is_live);
                endpoints.push(PlaybackEndpoint {
                    protocol: "WHEP".to_string(),
                    url,
                    can_seek,
                    can_switch_quality,
                });
            }
        } else {
            warn!(node_id = %node.node_id, "node advertises neither WHEP nor MIST_HTML output");
        }
    }

    endpoints.sort_by(|a, b| a.protocol.cmp(&b.protocol));
    endpoints
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn node_with_outputs(outputs: &[(&str, &str)]) -> Node {
        Node {
            node_id: "edge-1".to_string(),
            host: "https://edge-1.example.com".to_string(),
            base_url: "http://edge-1.example.com:4242".to_string(),
            capabilities: [NodeCapability::Edge].into_iter().collect(),
            geo: None,
            location_name: None,
            outputs: outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            last_heartbeat: Utc::now(),
            load_score: 0,
            tenant_streams: HashMap::new(),
            alive: true,
        }
    }

    #[test]
    fn protocol_capability_table() {
        assert_eq!(protocol_capabilities("WHEP", true), (false, false));
        assert_eq!(protocol_capabilities("HLS", true), (false, true));
        assert_eq!(protocol_capabilities("HLS", false), (true, true));
        assert_eq!(protocol_capabilities("MP4", true), (true, false));
        assert_eq!(protocol_capabilities("PLAYER_JS", false), (true, true));
        assert_eq!(protocol_capabilities("UNKNOWN", false), (false, false));
    }

    #[test]
    fn endpoints_substitute_templates() {
        let node = node_with_outputs(&[
            ("HLS", "https://HOST/hls/$/index.m3u8"),
            ("WHEP", "https://HOST/webrtc/$"),
        ]);
        let endpoints = build_endpoints(&node, "live+foo", true);
        assert_eq!(endpoints.len(), 2);
        let hls = endpoints.iter().find(|e| e.protocol == "HLS").unwrap();
        assert_eq!(hls.url, "https://edge-1.example.com/hls/live+foo/index.m3u8");
        assert!(!hls.can_seek);
        assert!(hls.can_switch_quality);
    }

    #[test]
    fn whep_is_derived_from_mist_html_when_missing() {
        let node = node_with_outputs(&[("MIST_HTML", "https://HOST/view/$.html")]);
        let endpoints = build_endpoints(&node, "live+foo", true);
        let whep = endpoints.iter().find(|e| e.protocol == "WHEP").unwrap();
        assert_eq!(whep.url, "https://edge-1.example.com/view/webrtc/live+foo");
    }
}
