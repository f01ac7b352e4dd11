//! Fleet node model and resolver output types

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// What a node can do; selection gates on this
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeCapability {
    Ingest,
    Storage,
    Edge,
}

/// Geographic position of a node or viewer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPosition {
    pub lat: f64,
    pub lon: f64,
}

/// Process-wide view of one edge/storage/ingest node
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Node {
    pub node_id: String,
    pub host: String,
    pub base_url: String,
    pub capabilities: HashSet<NodeCapability>,
    pub geo: Option<GeoPosition>,
    pub location_name: Option<String>,
    /// Per-protocol output URL templates with `$` and `HOST` placeholders
    pub outputs: HashMap<String, String>,
    pub last_heartbeat: DateTime<Utc>,
    /// Reported load in [0, 10000]; higher means more loaded
    pub load_score: i64,
    /// Streams the node currently carries as sources: internal name to
    /// owning tenant
    pub tenant_streams: HashMap<String, String>,
    /// Flipped by the stale sweeper; stale nodes are excluded from selection
    /// but never deleted
    pub alive: bool,
}

impl Node {
    pub fn has_capability(&self, cap: NodeCapability) -> bool {
        self.capabilities.contains(&cap)
    }

    pub fn carries_stream(&self, internal_name: &str) -> bool {
        self.tenant_streams.contains_key(internal_name)
    }
}

/// Registration/heartbeat report from a node agent
///
/// The only path that mutates the directory.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NodeHeartbeat {
    pub node_id: String,
    pub host: String,
    pub base_url: String,
    #[serde(default)]
    pub capabilities: HashSet<NodeCapability>,
    pub geo: Option<GeoPosition>,
    pub location_name: Option<String>,
    #[serde(default)]
    pub outputs: HashMap<String, String>,
    #[serde(default)]
    pub load_score: i64,
    #[serde(default)]
    pub tenant_streams: HashMap<String, String>,
}

/// Resolver output for live content; ephemeral, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTarget {
    pub internal_name: String,
    pub tenant_id: String,
    pub stream_id: Option<String>,
    pub view_key: String,
}
