//! Analytics event envelopes
//!
//! Two planes leave the process: the `MistTrigger` envelope consumed by the
//! analytics bus, and the service-plane `ArtifactEvent` emitted once per
//! lifecycle transition. Both are fire-and-forget through the bounded outbox;
//! consumers must tolerate duplicates and slight reordering per artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::artifact::ArtifactType;

/// Envelope for every event handed to the analytics bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistTrigger {
    pub trigger_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    pub tenant_id: String,
    pub payload: TriggerPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerPayload {
    LoadBalancing(LoadBalancingData),
    ClipLifecycle(ClipLifecycleData),
    DvrLifecycle(DvrLifecycleData),
    VodLifecycle(VodLifecycleData),
}

/// Routing event for one viewer resolve
///
/// Dual-tenant attribution: `tenant_id` is the infra owner operating the
/// cluster, `stream_tenant_id` the owner of the content served. Coordinates
/// are geo-bucketed before emission for privacy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancingData {
    pub tenant_id: String,
    pub stream_tenant_id: String,
    pub cluster_id: String,
    pub internal_name: String,
    pub selected_node_id: String,
    pub candidate_count: usize,
    pub score: i64,
    pub client_lat: Option<f64>,
    pub client_lon: Option<f64>,
    pub node_lat: Option<f64>,
    pub node_lon: Option<f64>,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ClipLifecycleStage {
    Requested,
    Queued,
    Progress,
    Done,
    Failed,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipLifecycleData {
    pub clip_hash: String,
    pub stage: ClipLifecycleStage,
    pub internal_name: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DvrLifecycleStatus {
    Started,
    Recording,
    Stopped,
    Failed,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DvrLifecycleData {
    pub dvr_hash: String,
    pub status: DvrLifecycleStatus,
    pub internal_name: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VodLifecycleStatus {
    Requested,
    Uploading,
    Processing,
    Completed,
    Failed,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VodLifecycleData {
    pub artifact_hash: String,
    pub status: VodLifecycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Service-plane event emitted once per lifecycle transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEvent {
    pub artifact_type: ArtifactType,
    pub artifact_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Bucket coordinates to one decimal degree (~11 km) before they leave the
/// process
pub fn bucket_coordinate(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_stages_serialize_screaming() {
        assert_eq!(
            serde_json::to_string(&ClipLifecycleStage::Requested).unwrap(),
            "\"REQUESTED\""
        );
        assert_eq!(
            serde_json::to_string(&VodLifecycleStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
    }

    #[test]
    fn coordinates_bucket_to_one_decimal() {
        assert_eq!(bucket_coordinate(51.5074), 51.5);
        assert_eq!(bucket_coordinate(-0.1278), -0.1);
        assert_eq!(bucket_coordinate(0.0), 0.0);
    }
}
