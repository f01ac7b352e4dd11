//! Artifact domain model and per-type lifecycle state machines
//!
//! An artifact is a derived media object (clip, DVR recording, or uploaded
//! VOD) tracked by an opaque 32-hex hash. Status moves through a per-type
//! DAG and never backward; `deleted` is terminal for every type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Artifact kind; the lifecycle DAG depends on it
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactType {
    Clip,
    Dvr,
    Vod,
}

/// Where the authoritative bytes live
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StorageLocation {
    Pending,
    Local,
    S3,
}

/// Lifecycle status shared across artifact types
///
/// Not every status is valid for every type; validity and ordering are
/// enforced by [`ArtifactStatus::can_transition`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactStatus {
    Requested,
    Queued,
    Processing,
    Starting,
    Recording,
    Stopping,
    Stopped,
    Uploading,
    Ready,
    Failed,
    Deleted,
}

impl ArtifactStatus {
    /// Initial status for a freshly created artifact of the given type
    pub fn initial(artifact_type: ArtifactType) -> Self {
        match artifact_type {
            ArtifactType::Clip | ArtifactType::Dvr => ArtifactStatus::Requested,
            ArtifactType::Vod => ArtifactStatus::Uploading,
        }
    }

    /// Terminal states accept no further transitions except `failed -> deleted`
    pub fn is_terminal(self) -> bool {
        matches!(self, ArtifactStatus::Deleted | ArtifactStatus::Failed)
    }

    /// States in which a DVR session is considered active for idempotent start
    pub fn is_active_dvr(self) -> bool {
        matches!(
            self,
            ArtifactStatus::Requested | ArtifactStatus::Starting | ArtifactStatus::Recording
        )
    }

    /// Forward edges of the per-type lifecycle DAG
    ///
    /// `failed` is reachable from any non-terminal state and `deleted` from
    /// anywhere but itself, so those two are handled structurally rather than
    /// listed per edge.
    pub fn successors(self, artifact_type: ArtifactType) -> &'static [ArtifactStatus] {
        use ArtifactStatus::*;
        match (artifact_type, self) {
            (ArtifactType::Clip, Requested) => &[Queued],
            (ArtifactType::Clip, Queued) => &[Processing],
            (ArtifactType::Clip, Processing) => &[Ready],

            (ArtifactType::Dvr, Requested) => &[Starting],
            (ArtifactType::Dvr, Starting) => &[Recording],
            (ArtifactType::Dvr, Recording) => &[Stopping, Stopped],
            (ArtifactType::Dvr, Stopping) => &[Ready],
            (ArtifactType::Dvr, Stopped) => &[Ready],

            (ArtifactType::Vod, Uploading) => &[Processing],
            (ArtifactType::Vod, Processing) => &[Ready],

            _ => &[],
        }
    }

    /// Whether `self -> to` is a legal move for the given artifact type
    ///
    /// Rules, in order: `deleted` blocks everything; any state may move to
    /// `deleted`; any non-terminal state may move to `failed`; otherwise the
    /// edge must appear in the type's DAG. Status never moves backward.
    pub fn can_transition(self, artifact_type: ArtifactType, to: ArtifactStatus) -> bool {
        if self == ArtifactStatus::Deleted {
            return false;
        }
        if to == ArtifactStatus::Deleted {
            return true;
        }
        if to == ArtifactStatus::Failed {
            return !self.is_terminal();
        }
        self.successors(artifact_type).contains(&to)
    }

    /// All states from which `to` is reachable in one step for the type
    ///
    /// This is what the guarded `UPDATE ... WHERE status IN (...)` uses as
    /// its predecessor set.
    pub fn predecessors(artifact_type: ArtifactType, to: ArtifactStatus) -> Vec<ArtifactStatus> {
        use ArtifactStatus::*;
        const ALL: [ArtifactStatus; 11] = [
            Requested, Queued, Processing, Starting, Recording, Stopping, Stopped, Uploading,
            Ready, Failed, Deleted,
        ];
        ALL.iter()
            .copied()
            .filter(|from| from.can_transition(artifact_type, to))
            .collect()
    }
}

/// An artifact row as the registry sees it
///
/// `tenant_id` and `user_id` are denormalized fallbacks; the business
/// registry stays authoritative for ownership.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Artifact {
    /// Opaque 32-hex identifier, globally unique across types
    pub artifact_hash: String,
    pub artifact_type: ArtifactType,
    pub internal_name: String,
    /// Name of the derived output (e.g. the clip's own stream name)
    pub artifact_internal_name: String,
    pub stream_id: Option<String>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub status: ArtifactStatus,
    pub request_id: String,
    pub format: Option<String>,
    pub storage_location: StorageLocation,
    pub s3_url: Option<String>,
    pub size_bytes: Option<i64>,
    pub manifest_path: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub retention_until: Option<DateTime<Utc>>,
    pub frozen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One placement of an artifact's bytes on a node
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArtifactNodePlacement {
    pub artifact_hash: String,
    pub node_id: String,
    pub file_path: Option<String>,
    pub base_url: String,
    pub cached_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Set when the node reports the file missing or a cache probe fails
    pub is_orphaned: bool,
}

/// Returns true when `s` has the exact 32-hex artifact-hash shape
pub fn is_artifact_hash(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}
