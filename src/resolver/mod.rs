//! Content resolver
//!
//! Maps opaque public content IDs to internal names, tenant, and content
//! type. Public IDs come from three disjoint namespaces: view keys (live
//! playback handles), stream keys (ingester credentials), and artifact
//! hashes. The ID alone determines the type; a caller-supplied content type
//! is never consulted, so a clip hash can never be coerced onto a live-only
//! path.

use std::sync::Arc;

use crate::clients::BusinessRegistryClient;
use crate::database::repositories::ArtifactRepository;
use crate::errors::{AppError, AppResult};
use crate::models::artifact::is_artifact_hash;
use crate::models::{Artifact, ArtifactStatus, StreamTarget};

/// What a public content ID resolved to
#[derive(Debug, Clone)]
pub enum ResolvedContent {
    /// Live stream, reached through a view key or stream key
    Live(StreamTarget),
    /// Registered artifact (clip, DVR recording, or VOD)
    Artifact(Artifact),
}

impl ResolvedContent {
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            ResolvedContent::Live(target) => Some(target.tenant_id.as_str()),
            ResolvedContent::Artifact(artifact) => artifact.tenant_id.as_deref(),
        }
    }

    pub fn internal_name(&self) -> &str {
        match self {
            ResolvedContent::Live(target) => &target.internal_name,
            ResolvedContent::Artifact(artifact) => &artifact.internal_name,
        }
    }
}

#[derive(Clone)]
pub struct ContentResolver {
    artifacts: ArtifactRepository,
    registry: Option<Arc<dyn BusinessRegistryClient>>,
}

impl ContentResolver {
    pub fn new(
        artifacts: ArtifactRepository,
        registry: Option<Arc<dyn BusinessRegistryClient>>,
    ) -> Self {
        Self { artifacts, registry }
    }

    /// Resolve a public content ID
    ///
    /// Resolution order: the 32-hex artifact-hash shape checks the artifact
    /// registry first; everything else goes to the business registry as a
    /// view key, then as a stream key. Deleted artifacts resolve as not
    /// found.
    pub async fn resolve(&self, content_id: &str) -> AppResult<ResolvedContent> {
        if content_id.trim().is_empty() {
            return Err(AppError::invalid_input("content id must not be empty"));
        }

        if is_artifact_hash(content_id) {
            if let Some(artifact) = self.artifacts.find_by_hash(content_id).await? {
                if artifact.status == ArtifactStatus::Deleted {
                    return Err(AppError::not_found("artifact", content_id));
                }
                return Ok(ResolvedContent::Artifact(artifact));
            }
            // hash-shaped but unknown: fall through to the registry in case
            // a view key happens to share the shape
        }

        if let Some(registry) = &self.registry {
            if let Some(stream) = registry.resolve_stream(content_id).await? {
                return Ok(ResolvedContent::Live(StreamTarget {
                    internal_name: stream.internal_name,
                    tenant_id: stream.tenant_id,
                    stream_id: stream.stream_id,
                    view_key: content_id.to_string(),
                }));
            }
            if let Some(stream) = registry.validate_stream_key(content_id).await? {
                return Ok(ResolvedContent::Live(StreamTarget {
                    internal_name: stream.internal_name,
                    tenant_id: stream.tenant_id,
                    stream_id: stream.stream_id,
                    view_key: content_id.to_string(),
                }));
            }
        }

        Err(AppError::not_found("content", content_id))
    }
}
