//! Domain models shared across the orchestrator
//!
//! These are the in-process representations of the system's semantic
//! containers: artifacts and their node placements, fleet nodes, tenant
//! billing state, and the analytics event envelopes. Persistence mapping
//! lives in the repository layer; everything here is storage-agnostic.

pub mod artifact;
pub mod billing;
pub mod events;
pub mod node;
pub mod stream_meta;

pub use artifact::{
    Artifact, ArtifactNodePlacement, ArtifactStatus, ArtifactType, StorageLocation,
};
pub use billing::{Admission, BillingModel, PaymentRequirements, TenantBillingState};
pub use events::{
    ArtifactEvent, ClipLifecycleData, ClipLifecycleStage, DvrLifecycleData, DvrLifecycleStatus,
    LoadBalancingData, MistTrigger, TriggerPayload, VodLifecycleData, VodLifecycleStatus,
};
pub use node::{GeoPosition, Node, NodeCapability, NodeHeartbeat, StreamTarget};
pub use stream_meta::{StreamMeta, TrackMeta};
