//! Outbound collaborator clients
//!
//! Every external service the orchestrator talks to sits behind a trait so
//! services can be exercised against in-process fakes. The HTTP
//! implementations share one reqwest client per collaborator with the
//! configured timeout.

pub mod billing;
pub mod business_registry;
pub mod node_agent;
pub mod purser;

pub use billing::{BillingClient, HttpBillingClient};
pub use business_registry::{BusinessRegistryClient, HttpBusinessRegistryClient, RegistryArtifact, RegistryStream};
pub use node_agent::{
    ClipDeleteRequest, ClipPullRequest, DvrConfig, DvrDeleteRequest, DvrStartRequest,
    DvrStopRequest, HttpNodeAgentClient, NodeAgentClient, StopSessionsRequest, VodDeleteRequest,
};
pub use purser::{HttpPurserClient, PurserClient};
