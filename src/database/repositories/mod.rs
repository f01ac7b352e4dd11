//! Repository layer over the artifact registry
//!
//! Repositories own all SQL access. Status changes go through guarded
//! updates so transitions stay monotonic under concurrent node reports.

pub mod artifact;
pub mod artifact_node;
pub mod vod_upload;

pub use artifact::{ArtifactPage, ArtifactRepository, ListCursor};
pub use artifact_node::ArtifactNodeRepository;
pub use vod_upload::{VodUpload, VodUploadRepository};
