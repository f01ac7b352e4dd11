//! SeaORM entities for the artifact registry
//!
//! Status, type, and storage-location columns are stored as their lowercase
//! string forms; the repository layer converts to and from the domain enums.

pub mod artifact_nodes;
pub mod artifacts;
pub mod prelude;
pub mod vod_uploads;
