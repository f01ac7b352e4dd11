//! Centralized error handling for the routing and artifact orchestrator
//!
//! This module provides a unified error system across all application layers:
//! the persistence layer, the outbound collaborator clients (node agents,
//! business registry, billing, object store), and the web surface.
//!
//! # Error Categories
//!
//! - **Repository Errors**: artifact registry access and guarded-transition failures
//! - **RPC Errors**: node agent dispatch failures, classified transient vs fatal
//! - **Registry Errors**: business registry lookups
//! - **Storage Errors**: object store multipart and presign operations
//!
//! Every error eventually maps to one of the typed codes the control surface
//! exposes: invalid input, not found, unavailable (retryable), conflict,
//! payment required, defrosting, internal.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for node RPC Results
pub type RpcResult<T> = Result<T, RpcError>;
