//! Error type definitions for the routing and artifact orchestrator
//!
//! The hierarchy mirrors the application layers: `AppError` is the top-level
//! type every service returns, with dedicated enums for the repository layer
//! and the node RPC layer underneath it.

use thiserror::Error;

use crate::models::billing::PaymentRequirements;

/// Top-level application error type
///
/// This enum represents all possible errors that can occur in the application.
/// It uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors (SeaORM)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Missing or malformed request fields
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Transient, retryable failures: no eligible node, downstream timeout
    #[error("Unavailable: {message}")]
    Unavailable {
        message: String,
        retry_after: Option<u64>,
    },

    /// Idempotent no-op, e.g. deleting an already-deleted artifact
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Viewer admission blocked until payment; carries machine-readable
    /// requirements so clients can present a paywall
    #[error("Payment required: {message}")]
    PaymentRequired {
        message: String,
        requirements: Option<PaymentRequirements>,
    },

    /// Artifact bytes are being promoted from cold storage to an edge node
    #[error("Defrosting: {message}")]
    Defrosting { message: String, retry_after: u64 },

    /// External service errors
    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },

    /// Guarded status transition rejected: the row was not in any of the
    /// allowed predecessor states
    #[error("Transition rejected for {artifact_hash}: {from_states:?} -> {to}")]
    TransitionRejected {
        artifact_hash: String,
        from_states: Vec<String>,
        to: String,
    },

    /// Constraint violations (unique, foreign key, etc.)
    #[error("Constraint violation: {constraint} - {message}")]
    ConstraintViolation { constraint: String, message: String },

    /// Data serialization/deserialization failures
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Invalid cursor supplied to a paginated listing
    #[error("Invalid cursor: {cursor}")]
    InvalidCursor { cursor: String },
}

/// Node RPC specific errors
///
/// Failures are classified so callers can surface the right typed code:
/// `Transient` becomes `Unavailable`, `Fatal` becomes `Internal`.
#[derive(Error, Debug)]
pub enum RpcError {
    /// Connection refused, timeout, 5xx from the node agent
    #[error("Transient RPC failure to {node_id}: {message}")]
    Transient { node_id: String, message: String },

    /// Node rejected the command outright (4xx, malformed response)
    #[error("Fatal RPC failure to {node_id}: {message}")]
    Fatal { node_id: String, message: String },

    /// Node is not known to the directory
    #[error("Unknown node: {node_id}")]
    UnknownNode { node_id: String },
}

impl RpcError {
    /// Whether a bounded in-operation retry is worthwhile
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Transient { .. })
    }
}

impl From<RpcError> for AppError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Transient { node_id, message } => AppError::Unavailable {
                message: format!("node {node_id}: {message}"),
                retry_after: None,
            },
            RpcError::Fatal { node_id, message } => AppError::Internal {
                message: format!("node {node_id}: {message}"),
            },
            RpcError::UnknownNode { node_id } => AppError::Unavailable {
                message: format!("node {node_id} is not registered"),
                retry_after: None,
            },
        }
    }
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create an invalid-input error with a custom message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a not-found error for a resource
    pub fn not_found<S: Into<String>, I: Into<String>>(resource: S, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create an unavailable error without a retry hint
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create a conflict error (idempotent no-op)
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a payment-required error without structured requirements
    pub fn payment_required<S: Into<String>>(message: S) -> Self {
        Self::PaymentRequired {
            message: message.into(),
            requirements: None,
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an external service error
    pub fn external_service<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }
}
