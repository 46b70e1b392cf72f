//! Error types for cirrus.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error chains.

use crate::validate::Violation;
use thiserror::Error;

/// Result type alias for cirrus operations.
pub type Result<T> = std::result::Result<T, CirrusError>;

/// Main error type for cirrus.
#[derive(Error, Debug)]
pub enum CirrusError {
    // Range algebra errors
    #[error("Invalid CIDR range: {range}")]
    InvalidRange { range: String },

    // Target errors
    #[error("Unknown operation target: {target}. Specify `all`, `etcd`, `control-plane`, or a node pool name defined in the cluster configuration")]
    UnknownTarget { target: String },

    // Pre-flight validation violations
    #[error(transparent)]
    Validation(#[from] Violation),

    // Provider errors
    #[error("Provider rejected the request: {reason}")]
    ProviderRejected { reason: String },

    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    // Orchestration errors
    #[error("Stack operation failed on {stack_name}: {details}")]
    StackOperationFailed { stack_name: String, details: String },

    // Configuration errors
    #[error("Invalid cluster configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("File read error: {path}: {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Feature availability errors
    #[error("Feature not implemented: {feature}")]
    NotImplemented { feature: String },

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CirrusError {
    /// Create an Internal error from any error type.
    pub fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(err.to_string())
    }
}
