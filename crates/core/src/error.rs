//! Error types for the groupwire domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Every failure a caller can
//! observe from a member operation is one of the [`Error`] variants; transport
//! failures have their own [`TransportError`] so they can carry diagnostics.

use thiserror::Error;

/// The top-level error type for all member operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A relative-rank precondition failed. Raised before any transport call.
    #[error("Permission denied for `{operation}`: {reason}")]
    PermissionDenied { operation: String, reason: String },

    /// A caller-supplied argument violates a stated constraint.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A pre-send listener vetoed the message.
    #[error("Message sending was cancelled: {0}")]
    SendCancelled(String),

    /// The member variant does not support this capability.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// A failed transport call. Both variants carry the human-readable
/// description of the attempted action.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote side answered with a non-ok status.
    #[error("{context} failed (status: {status}, retcode: {retcode}): {message}")]
    Rejected {
        context: String,
        status: String,
        retcode: i64,
        message: String,
    },

    /// The request never produced a response (connection, timeout, decoding).
    #[error("{context} failed: {reason}")]
    Request { context: String, reason: String },
}

impl TransportError {
    /// The description of the action that failed.
    pub fn context(&self) -> &str {
        match self {
            Self::Rejected { context, .. } | Self::Request { context, .. } => context,
        }
    }
}

impl Error {
    pub fn permission_denied(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}
