//! Common error types for the signaling client components.

use thiserror::Error;

/// Classification of errors surfaced by a signaling transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingErrorKind {
    /// Unclassified failure. Treated as fatal.
    UnknownFatal,
    /// The transport cannot continue; the session must tear down.
    ClientFatal,
    /// The call is at capacity. Informational only.
    CallAtCapacity,
}

/// Error reported by a signaling transport to its observer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {description}")]
pub struct SignalingError {
    /// Error classification
    pub kind: SignalingErrorKind,
    /// Human readable description
    pub description: String,
}

impl SignalingError {
    /// Create a `ClientFatal` error.
    #[must_use]
    pub fn client_fatal(description: impl Into<String>) -> Self {
        Self {
            kind: SignalingErrorKind::ClientFatal,
            description: description.into(),
        }
    }

    /// Create a `CallAtCapacity` error.
    #[must_use]
    pub fn call_at_capacity(description: impl Into<String>) -> Self {
        Self {
            kind: SignalingErrorKind::CallAtCapacity,
            description: description.into(),
        }
    }

    /// Whether the session must tear down on this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind, SignalingErrorKind::CallAtCapacity)
    }
}

/// Errors raised by the shared utilities in this crate.
#[derive(Error, Debug)]
pub enum CommonError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A global tracing subscriber was already installed
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type alias using `CommonError`
pub type Result<T> = std::result::Result<T, CommonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_not_fatal() {
        assert!(!SignalingError::call_at_capacity("full").is_fatal());
        assert!(SignalingError::client_fatal("boom").is_fatal());
        let unknown = SignalingError {
            kind: SignalingErrorKind::UnknownFatal,
            description: String::new(),
        };
        assert!(unknown.is_fatal());
    }

    #[test]
    fn test_display_includes_description() {
        let err = SignalingError::client_fatal("connection attempts exhausted");
        assert_eq!(err.to_string(), "ClientFatal: connection attempts exhausted");
    }
}
