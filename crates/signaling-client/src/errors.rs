//! Signaling client error types.
//!
//! Protocol failures are never returned from the public API: they reach the
//! caller as observer notifications. These errors only cover talking to the
//! session actor and loading configuration.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors returned by [`SignalingClientHandle`](crate::SignalingClientHandle).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The session actor has exited.
    #[error("Session actor is gone")]
    ActorGone,

    /// The session actor dropped the reply.
    #[error("Session actor dropped the response")]
    ResponseDropped,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: ClientError = ConfigError::MissingEnvVar("JOIN_TOKEN".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variable: JOIN_TOKEN"
        );
    }
}
