//! Websocket connection configuration.

use crate::keepalive::{DEFAULT_IDLE_TIMEOUT, DEFAULT_PING_INTERVAL};
use crate::retry::RetryPolicy;
use secrecy::SecretString;
use std::time::Duration;

/// Websocket subprotocol requested from the signaling endpoint.
pub const DEFAULT_PROTOCOL_NAME: &str = "Signaling-SDK";

/// Cookie carrying the join token.
pub const SESSION_COOKIE_NAME: &str = "_aws_wt_session";

/// Header announcing the control protocol version.
pub const CONTROL_PROTOCOL_VERSION_HEADER: &str = "x-chime-control-protocol-version";

/// Control protocol version spoken by this client.
pub const CONTROL_PROTOCOL_VERSION: &str = "3";

/// Settings for one signaling websocket connection.
#[derive(Debug, Clone)]
pub struct WebsocketConfig {
    /// Endpoint URL (`wss://...`).
    pub url: String,
    /// Requested websocket subprotocol.
    pub protocol_name: String,
    /// Join token, sent as the session cookie.
    pub session_token: SecretString,
    /// Additional request headers.
    pub headers: Vec<(String, String)>,
    /// Silence before a keepalive ping.
    pub ping_interval: Duration,
    /// Silence before the connection is dropped.
    pub idle_timeout: Duration,
    /// Reconnect policy for the initial connection.
    pub retry: RetryPolicy,
}

impl WebsocketConfig {
    /// Create a config with default protocol, keepalive and retry settings.
    #[must_use]
    pub fn new(url: impl Into<String>, session_token: SecretString) -> Self {
        Self {
            url: url.into(),
            protocol_name: DEFAULT_PROTOCOL_NAME.to_string(),
            session_token,
            headers: Vec::new(),
            ping_interval: DEFAULT_PING_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WebsocketConfig::new("wss://signal.example.com/control", SecretString::from("tok"));

        assert_eq!(config.protocol_name, "Signaling-SDK");
        assert_eq!(config.ping_interval, Duration::from_secs(10));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = WebsocketConfig::new("wss://signal.example.com", SecretString::from("join-secret"));
        let debug = format!("{config:?}");

        assert!(!debug.contains("join-secret"));
        assert!(debug.contains("signal.example.com"));
    }
}
