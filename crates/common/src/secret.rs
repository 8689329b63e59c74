//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. The signaling
//! client holds two kinds of secret: the meeting join token (sent as a
//! session cookie when the signaling connection is opened) and the TURN
//! relay password handed out in the join acknowledgment.
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` while holding one is safe to log through `tracing`.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Credentials {
//!     attendee_id: String,
//!     join_token: SecretString,
//! }
//!
//! let creds = Credentials {
//!     attendee_id: "attendee-1".to_string(),
//!     join_token: SecretString::from("token-value"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("token-value"));
//! assert_eq!(creds.join_token.expose_secret(), "token-value");
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::{ExposeSecret, SecretString};

    #[test]
    fn test_join_token_not_in_debug_output() {
        let token = SecretString::from("join-token-123");
        let rendered = format!("{token:?}");

        assert!(!rendered.contains("join-token-123"));
        assert!(rendered.contains("REDACTED"));
        assert_eq!(token.expose_secret(), "join-token-123");
    }

    #[test]
    fn test_turn_password_from_config_file() {
        #[derive(Debug, serde::Deserialize)]
        struct Relay {
            username: String,
            password: SecretString,
        }

        let relay: Relay =
            serde_json::from_str(r#"{"username": "turn-user", "password": "relay-pass"}"#)
                .expect("relay credentials should parse");

        assert_eq!(relay.username, "turn-user");
        assert_eq!(relay.password.expose_secret(), "relay-pass");
        assert!(!format!("{relay:?}").contains("relay-pass"));
    }
}
