//! Signaling client configuration.
//!
//! Configuration can be built directly or loaded from environment
//! variables. The join token is redacted in Debug output.

use common::secret::{ExposeSecret, SecretString};
use signaling_transport::WebsocketConfig;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default for announcing stream update support in JOIN.
pub const DEFAULT_ENABLE_ATTENDEE_UPDATE: bool = true;

/// Default initial mute state.
pub const DEFAULT_MUTE_ON_JOIN: bool = false;

/// Suffix identifying the content-share attendee of a meeting participant.
pub const CONTENT_SHARE_SUFFIX: &str = "#content";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Attendee credentials issued when joining a meeting.
#[derive(Clone)]
pub struct MeetingSessionCredentials {
    pub attendee_id: String,
    pub external_user_id: String,
    /// Protected by `SecretString` to prevent accidental logging.
    pub join_token: SecretString,
}

/// Custom Debug implementation that redacts the join token.
impl fmt::Debug for MeetingSessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeetingSessionCredentials")
            .field("attendee_id", &self.attendee_id)
            .field("external_user_id", &self.external_user_id)
            .field("join_token", &"[REDACTED]")
            .finish()
    }
}

/// Service endpoints for a meeting.
#[derive(Debug, Clone)]
pub struct MeetingSessionUrls {
    /// Audio routing hint forwarded in SUBSCRIBE. May be empty.
    pub audio_host_url: String,
    /// Websocket endpoint of the signaling service.
    pub signaling_url: String,
}

/// Everything needed to join one meeting as one attendee.
#[derive(Debug, Clone)]
pub struct MeetingSessionConfig {
    pub meeting_id: String,
    pub external_meeting_id: String,
    pub credentials: MeetingSessionCredentials,
    pub urls: MeetingSessionUrls,
}

impl MeetingSessionConfig {
    /// Derive the configuration of this attendee's content-share session.
    #[must_use]
    pub fn content_share_config(&self) -> Self {
        Self {
            meeting_id: self.meeting_id.clone(),
            external_meeting_id: self.external_meeting_id.clone(),
            credentials: MeetingSessionCredentials {
                attendee_id: format!("{}{CONTENT_SHARE_SUFFIX}", self.credentials.attendee_id),
                external_user_id: self.credentials.external_user_id.clone(),
                join_token: SecretString::from(format!(
                    "{}{CONTENT_SHARE_SUFFIX}",
                    self.credentials.join_token.expose_secret()
                )),
            },
            urls: self.urls.clone(),
        }
    }
}

/// Signaling client configuration.
#[derive(Debug, Clone)]
pub struct SignalingClientConfig {
    pub meeting: MeetingSessionConfig,

    /// Ask the server for stream updates in JOIN (default: true).
    pub enable_attendee_update: bool,

    /// Start the session muted (default: false).
    pub mute_on_join: bool,
}

impl SignalingClientConfig {
    /// Create a configuration with default session options.
    #[must_use]
    pub fn new(meeting: MeetingSessionConfig) -> Self {
        Self {
            meeting,
            enable_attendee_update: DEFAULT_ENABLE_ATTENDEE_UPDATE,
            mute_on_join: DEFAULT_MUTE_ON_JOIN,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            vars.get(name)
                .cloned()
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };
        let optional = |name: &str| vars.get(name).cloned().unwrap_or_default();

        let meeting = MeetingSessionConfig {
            meeting_id: required("MEETING_ID")?,
            external_meeting_id: optional("EXTERNAL_MEETING_ID"),
            credentials: MeetingSessionCredentials {
                attendee_id: required("ATTENDEE_ID")?,
                external_user_id: optional("EXTERNAL_USER_ID"),
                join_token: SecretString::from(required("JOIN_TOKEN")?),
            },
            urls: MeetingSessionUrls {
                audio_host_url: optional("AUDIO_HOST_URL"),
                signaling_url: required("SIGNALING_URL")?,
            },
        };

        let enable_attendee_update = parse_flag(
            vars,
            "SIGNALING_ENABLE_ATTENDEE_UPDATE",
            DEFAULT_ENABLE_ATTENDEE_UPDATE,
        )?;
        let mute_on_join = parse_flag(vars, "SIGNALING_MUTE_ON_JOIN", DEFAULT_MUTE_ON_JOIN)?;

        Ok(Self {
            meeting,
            enable_attendee_update,
            mute_on_join,
        })
    }

    /// Websocket settings for the signaling connection.
    #[must_use]
    pub fn websocket_config(&self) -> WebsocketConfig {
        WebsocketConfig::new(
            self.meeting.urls.signaling_url.clone(),
            self.meeting.credentials.join_token.clone(),
        )
    }
}

fn parse_flag(
    vars: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(name).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(value) => match value.as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue(format!("{name}={value}"))),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("MEETING_ID".to_string(), "meeting-1".to_string()),
            ("ATTENDEE_ID".to_string(), "attendee-1".to_string()),
            ("JOIN_TOKEN".to_string(), "join-token-secret".to_string()),
            (
                "SIGNALING_URL".to_string(),
                "wss://signal.example.com/control/meeting-1".to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config =
            SignalingClientConfig::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.meeting.meeting_id, "meeting-1");
        assert_eq!(config.meeting.external_meeting_id, "");
        assert_eq!(config.meeting.credentials.attendee_id, "attendee-1");
        assert_eq!(config.meeting.credentials.external_user_id, "");
        assert_eq!(
            config.meeting.credentials.join_token.expose_secret(),
            "join-token-secret"
        );
        assert_eq!(config.meeting.urls.audio_host_url, "");
        assert!(config.enable_attendee_update);
        assert!(!config.mute_on_join);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("EXTERNAL_MEETING_ID".to_string(), "standup".to_string());
        vars.insert("EXTERNAL_USER_ID".to_string(), "alex".to_string());
        vars.insert("AUDIO_HOST_URL".to_string(), "audio.example.com:3478".to_string());
        vars.insert("SIGNALING_ENABLE_ATTENDEE_UPDATE".to_string(), "false".to_string());
        vars.insert("SIGNALING_MUTE_ON_JOIN".to_string(), "1".to_string());

        let config = SignalingClientConfig::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.meeting.external_meeting_id, "standup");
        assert_eq!(config.meeting.credentials.external_user_id, "alex");
        assert_eq!(config.meeting.urls.audio_host_url, "audio.example.com:3478");
        assert!(!config.enable_attendee_update);
        assert!(config.mute_on_join);
    }

    #[test]
    fn test_from_vars_missing_join_token() {
        let mut vars = base_vars();
        vars.remove("JOIN_TOKEN");

        let result = SignalingClientConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "JOIN_TOKEN"));
    }

    #[test]
    fn test_from_vars_missing_signaling_url() {
        let mut vars = base_vars();
        vars.remove("SIGNALING_URL");

        let result = SignalingClientConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "SIGNALING_URL"));
    }

    #[test]
    fn test_from_vars_invalid_flag() {
        let mut vars = base_vars();
        vars.insert("SIGNALING_MUTE_ON_JOIN".to_string(), "sometimes".to_string());

        let result = SignalingClientConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_content_share_config() {
        let config = SignalingClientConfig::from_vars(&base_vars()).unwrap();
        let content = config.meeting.content_share_config();

        assert_eq!(content.meeting_id, "meeting-1");
        assert_eq!(content.credentials.attendee_id, "attendee-1#content");
        assert_eq!(
            content.credentials.join_token.expose_secret(),
            "join-token-secret#content"
        );
        assert_eq!(content.urls.signaling_url, config.meeting.urls.signaling_url);
    }

    #[test]
    fn test_websocket_config() {
        let config = SignalingClientConfig::from_vars(&base_vars()).unwrap();
        let websocket = config.websocket_config();

        assert_eq!(websocket.url, "wss://signal.example.com/control/meeting-1");
        assert_eq!(websocket.session_token.expose_secret(), "join-token-secret");
    }

    #[test]
    fn test_debug_redacts_sensitive_fields() {
        let config = SignalingClientConfig::from_vars(&base_vars()).unwrap();

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("join-token-secret"));
        assert!(debug_output.contains("attendee-1"));
    }
}
