//! Data types exchanged with the caller and observers.

use chrono::{DateTime, Duration, Utc};
use common::secret::SecretString;
use common::types::Attendee;
use signal_proto::signal;

/// Local microphone mute state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MuteState {
    #[default]
    Unmuted,
    Muted,
}

impl MuteState {
    #[must_use]
    pub fn is_muted(self) -> bool {
        self == MuteState::Muted
    }
}

impl From<bool> for MuteState {
    fn from(muted: bool) -> Self {
        if muted {
            MuteState::Muted
        } else {
            MuteState::Unmuted
        }
    }
}

/// Settings for a local video slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalVideoConfig {
    pub max_bitrate_kbps: u32,
}

/// Settings for a local audio slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalAudioConfig {
    pub mute_state: MuteState,
}

/// Association between an attendee or local slot and its protocol stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamBinding {
    pub attendee: Attendee,
    pub stream_id: u32,
    pub group_id: u32,
    pub max_bitrate_kbps: u32,
}

impl StreamBinding {
    /// Binding for a remote source announced in an INDEX frame.
    #[must_use]
    pub fn from_descriptor(descriptor: &signal::StreamDescriptor) -> Self {
        Self {
            attendee: Attendee::new(
                descriptor.attendee_id.clone().unwrap_or_default(),
                descriptor.external_user_id.clone().unwrap_or_default(),
            ),
            stream_id: descriptor.stream_id.unwrap_or_default(),
            group_id: descriptor.group_id.unwrap_or_default(),
            max_bitrate_kbps: descriptor.max_bitrate_kbps.unwrap_or_default(),
        }
    }
}

/// A remote video source as seen by observers and by the caller when
/// choosing subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteVideoSourceInfo {
    pub attendee: Attendee,
    pub stream_id: u32,
    pub group_id: u32,
    pub max_bitrate_kbps: u32,
}

impl From<&StreamBinding> for RemoteVideoSourceInfo {
    fn from(binding: &StreamBinding) -> Self {
        Self {
            attendee: binding.attendee.clone(),
            stream_id: binding.stream_id,
            group_id: binding.group_id,
            max_bitrate_kbps: binding.max_bitrate_kbps,
        }
    }
}

/// Relay credentials issued in JOIN_ACK.
#[derive(Debug, Clone)]
pub struct TurnCredentials {
    pub username: String,
    /// Protected by `SecretString` to prevent accidental logging.
    pub password: SecretString,
    pub ttl_seconds: u32,
    pub uris: Vec<String>,
    pub expire_at: DateTime<Utc>,
}

impl TurnCredentials {
    /// Build credentials from a JOIN_ACK payload received at `now`.
    ///
    /// Returns `None` unless username, password, ttl and at least one URI
    /// are present.
    #[must_use]
    pub fn from_proto(proto: &signal::TurnCredentials, now: DateTime<Utc>) -> Option<Self> {
        let username = proto.username.clone()?;
        let password = proto.password.clone()?;
        let ttl_seconds = proto.ttl?;
        if proto.uris.is_empty() {
            return None;
        }

        Some(Self {
            username,
            password: SecretString::from(password),
            ttl_seconds,
            uris: proto.uris.clone(),
            expire_at: now + Duration::seconds(i64::from(ttl_seconds)),
        })
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expire_at
    }
}

/// Payload of the session started notification.
#[derive(Debug, Clone)]
pub struct StartInfo {
    pub turn_credentials: TurnCredentials,
    /// Remote video sources present in the first INDEX frame.
    pub sources: Vec<RemoteVideoSourceInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingClientStatusType {
    /// Clean shutdown.
    Ok,
    /// The far end or the network ended the connection.
    NetworkError,
    /// A fatal client-side condition ended the session.
    ClientError,
    Unknown,
}

/// Reason a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingClientStatus {
    pub kind: SignalingClientStatusType,
    pub reason: String,
}

impl SignalingClientStatus {
    #[must_use]
    pub fn new(kind: SignalingClientStatusType, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// Data message to broadcast to the meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMessageToSend {
    pub topic: String,
    pub data: Vec<u8>,
    /// How long the server retains the message for late joiners.
    pub lifetime_ms: i32,
}

/// Data message received from another attendee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMessageReceived {
    pub topic: String,
    pub data: Vec<u8>,
    pub attendee: Attendee,
    /// Server ingest time, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMessageSendErrorReason {
    Throttled,
    InvalidTopic,
    InvalidDataMessageSize,
    InvalidLifetimeMs,
}

/// Data message that was not delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMessageSendError {
    pub topic: String,
    pub data: Vec<u8>,
    pub reason: DataMessageSendErrorReason,
}

/// Normalized volume of one attendee, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeUpdate {
    pub attendee: Attendee,
    pub volume: f32,
}

/// Normalized signal strength of one attendee, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalStrengthUpdate {
    pub attendee: Attendee,
    pub signal_strength: f32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn proto_credentials() -> signal::TurnCredentials {
        signal::TurnCredentials {
            username: Some("user".to_string()),
            password: Some("relay-password".to_string()),
            ttl: Some(300),
            uris: vec!["turn:turn.example.com:3478".to_string()],
        }
    }

    #[test]
    fn test_turn_credentials_from_proto() {
        let now = Utc::now();
        let creds = TurnCredentials::from_proto(&proto_credentials(), now).unwrap();

        assert_eq!(creds.username, "user");
        assert_eq!(creds.password.expose_secret(), "relay-password");
        assert_eq!(creds.expire_at, now + Duration::seconds(300));
        assert!(!creds.is_expired(now));
        assert!(creds.is_expired(now + Duration::seconds(300)));
    }

    #[test]
    fn test_turn_credentials_incomplete() {
        let now = Utc::now();

        let mut proto = proto_credentials();
        proto.uris.clear();
        assert!(TurnCredentials::from_proto(&proto, now).is_none());

        let mut proto = proto_credentials();
        proto.password = None;
        assert!(TurnCredentials::from_proto(&proto, now).is_none());

        let mut proto = proto_credentials();
        proto.ttl = None;
        assert!(TurnCredentials::from_proto(&proto, now).is_none());
    }

    #[test]
    fn test_turn_credentials_debug_redacts_password() {
        let creds = TurnCredentials::from_proto(&proto_credentials(), Utc::now()).unwrap();
        assert!(!format!("{creds:?}").contains("relay-password"));
    }

    #[test]
    fn test_binding_from_descriptor() {
        let descriptor = signal::StreamDescriptor {
            stream_id: Some(5),
            group_id: Some(2),
            max_bitrate_kbps: Some(1400),
            attendee_id: Some("remote-1".to_string()),
            ..signal::StreamDescriptor::default()
        };

        let binding = StreamBinding::from_descriptor(&descriptor);
        assert_eq!(binding.attendee, Attendee::new("remote-1", ""));
        assert_eq!(binding.stream_id, 5);
        assert_eq!(binding.group_id, 2);
        assert_eq!(binding.max_bitrate_kbps, 1400);

        let info = RemoteVideoSourceInfo::from(&binding);
        assert_eq!(info.stream_id, 5);
        assert_eq!(info.attendee.attendee_id, "remote-1");
    }

    #[test]
    fn test_mute_state_from_bool() {
        assert!(MuteState::from(true).is_muted());
        assert!(!MuteState::from(false).is_muted());
        assert_eq!(MuteState::default(), MuteState::Unmuted);
    }
}
