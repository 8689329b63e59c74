//! Client configuration and inbound frame fixtures.

use secrecy::SecretString;
use signal_proto::signal::{
    signal_frame, AudioAttendeeState, AudioMetadataFrame, AudioStreamIdInfo,
    AudioStreamIdInfoFrame, DataMessageFrame, DataMessagePayload, IndexFrame, JoinAckFrame,
    LeaveAckFrame, SignalFrame, StreamAllocation, StreamDescriptor, SubscribeAckFrame,
    TurnCredentials,
};
use signaling_client::{
    MeetingSessionConfig, MeetingSessionCredentials, MeetingSessionUrls, SignalingClientConfig,
};
use uuid::Uuid;

pub const TEST_MEETING_ID: &str = "meeting-123";
pub const TEST_ATTENDEE_ID: &str = "attendee-self";
pub const TEST_EXTERNAL_USER_ID: &str = "user-self";
pub const TEST_AUDIO_HOST_URL: &str = "audio.example.com:3478";
pub const TEST_SIGNALING_URL: &str = "wss://signal.example.com/control/meeting-123";

/// Offer with one audio and one video section, both sending.
pub const OFFER_AUDIO_VIDEO: &str = "v=0\r\n\
o=- 1 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=mid:1\r\n\
a=sendrecv\r\n";

/// Client configuration for the test meeting.
#[must_use]
pub fn test_client_config() -> SignalingClientConfig {
    SignalingClientConfig::new(MeetingSessionConfig {
        meeting_id: TEST_MEETING_ID.to_string(),
        external_meeting_id: "external-meeting".to_string(),
        credentials: MeetingSessionCredentials {
            attendee_id: TEST_ATTENDEE_ID.to_string(),
            external_user_id: TEST_EXTERNAL_USER_ID.to_string(),
            join_token: SecretString::from("join-token"),
        },
        urls: MeetingSessionUrls {
            audio_host_url: TEST_AUDIO_HOST_URL.to_string(),
            signaling_url: TEST_SIGNALING_URL.to_string(),
        },
    })
}

/// Test configuration with a random meeting id.
#[must_use]
pub fn random_client_config() -> SignalingClientConfig {
    let mut config = test_client_config();
    config.meeting.meeting_id = format!("meeting-{}", Uuid::new_v4());
    config
}

/// JOIN_ACK with complete TURN credentials valid for `ttl` seconds.
#[must_use]
pub fn join_ack_frame(ttl: u32) -> SignalFrame {
    SignalFrame {
        joinack: Some(JoinAckFrame {
            turn_credentials: Some(TurnCredentials {
                username: Some("turn-user".to_string()),
                password: Some("turn-pass".to_string()),
                ttl: Some(ttl),
                uris: vec!["turn:turn.example.com:3478?transport=udp".to_string()],
            }),
        }),
        ..SignalFrame::of_type(signal_frame::Type::JoinAck)
    }
}

#[must_use]
pub fn leave_ack_frame() -> SignalFrame {
    SignalFrame {
        leave_ack: Some(LeaveAckFrame {}),
        ..SignalFrame::of_type(signal_frame::Type::LeaveAck)
    }
}

/// Video source descriptor for INDEX frames.
#[must_use]
pub fn video_source(attendee_id: &str, stream_id: u32, group_id: u32) -> StreamDescriptor {
    StreamDescriptor {
        stream_id: Some(stream_id),
        group_id: Some(group_id),
        max_bitrate_kbps: Some(1400),
        attendee_id: Some(attendee_id.to_string()),
        external_user_id: Some(format!("ext-{attendee_id}")),
        ..StreamDescriptor::default()
    }
}

#[must_use]
pub fn index_frame(sources: Vec<StreamDescriptor>) -> SignalFrame {
    SignalFrame {
        index: Some(IndexFrame {
            sources,
            ..IndexFrame::default()
        }),
        ..SignalFrame::of_type(signal_frame::Type::Index)
    }
}

/// SUBSCRIBE_ACK with `answer` and `(stream_id, group_id)` allocations.
#[must_use]
pub fn subscribe_ack_frame(answer: &str, allocations: &[(u32, u32)]) -> SignalFrame {
    SignalFrame {
        suback: Some(SubscribeAckFrame {
            sdp_answer: Some(answer.to_string()),
            allocations: allocations
                .iter()
                .map(|&(stream_id, group_id)| StreamAllocation {
                    stream_id: Some(stream_id),
                    group_id: Some(group_id),
                    ..StreamAllocation::default()
                })
                .collect(),
            ..SubscribeAckFrame::default()
        }),
        ..SignalFrame::of_type(signal_frame::Type::SubscribeAck)
    }
}

/// An AUDIO_STREAM_ID_INFO entry announcing `attendee_id` on `stream_id`.
#[must_use]
pub fn stream_joined(stream_id: u32, attendee_id: &str) -> AudioStreamIdInfo {
    AudioStreamIdInfo {
        audio_stream_id: Some(stream_id),
        attendee_id: Some(attendee_id.to_string()),
        external_user_id: Some(format!("ext-{attendee_id}")),
        ..AudioStreamIdInfo::default()
    }
}

#[must_use]
pub fn stream_identity_frame(streams: Vec<AudioStreamIdInfo>) -> SignalFrame {
    SignalFrame {
        audio_stream_id_info: Some(AudioStreamIdInfoFrame { streams }),
        ..SignalFrame::of_type(signal_frame::Type::AudioStreamIdInfo)
    }
}

#[must_use]
pub fn audio_metadata_frame(states: Vec<AudioAttendeeState>) -> SignalFrame {
    SignalFrame {
        audio_metadata: Some(AudioMetadataFrame {
            attendee_states: states,
        }),
        ..SignalFrame::of_type(signal_frame::Type::AudioMetadata)
    }
}

/// Inbound data message. `ingest_time_ns` of `None` marks it throttled.
#[must_use]
pub fn data_message_frame(
    topic: &str,
    data: &[u8],
    sender_attendee_id: &str,
    ingest_time_ns: Option<i64>,
) -> SignalFrame {
    SignalFrame {
        data_message: Some(DataMessageFrame {
            messages: vec![DataMessagePayload {
                topic: Some(topic.to_string()),
                data: Some(data.to_vec()),
                lifetime_ms: Some(0),
                sender_attendee_id: Some(sender_attendee_id.to_string()),
                ingest_time_ns,
                sender_external_user_id: Some(format!("ext-{sender_attendee_id}")),
            }],
        }),
        ..SignalFrame::of_type(signal_frame::Type::DataMessage)
    }
}
