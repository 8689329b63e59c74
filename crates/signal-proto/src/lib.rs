//! Protocol Buffer definitions for the signaling control channel.
//!
//! Every control message exchanged with the signaling endpoint is a
//! [`signal::SignalFrame`] whose `type` field selects which optional
//! sub-message is populated. The schema is proto2: optional scalars are
//! `Option<T>` so that "absent" and "zero" stay distinguishable, which the
//! join, subscribe and presence handling depend on.
//!
//! The messages are declared directly with `prost` derives rather than
//! generated from a `.proto` file at build time.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

// Re-export prost traits for convenience
pub use prost::Message;

pub mod signal;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::signal::{
        signal_frame, AudioStreamIdInfo, AudioStreamIdInfoFrame, JoinAckFrame, SignalFrame,
        TurnCredentials,
    };
    use super::Message;

    #[test]
    fn test_optional_fields_survive_encoding() {
        let frame = SignalFrame {
            timestamp_ms: 1_700_000_000_000,
            r#type: signal_frame::Type::AudioStreamIdInfo as i32,
            audio_stream_id_info: Some(AudioStreamIdInfoFrame {
                streams: vec![AudioStreamIdInfo {
                    audio_stream_id: Some(7),
                    muted: Some(false),
                    ..AudioStreamIdInfo::default()
                }],
            }),
            ..SignalFrame::default()
        };

        let decoded = SignalFrame::decode(frame.encode_to_vec().as_slice()).unwrap();
        let stream = &decoded.audio_stream_id_info.unwrap().streams[0];

        // An explicit `false` must not collapse into "absent"
        assert_eq!(stream.muted, Some(false));
        assert_eq!(stream.attendee_id, None);
        assert_eq!(stream.dropped, None);
    }

    #[test]
    fn test_frame_type_lookup() {
        let frame = SignalFrame {
            r#type: signal_frame::Type::JoinAck as i32,
            joinack: Some(JoinAckFrame {
                turn_credentials: Some(TurnCredentials::default()),
            }),
            ..SignalFrame::default()
        };
        assert_eq!(frame.frame_type(), Some(signal_frame::Type::JoinAck));

        let unknown = SignalFrame {
            r#type: 999,
            ..SignalFrame::default()
        };
        assert_eq!(unknown.frame_type(), None);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(signal_frame::Type::SubscribeAck.as_str_name(), "SUBSCRIBE_ACK");
        assert_eq!(signal_frame::Type::DataMessage.as_str_name(), "DATA_MESSAGE");
    }
}
