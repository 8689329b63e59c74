//! Wire envelope for signaling frames.
//!
//! ```text
//! +--------+---------------------------------+
//! | tag(1) | protobuf-encoded SignalFrame    |
//! +--------+---------------------------------+
//! ```
//!
//! There is no length prefix: one websocket message carries exactly one
//! envelope.

use bytes::{BufMut, Bytes, BytesMut};
use signal_proto::signal::SignalFrame;
use signal_proto::Message;

/// Tag byte identifying this version of the signaling envelope.
pub const ENVELOPE_TAG: u8 = 2;

/// Smallest message that can hold a tag and a non-empty payload.
pub const MIN_ENVELOPE_LEN: usize = 2;

/// Error type for codec operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Insufficient data to decode
    #[error("Insufficient data")]
    InsufficientData,

    /// Leading tag byte is not [`ENVELOPE_TAG`]
    #[error("Unsupported envelope tag: {0}")]
    UnsupportedTag(u8),

    /// Payload is not a valid `SignalFrame`
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Frame could not be serialized
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Encode a signal frame into a wire envelope
///
/// # Errors
///
/// Returns `CodecError::Encode` if protobuf serialization fails
pub fn encode_envelope(frame: &SignalFrame) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::with_capacity(1 + frame.encoded_len());

    buf.put_u8(ENVELOPE_TAG);
    frame
        .encode(&mut buf)
        .map_err(|e| CodecError::Encode(e.to_string()))?;

    Ok(buf.freeze())
}

/// Decode a wire envelope into a signal frame
///
/// # Errors
///
/// Returns an error if the message is too short, carries an unknown tag, or
/// the payload does not decode
pub fn decode_envelope(data: &[u8]) -> Result<SignalFrame, CodecError> {
    if data.len() < MIN_ENVELOPE_LEN {
        return Err(CodecError::InsufficientData);
    }

    let Some((&tag, payload)) = data.split_first() else {
        return Err(CodecError::InsufficientData);
    };

    if tag != ENVELOPE_TAG {
        return Err(CodecError::UnsupportedTag(tag));
    }

    SignalFrame::decode(payload).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use signal_proto::signal::{signal_frame, LeaveFrame};

    fn leave_frame() -> SignalFrame {
        SignalFrame {
            timestamp_ms: 1_700_000_000_123,
            r#type: signal_frame::Type::Leave as i32,
            leave: Some(LeaveFrame {}),
            ..SignalFrame::default()
        }
    }

    #[test]
    fn test_envelope_starts_with_tag() {
        let encoded = encode_envelope(&leave_frame()).unwrap();

        assert_eq!(encoded[0], ENVELOPE_TAG);
        assert_eq!(&encoded[1..], leave_frame().encode_to_vec().as_slice());
    }

    #[test]
    fn test_decode_envelope() {
        let encoded = encode_envelope(&leave_frame()).unwrap();
        let decoded = decode_envelope(&encoded).unwrap();

        assert_eq!(decoded.frame_type(), Some(signal_frame::Type::Leave));
        assert_eq!(decoded.timestamp_ms, 1_700_000_000_123);
        assert!(decoded.leave.is_some());
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(decode_envelope(&[]), Err(CodecError::InsufficientData));
        assert_eq!(
            decode_envelope(&[ENVELOPE_TAG]),
            Err(CodecError::InsufficientData)
        );
    }

    #[test]
    fn test_decode_unknown_tag() {
        let mut encoded = encode_envelope(&leave_frame()).unwrap().to_vec();
        encoded[0] = 7;

        assert_eq!(decode_envelope(&encoded), Err(CodecError::UnsupportedTag(7)));
    }

    #[test]
    fn test_decode_garbage_payload() {
        let result = decode_envelope(&[ENVELOPE_TAG, 0xFF]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
