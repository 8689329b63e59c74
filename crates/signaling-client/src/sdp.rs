//! Media description (SDP) section extraction.
//!
//! Only the pieces the signaling protocol needs are read: the kind of each
//! `m=` section, its `a=mid:` identifier, and its direction attribute. Lines
//! are matched by literal prefix and anything else is skipped, so malformed
//! input yields fewer sections rather than an error.

use std::fmt;

const AUDIO_PREFIX: &str = "m=audio";
const VIDEO_PREFIX: &str = "m=video";
const MID_PREFIX: &str = "a=mid:";

/// Direction attributes, checked in this order.
const DIRECTIONS: [(&str, MediaDirection); 4] = [
    ("a=recvonly", MediaDirection::RecvOnly),
    ("a=sendonly", MediaDirection::SendOnly),
    ("a=inactive", MediaDirection::Inactive),
    ("a=sendrecv", MediaDirection::SendRecv),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaDirection {
    Inactive,
    SendOnly,
    RecvOnly,
    SendRecv,
}

impl MediaDirection {
    /// Whether the local side sends media in this direction.
    #[must_use]
    pub fn is_sending(self) -> bool {
        matches!(self, MediaDirection::SendOnly | MediaDirection::SendRecv)
    }
}

/// One negotiated `m=` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSection {
    pub kind: MediaKind,
    /// Value of the section's `a=mid:` attribute.
    pub mid: String,
    pub direction: MediaDirection,
}

impl fmt::Display for MediaSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} mid={} {:?}", self.kind, self.mid, self.direction)
    }
}

/// Extract media sections from CRLF-separated SDP text, in document order.
///
/// A section is emitted at each direction attribute, using the most recent
/// `m=` kind (video until an `m=audio` line is seen) and the most recent mid.
#[must_use]
pub fn parse_media_sections(sdp: &str) -> Vec<MediaSection> {
    let mut sections = Vec::new();
    let mut kind = MediaKind::Video;
    let mut mid = "";

    for line in sdp.split("\r\n") {
        if line.starts_with(AUDIO_PREFIX) {
            kind = MediaKind::Audio;
        } else if line.starts_with(VIDEO_PREFIX) {
            kind = MediaKind::Video;
        } else if let Some(value) = line.strip_prefix(MID_PREFIX) {
            mid = value;
        } else if let Some(direction) = parse_direction(line) {
            sections.push(MediaSection {
                kind,
                mid: mid.to_string(),
                direction,
            });
        }
    }

    sections
}

fn parse_direction(line: &str) -> Option<MediaDirection> {
    DIRECTIONS
        .iter()
        .find(|(prefix, _)| line.starts_with(prefix))
        .map(|(_, direction)| *direction)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    const OFFER: &str = "v=0\r\n\
        o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
        s=-\r\n\
        t=0 0\r\n\
        m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
        c=IN IP4 0.0.0.0\r\n\
        a=mid:0\r\n\
        a=sendrecv\r\n\
        a=rtpmap:111 opus/48000/2\r\n\
        m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
        a=mid:1\r\n\
        a=inactive\r\n\
        m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
        a=mid:2\r\n\
        a=recvonly\r\n";

    #[test]
    fn test_parse_three_sections_in_order() {
        let sections = parse_media_sections(OFFER);

        assert_eq!(
            sections,
            vec![
                MediaSection {
                    kind: MediaKind::Audio,
                    mid: "0".to_string(),
                    direction: MediaDirection::SendRecv,
                },
                MediaSection {
                    kind: MediaKind::Video,
                    mid: "1".to_string(),
                    direction: MediaDirection::Inactive,
                },
                MediaSection {
                    kind: MediaKind::Video,
                    mid: "2".to_string(),
                    direction: MediaDirection::RecvOnly,
                },
            ]
        );
    }

    #[test]
    fn test_sendonly_section() {
        let sections = parse_media_sections("m=video 9 RTP/AVP 96\r\na=mid:video-0\r\na=sendonly");

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].mid, "video-0");
        assert_eq!(sections[0].direction, MediaDirection::SendOnly);
        assert!(sections[0].direction.is_sending());
    }

    #[test]
    fn test_empty_and_malformed_input() {
        assert!(parse_media_sections("").is_empty());
        assert!(parse_media_sections("garbage\r\nm=audio\r\na=mid:0").is_empty());
        // LF-only line endings are not split, so nothing matches past the first line
        assert!(parse_media_sections("m=audio 9\na=mid:0\na=sendrecv").is_empty());
    }

    #[test]
    fn test_direction_without_media_line_defaults_to_video() {
        let sections = parse_media_sections("a=mid:x\r\na=recvonly");

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, MediaKind::Video);
        assert_eq!(sections[0].mid, "x");
    }

    #[test]
    fn test_display() {
        let section = MediaSection {
            kind: MediaKind::Audio,
            mid: "0".to_string(),
            direction: MediaDirection::SendRecv,
        };
        assert_eq!(section.to_string(), "Audio mid=0 SendRecv");
    }
}
