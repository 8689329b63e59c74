//! One-line summaries of frames for debug logging.

use signal_proto::signal::{IndexFrame, StreamServiceType, SubscribeAckFrame, SubscribeFrame};
use std::fmt::Write;

fn duplex_name(duplex: Option<i32>) -> &'static str {
    match duplex.and_then(|d| StreamServiceType::try_from(d).ok()) {
        Some(StreamServiceType::Rx) => "RX",
        Some(StreamServiceType::Tx) => "TX",
        Some(StreamServiceType::Duplex) => "DUPLEX",
        None => "UNSET",
    }
}

pub(crate) fn subscribe_summary(sub: &SubscribeFrame) -> String {
    let mut out = format!("duplex={} send_streams=[", duplex_name(sub.duplex));
    for stream in &sub.send_streams {
        let _ = write!(
            out,
            " {{stream_id={} group_id={} max_bitrate_kbps={}}}",
            stream.stream_id.unwrap_or_default(),
            stream.group_id.unwrap_or_default(),
            stream.max_bitrate_kbps.unwrap_or_default()
        );
    }
    let _ = write!(
        out,
        " ] receive_stream_ids={:?} audio_host={} audio_muted={}",
        sub.receive_stream_ids,
        sub.audio_host.as_deref().unwrap_or("-"),
        sub.audio_muted.unwrap_or(false)
    );
    out
}

pub(crate) fn subscribe_ack_summary(ack: &SubscribeAckFrame) -> String {
    let mut out = format!("duplex={} allocations=[", duplex_name(ack.duplex));
    for allocation in &ack.allocations {
        let _ = write!(
            out,
            " {{group_id={} stream_id={} track_label={}}}",
            allocation.group_id.unwrap_or_default(),
            allocation.stream_id.unwrap_or_default(),
            allocation.track_label.as_deref().unwrap_or("-")
        );
    }
    out.push_str(" ] tracks=[");
    for track in &ack.tracks {
        let _ = write!(
            out,
            " {{stream_id={} ssrc={} track_label={}}}",
            track.stream_id.unwrap_or_default(),
            track.ssrc.unwrap_or_default(),
            track.track_label.as_deref().unwrap_or("-")
        );
    }
    out.push_str(" ]");
    out
}

pub(crate) fn index_summary(index: &IndexFrame) -> String {
    let mut out = format!(
        "at_capacity={} num_participants={} sources=[",
        index.at_capacity.unwrap_or(false),
        index.num_participants.unwrap_or_default()
    );
    for source in &index.sources {
        let _ = write!(
            out,
            " {{attendee_id={} stream_id={} group_id={} max_bitrate_kbps={}}}",
            source.attendee_id.as_deref().unwrap_or("-"),
            source.stream_id.unwrap_or_default(),
            source.group_id.unwrap_or_default(),
            source.max_bitrate_kbps.unwrap_or_default()
        );
    }
    out.push_str(" ]");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_proto::signal::{StreamAllocation, StreamDescriptor};

    #[test]
    fn test_subscribe_summary() {
        let sub = SubscribeFrame {
            duplex: Some(StreamServiceType::Duplex as i32),
            send_streams: vec![StreamDescriptor {
                stream_id: Some(1),
                group_id: Some(2),
                max_bitrate_kbps: Some(600),
                ..StreamDescriptor::default()
            }],
            receive_stream_ids: vec![0, 7],
            ..SubscribeFrame::default()
        };

        assert_eq!(
            subscribe_summary(&sub),
            "duplex=DUPLEX send_streams=[ {stream_id=1 group_id=2 max_bitrate_kbps=600} ] \
             receive_stream_ids=[0, 7] audio_host=- audio_muted=false"
        );
    }

    #[test]
    fn test_subscribe_ack_summary() {
        let ack = SubscribeAckFrame {
            allocations: vec![StreamAllocation {
                track_label: Some("audio".to_string()),
                stream_id: Some(3),
                group_id: Some(4),
            }],
            ..SubscribeAckFrame::default()
        };

        assert_eq!(
            subscribe_ack_summary(&ack),
            "duplex=UNSET allocations=[ {group_id=4 stream_id=3 track_label=audio} ] tracks=[ ]"
        );
    }

    #[test]
    fn test_index_summary() {
        let index = IndexFrame {
            num_participants: Some(2),
            sources: vec![StreamDescriptor {
                attendee_id: Some("remote-1".to_string()),
                stream_id: Some(9),
                ..StreamDescriptor::default()
            }],
            ..IndexFrame::default()
        };

        assert_eq!(
            index_summary(&index),
            "at_capacity=false num_participants=2 sources=[ \
             {attendee_id=remote-1 stream_id=9 group_id=0 max_bitrate_kbps=0} ]"
        );
    }
}
