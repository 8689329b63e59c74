//! Attendee presence and audio metadata tracking.
//!
//! Turns AUDIO_STREAM_ID_INFO and AUDIO_METADATA frames into attendee
//! events. Audio stream ids increase monotonically and are never reused
//! within a meeting, which is what lets a stream ending be told apart from
//! an attendee moving to a newer stream.

use crate::types::{SignalStrengthUpdate, VolumeUpdate};
use common::types::Attendee;
use signal_proto::signal::{AudioMetadataFrame, AudioStreamIdInfo, AudioStreamIdInfoFrame};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Loudest reported level, in dBFS.
pub const MAX_VOLUME_DECIBELS: i32 = -14;

/// Quietest reported level, in dBFS.
pub const MIN_VOLUME_DECIBELS: i32 = -42;

/// Raw signal strength mapped to 1.0.
pub const MAX_SIGNAL_STRENGTH: f32 = 2.0;

/// Normalized values closer than this are considered unchanged.
const CHANGE_EPSILON: f32 = 1e-6;

/// Attendee events derived from presence frames.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    AttendeeJoined(Attendee),
    AttendeeLeft(Attendee),
    AttendeeDropped(Attendee),
    AttendeeMuted(Attendee),
    AttendeeUnmuted(Attendee),
    VolumeUpdates(Vec<VolumeUpdate>),
    SignalStrengthChanges(Vec<SignalStrengthUpdate>),
}

#[derive(Debug, Default)]
struct PresenceRecord {
    current_stream_id: Option<u32>,
    muted: Option<bool>,
    volume: Option<f32>,
    signal_strength: Option<f32>,
}

/// Map a raw volume (attenuation in dB) into `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn normalize_volume(volume: u32) -> f32 {
    let db = -i64::from(volume);
    let span = (MIN_VOLUME_DECIBELS - MAX_VOLUME_DECIBELS) as f32;
    let normalized = 1.0 - (db - i64::from(MAX_VOLUME_DECIBELS)) as f32 / span;
    normalized.clamp(0.0, 1.0)
}

/// Map a raw signal strength into `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn normalize_signal_strength(signal_strength: u32) -> f32 {
    (signal_strength as f32 / MAX_SIGNAL_STRENGTH).clamp(0.0, 1.0)
}

fn changed(previous: Option<f32>, current: f32) -> bool {
    previous.map_or(true, |previous| (previous - current).abs() >= CHANGE_EPSILON)
}

/// Per-session presence state.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    records: HashMap<String, PresenceRecord>,
    stream_to_attendee: BTreeMap<u32, String>,
    // Metadata frames carry no external user id
    stream_to_external_user: HashMap<u32, String>,
}

impl PresenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all attendees.
    pub fn reset(&mut self) {
        self.records.clear();
        self.stream_to_attendee.clear();
        self.stream_to_external_user.clear();
    }

    /// Number of attendees currently present.
    #[must_use]
    pub fn attendee_count(&self) -> usize {
        self.records.len()
    }

    /// Process an AUDIO_STREAM_ID_INFO frame, entry by entry in frame order.
    pub fn on_stream_identity(&mut self, frame: &AudioStreamIdInfoFrame) -> Vec<PresenceEvent> {
        let mut events = Vec::new();

        for stream in &frame.streams {
            let Some(stream_id) = stream.audio_stream_id else {
                debug!(target: "signaling.presence", "Stream identity entry without stream id, skipping");
                continue;
            };

            if let Some(attendee_id) = &stream.attendee_id {
                self.bind_stream(stream_id, attendee_id, stream, &mut events);
            }

            if let Some(muted) = stream.muted {
                self.update_mute(stream_id, muted, &mut events);
            }

            if stream.attendee_id.is_none() && stream.muted.is_none() {
                self.end_stream(stream_id, stream.dropped.unwrap_or(false), &mut events);
            }
        }

        events
    }

    fn bind_stream(
        &mut self,
        stream_id: u32,
        attendee_id: &str,
        stream: &AudioStreamIdInfo,
        events: &mut Vec<PresenceEvent>,
    ) {
        let external_user_id = stream.external_user_id.clone().unwrap_or_default();
        let record = self.records.entry(attendee_id.to_string()).or_default();

        if record.current_stream_id.is_none() {
            events.push(PresenceEvent::AttendeeJoined(Attendee::new(
                attendee_id,
                external_user_id.clone(),
            )));
        }

        record.current_stream_id = Some(stream_id);
        self.stream_to_attendee
            .insert(stream_id, attendee_id.to_string());
        self.stream_to_external_user
            .insert(stream_id, external_user_id);
    }

    fn update_mute(&mut self, stream_id: u32, muted: bool, events: &mut Vec<PresenceEvent>) {
        let Some(attendee) = self.attendee_for_stream(stream_id) else {
            debug!(
                target: "signaling.presence",
                stream_id,
                "Mute update for unknown stream, skipping"
            );
            return;
        };

        let record = self
            .records
            .entry(attendee.attendee_id.clone())
            .or_default();

        // Unmuted is the assumed initial state
        let previous = record.muted.unwrap_or(false);
        if previous != muted {
            events.push(if muted {
                PresenceEvent::AttendeeMuted(attendee)
            } else {
                PresenceEvent::AttendeeUnmuted(attendee)
            });
        }

        record.muted = Some(muted);
    }

    fn end_stream(&mut self, stream_id: u32, dropped: bool, events: &mut Vec<PresenceEvent>) {
        let Some(attendee_id) = self.stream_to_attendee.remove(&stream_id) else {
            return;
        };
        let external_user_id = self
            .stream_to_external_user
            .remove(&stream_id)
            .unwrap_or_default();

        if let Some(record) = self.records.get_mut(&attendee_id) {
            if record.current_stream_id == Some(stream_id) {
                record.current_stream_id = None;
            }
        }

        let has_newer_stream = self
            .stream_to_attendee
            .range(stream_id.saturating_add(1)..)
            .any(|(_, other)| *other == attendee_id);
        if has_newer_stream {
            debug!(
                target: "signaling.presence",
                attendee_id = %attendee_id,
                stream_id,
                "Attendee moved to a newer stream"
            );
            return;
        }

        // Older streams of the same attendee must not report a second leave
        let stale: Vec<u32> = self
            .stream_to_attendee
            .iter()
            .filter(|(_, other)| **other == attendee_id)
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.stream_to_attendee.remove(&id);
            self.stream_to_external_user.remove(&id);
        }
        self.records.remove(&attendee_id);
        let attendee = Attendee::new(attendee_id, external_user_id);
        events.push(if dropped {
            PresenceEvent::AttendeeDropped(attendee)
        } else {
            PresenceEvent::AttendeeLeft(attendee)
        });
    }

    /// Process an AUDIO_METADATA frame.
    ///
    /// Returns at most one `VolumeUpdates` followed by at most one
    /// `SignalStrengthChanges`, each listing only changed attendees.
    pub fn on_metadata(&mut self, frame: &AudioMetadataFrame) -> Vec<PresenceEvent> {
        let mut volume_updates = Vec::new();
        let mut signal_strength_updates = Vec::new();

        for state in &frame.attendee_states {
            let Some(stream_id) = state.audio_stream_id else {
                trace!(target: "signaling.presence", "Metadata entry without stream id, skipping");
                continue;
            };
            let Some(attendee) = self.attendee_for_stream(stream_id) else {
                trace!(
                    target: "signaling.presence",
                    stream_id,
                    "Metadata for unknown stream, skipping"
                );
                continue;
            };

            let record = self
                .records
                .entry(attendee.attendee_id.clone())
                .or_default();

            if let Some(raw) = state.volume {
                let volume = normalize_volume(raw);
                if changed(record.volume, volume) {
                    volume_updates.push(VolumeUpdate {
                        attendee: attendee.clone(),
                        volume,
                    });
                }
                record.volume = Some(volume);
            }

            if let Some(raw) = state.signal_strength {
                let signal_strength = normalize_signal_strength(raw);
                if changed(record.signal_strength, signal_strength) {
                    signal_strength_updates.push(SignalStrengthUpdate {
                        attendee,
                        signal_strength,
                    });
                }
                record.signal_strength = Some(signal_strength);
            }
        }

        let mut events = Vec::new();
        if !volume_updates.is_empty() {
            events.push(PresenceEvent::VolumeUpdates(volume_updates));
        }
        if !signal_strength_updates.is_empty() {
            events.push(PresenceEvent::SignalStrengthChanges(signal_strength_updates));
        }
        events
    }

    fn attendee_for_stream(&self, stream_id: u32) -> Option<Attendee> {
        let attendee_id = self.stream_to_attendee.get(&stream_id)?;
        let external_user_id = self
            .stream_to_external_user
            .get(&stream_id)
            .cloned()
            .unwrap_or_default();
        Some(Attendee::new(attendee_id.clone(), external_user_id))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use signal_proto::signal::AudioAttendeeState;

    fn identity(stream_id: u32, attendee_id: &str, external_user_id: &str) -> AudioStreamIdInfo {
        AudioStreamIdInfo {
            audio_stream_id: Some(stream_id),
            attendee_id: Some(attendee_id.to_string()),
            external_user_id: Some(external_user_id.to_string()),
            ..AudioStreamIdInfo::default()
        }
    }

    fn mute(stream_id: u32, muted: bool) -> AudioStreamIdInfo {
        AudioStreamIdInfo {
            audio_stream_id: Some(stream_id),
            muted: Some(muted),
            ..AudioStreamIdInfo::default()
        }
    }

    fn ended(stream_id: u32, dropped: Option<bool>) -> AudioStreamIdInfo {
        AudioStreamIdInfo {
            audio_stream_id: Some(stream_id),
            dropped,
            ..AudioStreamIdInfo::default()
        }
    }

    fn frame(streams: Vec<AudioStreamIdInfo>) -> AudioStreamIdInfoFrame {
        AudioStreamIdInfoFrame { streams }
    }

    fn volume(stream_id: u32, volume: u32) -> AudioAttendeeState {
        AudioAttendeeState {
            audio_stream_id: Some(stream_id),
            volume: Some(volume),
            ..AudioAttendeeState::default()
        }
    }

    fn signal(stream_id: u32, signal_strength: u32) -> AudioAttendeeState {
        AudioAttendeeState {
            audio_stream_id: Some(stream_id),
            signal_strength: Some(signal_strength),
            ..AudioAttendeeState::default()
        }
    }

    fn alice() -> Attendee {
        Attendee::new("alice-id", "alice")
    }

    #[test]
    fn test_normalize_volume() {
        assert_eq!(normalize_volume(14), 1.0);
        assert_eq!(normalize_volume(42), 0.0);
        assert!((normalize_volume(28) - 0.5).abs() < CHANGE_EPSILON);
        // Clipped at both ends
        assert_eq!(normalize_volume(0), 1.0);
        assert_eq!(normalize_volume(90), 0.0);
    }

    #[test]
    fn test_normalize_signal_strength() {
        assert_eq!(normalize_signal_strength(0), 0.0);
        assert_eq!(normalize_signal_strength(1), 0.5);
        assert_eq!(normalize_signal_strength(2), 1.0);
        assert_eq!(normalize_signal_strength(5), 1.0);
    }

    #[test]
    fn test_join_reported_once() {
        let mut tracker = PresenceTracker::new();

        let events = tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));
        assert_eq!(events, vec![PresenceEvent::AttendeeJoined(alice())]);

        let events = tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));
        assert!(events.is_empty());
        assert_eq!(tracker.attendee_count(), 1);
    }

    #[test]
    fn test_missing_external_user_id_defaults_to_empty() {
        let mut tracker = PresenceTracker::new();
        let entry = AudioStreamIdInfo {
            audio_stream_id: Some(1),
            attendee_id: Some("bob-id".to_string()),
            ..AudioStreamIdInfo::default()
        };

        let events = tracker.on_stream_identity(&frame(vec![entry]));
        assert_eq!(
            events,
            vec![PresenceEvent::AttendeeJoined(Attendee::new("bob-id", ""))]
        );
    }

    #[test]
    fn test_mute_transitions() {
        let mut tracker = PresenceTracker::new();
        tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));

        let events = tracker.on_stream_identity(&frame(vec![mute(1, true)]));
        assert_eq!(events, vec![PresenceEvent::AttendeeMuted(alice())]);

        let events = tracker.on_stream_identity(&frame(vec![mute(1, true)]));
        assert!(events.is_empty());

        let events = tracker.on_stream_identity(&frame(vec![mute(1, false)]));
        assert_eq!(events, vec![PresenceEvent::AttendeeUnmuted(alice())]);
    }

    #[test]
    fn test_first_unmuted_state_is_silent() {
        let mut tracker = PresenceTracker::new();
        tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));

        assert!(tracker
            .on_stream_identity(&frame(vec![mute(1, false)]))
            .is_empty());
    }

    #[test]
    fn test_identity_and_mute_in_one_entry() {
        let mut tracker = PresenceTracker::new();
        let mut entry = identity(3, "alice-id", "alice");
        entry.muted = Some(true);

        let events = tracker.on_stream_identity(&frame(vec![entry]));
        assert_eq!(
            events,
            vec![
                PresenceEvent::AttendeeJoined(alice()),
                PresenceEvent::AttendeeMuted(alice()),
            ]
        );
    }

    #[test]
    fn test_mute_for_unknown_stream_is_skipped() {
        let mut tracker = PresenceTracker::new();
        assert!(tracker
            .on_stream_identity(&frame(vec![mute(9, true)]))
            .is_empty());
    }

    #[test]
    fn test_leave_and_drop() {
        let mut tracker = PresenceTracker::new();
        tracker.on_stream_identity(&frame(vec![
            identity(1, "alice-id", "alice"),
            identity(2, "bob-id", "bob"),
        ]));

        let events = tracker.on_stream_identity(&frame(vec![ended(1, None)]));
        assert_eq!(events, vec![PresenceEvent::AttendeeLeft(alice())]);

        let events = tracker.on_stream_identity(&frame(vec![ended(2, Some(true))]));
        assert_eq!(
            events,
            vec![PresenceEvent::AttendeeDropped(Attendee::new("bob-id", "bob"))]
        );
        assert_eq!(tracker.attendee_count(), 0);

        // Unknown stream end is ignored
        assert!(tracker
            .on_stream_identity(&frame(vec![ended(7, None)]))
            .is_empty());
    }

    #[test]
    fn test_older_stream_ending_after_reconnect_is_not_a_leave() {
        let mut tracker = PresenceTracker::new();
        tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));
        // Alice reconnects on a newer stream before the old one is retired
        assert!(tracker
            .on_stream_identity(&frame(vec![identity(4, "alice-id", "alice")]))
            .is_empty());

        assert!(tracker
            .on_stream_identity(&frame(vec![ended(1, None)]))
            .is_empty());

        // Still bound to stream 4, so no second join either
        assert!(tracker
            .on_stream_identity(&frame(vec![identity(4, "alice-id", "alice")]))
            .is_empty());

        let events = tracker.on_stream_identity(&frame(vec![ended(4, None)]));
        assert_eq!(events, vec![PresenceEvent::AttendeeLeft(alice())]);
    }

    #[test]
    fn test_newer_stream_ending_first_reports_one_leave() {
        let mut tracker = PresenceTracker::new();
        tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));
        tracker.on_stream_identity(&frame(vec![identity(4, "alice-id", "alice")]));

        let events = tracker.on_stream_identity(&frame(vec![ended(4, None)]));
        assert_eq!(events, vec![PresenceEvent::AttendeeLeft(alice())]);
        assert_eq!(tracker.attendee_count(), 0);

        // Stream 1 was released with the leave above
        assert!(tracker
            .on_stream_identity(&frame(vec![ended(1, Some(true))]))
            .is_empty());
        assert!(tracker
            .on_stream_identity(&frame(vec![mute(1, true)]))
            .is_empty());
    }

    #[test]
    fn test_rejoin_after_leave() {
        let mut tracker = PresenceTracker::new();
        tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));
        tracker.on_stream_identity(&frame(vec![ended(1, None)]));

        let events = tracker.on_stream_identity(&frame(vec![identity(5, "alice-id", "alice")]));
        assert_eq!(events, vec![PresenceEvent::AttendeeJoined(alice())]);
    }

    #[test]
    fn test_volume_dedup() {
        let mut tracker = PresenceTracker::new();
        tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));

        let metadata = AudioMetadataFrame {
            attendee_states: vec![volume(1, 28)],
        };

        let events = tracker.on_metadata(&metadata);
        assert_eq!(events.len(), 1);
        let PresenceEvent::VolumeUpdates(updates) = &events[0] else {
            panic!("expected volume updates, got {events:?}");
        };
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].attendee, alice());
        assert!((updates[0].volume - 0.5).abs() < CHANGE_EPSILON);

        assert!(tracker.on_metadata(&metadata).is_empty());
    }

    #[test]
    fn test_metadata_batches_volume_before_signal() {
        let mut tracker = PresenceTracker::new();
        tracker.on_stream_identity(&frame(vec![
            identity(1, "alice-id", "alice"),
            identity(2, "bob-id", "bob"),
        ]));

        let events = tracker.on_metadata(&AudioMetadataFrame {
            attendee_states: vec![volume(1, 14), signal(1, 1), volume(2, 42), signal(2, 2)],
        });

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], PresenceEvent::VolumeUpdates(v) if v.len() == 2));
        assert!(matches!(&events[1], PresenceEvent::SignalStrengthChanges(s) if s.len() == 2));

        // Only bob's signal changes
        let events = tracker.on_metadata(&AudioMetadataFrame {
            attendee_states: vec![volume(1, 14), signal(2, 1)],
        });
        assert_eq!(
            events,
            vec![PresenceEvent::SignalStrengthChanges(vec![SignalStrengthUpdate {
                attendee: Attendee::new("bob-id", "bob"),
                signal_strength: 0.5,
            }])]
        );
    }

    #[test]
    fn test_metadata_for_unknown_stream_is_skipped() {
        let mut tracker = PresenceTracker::new();
        let events = tracker.on_metadata(&AudioMetadataFrame {
            attendee_states: vec![volume(3, 20), AudioAttendeeState::default()],
        });
        assert!(events.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut tracker = PresenceTracker::new();
        tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));
        tracker.reset();

        assert_eq!(tracker.attendee_count(), 0);
        let events = tracker.on_stream_identity(&frame(vec![identity(1, "alice-id", "alice")]));
        assert_eq!(events, vec![PresenceEvent::AttendeeJoined(alice())]);
    }
}
