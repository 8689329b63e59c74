//! Observer that records every callback for later assertions.

use common::types::Attendee;
use signaling_client::types::{
    DataMessageReceived, DataMessageSendError, RemoteVideoSourceInfo, SignalStrengthUpdate,
    SignalingClientStatus, StartInfo, VolumeUpdate,
};
use signaling_client::SignalingObserver;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// One recorded observer callback.
#[derive(Debug, Clone)]
pub enum ObservedEvent {
    Started(StartInfo),
    Stopped(SignalingClientStatus),
    RemoteDescription(String),
    SourcesAvailable(Vec<RemoteVideoSourceInfo>),
    SourcesUnavailable(Vec<RemoteVideoSourceInfo>),
    AttendeeJoined(Attendee),
    AttendeeLeft(Attendee),
    AttendeeDropped(Attendee),
    AttendeeMuted(Attendee),
    AttendeeUnmuted(Attendee),
    VolumeUpdates(Vec<VolumeUpdate>),
    SignalStrengthChanges(Vec<SignalStrengthUpdate>),
    DataMessagesReceived(Vec<DataMessageReceived>),
    DataMessagesFailed(Vec<DataMessageSendError>),
}

/// Records callbacks in the order they were made.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
    notify: Notify,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Start notifications received.
    #[must_use]
    pub fn started(&self) -> Vec<StartInfo> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Started(info) => Some(info),
                _ => None,
            })
            .collect()
    }

    /// Stop notifications received.
    #[must_use]
    pub fn stopped(&self) -> Vec<SignalingClientStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Stopped(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    /// Wait until some recorded event matches `predicate`.
    pub async fn wait_for(&self, predicate: impl Fn(&ObservedEvent) -> bool) -> ObservedEvent {
        loop {
            let notified = self.notify.notified();
            if let Some(event) = self.events().into_iter().find(|event| predicate(event)) {
                return event;
            }
            notified.await;
        }
    }

    fn record(&self, event: ObservedEvent) {
        self.events.lock().unwrap().push(event);
        self.notify.notify_waiters();
    }
}

impl SignalingObserver for RecordingObserver {
    fn on_signaling_client_started(&self, start_info: &StartInfo) {
        self.record(ObservedEvent::Started(start_info.clone()));
    }

    fn on_signaling_client_stopped(&self, status: &SignalingClientStatus) {
        self.record(ObservedEvent::Stopped(status.clone()));
    }

    fn on_remote_description_received(&self, sdp_answer: &str) {
        self.record(ObservedEvent::RemoteDescription(sdp_answer.to_string()));
    }

    fn on_remote_video_sources_available(&self, sources: &[RemoteVideoSourceInfo]) {
        self.record(ObservedEvent::SourcesAvailable(sources.to_vec()));
    }

    fn on_remote_video_sources_unavailable(&self, sources: &[RemoteVideoSourceInfo]) {
        self.record(ObservedEvent::SourcesUnavailable(sources.to_vec()));
    }

    fn on_attendee_joined(&self, attendee: &Attendee) {
        self.record(ObservedEvent::AttendeeJoined(attendee.clone()));
    }

    fn on_attendee_left(&self, attendee: &Attendee) {
        self.record(ObservedEvent::AttendeeLeft(attendee.clone()));
    }

    fn on_attendee_dropped(&self, attendee: &Attendee) {
        self.record(ObservedEvent::AttendeeDropped(attendee.clone()));
    }

    fn on_attendee_audio_muted(&self, attendee: &Attendee) {
        self.record(ObservedEvent::AttendeeMuted(attendee.clone()));
    }

    fn on_attendee_audio_unmuted(&self, attendee: &Attendee) {
        self.record(ObservedEvent::AttendeeUnmuted(attendee.clone()));
    }

    fn on_volume_updates(&self, updates: &[VolumeUpdate]) {
        self.record(ObservedEvent::VolumeUpdates(updates.to_vec()));
    }

    fn on_signal_strength_changes(&self, updates: &[SignalStrengthUpdate]) {
        self.record(ObservedEvent::SignalStrengthChanges(updates.to_vec()));
    }

    fn on_data_messages_received(&self, messages: &[DataMessageReceived]) {
        self.record(ObservedEvent::DataMessagesReceived(messages.to_vec()));
    }

    fn on_data_messages_failed_to_send(&self, errors: &[DataMessageSendError]) {
        self.record(ObservedEvent::DataMessagesFailed(errors.to_vec()));
    }
}
