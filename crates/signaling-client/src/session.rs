//! Signaling session state machine.
//!
//! [`SignalingSession`] owns the protocol state of one meeting join: the
//! local audio/video slots, the remote sources announced by INDEX frames,
//! the caller's chosen subscriptions and the presence tracker. It is driven
//! from a single task (see [`SessionActor`](crate::SessionActor)): caller
//! operations and [`TransportEvent`]s are applied one at a time, so no
//! internal locking is needed.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> Connecting --JOIN_ACK--> Connected --stop--> Disconnecting
//!                     |                        |                     |
//!                     +-------- error/close ---+------ LEAVE_ACK ----+--> Disconnected
//! ```
//!
//! A transport is created per [`start`](SignalingSession::start) together
//! with a fresh event channel, so events of a previous run can never reach
//! the current one.

use crate::config::SignalingClientConfig;
use crate::frame_debug;
use crate::observer::ObserverRegistry;
use crate::presence::PresenceTracker;
use crate::sdp::{parse_media_sections, MediaDirection, MediaKind};
use crate::types::{
    DataMessageReceived, DataMessageSendError, DataMessageSendErrorReason, DataMessageToSend,
    LocalAudioConfig, LocalVideoConfig, RemoteVideoSourceInfo, SignalingClientStatus,
    SignalingClientStatusType, StartInfo, StreamBinding, TurnCredentials,
};
use chrono::Utc;
use common::error::SignalingError;
use common::types::Attendee;
use regex::Regex;
use signal_proto::signal::{
    signal_frame, AudioControlFrame, ClientDetails, DataMessageFrame, DataMessagePayload,
    IndexFrame, JoinFlags, JoinFrame, LeaveFrame, SignalFrame, StreamDescriptor,
    StreamServiceType, SubscribeAckFrame, SubscribeFrame,
};
use signaling_transport::{
    CloseEvent, CloseInitiator, SignalingTransport, SignalingTransportFactory, TransportEvent,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Signaling protocol version sent in JOIN.
pub const PROTOCOL_VERSION: u32 = 2;

/// Upper bound on remote videos requested in JOIN.
pub const MAX_NUM_OF_VIDEOS: u32 = 25;

/// Value of `ClientDetails::client_source`.
pub const CLIENT_SOURCE: &str = "signaling-client-rs";

/// Largest data message payload accepted for sending, in bytes.
pub const MAX_DATA_MESSAGE_SIZE: usize = 2048;

const STOPPED_REASON_TURN_EXPIRED: &str = "TURN credentials expired";

static TOPIC_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new("^[a-zA-Z0-9_-]{1,36}$").ok());

/// Connection state of a [`SignalingSession`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    /// Transport starting, or open with JOIN sent and no JOIN_ACK yet.
    Connecting,
    /// JOIN_ACK received.
    Connected,
    /// LEAVE sent, waiting for LEAVE_ACK.
    Disconnecting,
    Disconnected,
}

/// Check an outgoing data message. Only the first failing rule is reported:
/// size, then topic, then lifetime.
#[must_use]
pub fn validate_data_message(message: &DataMessageToSend) -> Option<DataMessageSendErrorReason> {
    if message.data.len() > MAX_DATA_MESSAGE_SIZE {
        return Some(DataMessageSendErrorReason::InvalidDataMessageSize);
    }
    let topic_ok = TOPIC_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(&message.topic));
    if !topic_ok {
        return Some(DataMessageSendErrorReason::InvalidTopic);
    }
    if message.lifetime_ms < 0 {
        return Some(DataMessageSendErrorReason::InvalidLifetimeMs);
    }
    None
}

fn send_descriptor(binding: &StreamBinding) -> StreamDescriptor {
    StreamDescriptor {
        stream_id: Some(binding.stream_id),
        group_id: Some(binding.group_id),
        max_bitrate_kbps: Some(binding.max_bitrate_kbps),
        ..StreamDescriptor::default()
    }
}

/// Protocol state of one signaling session.
pub struct SignalingSession {
    config: SignalingClientConfig,
    factory: Arc<dyn SignalingTransportFactory>,
    observers: Arc<ObserverRegistry>,
    transport: Option<Box<dyn SignalingTransport>>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    state: SessionState,
    is_joined: bool,
    has_received_first_index: bool,
    stopped_notified: bool,
    is_muted: bool,
    turn_credentials: Option<TurnCredentials>,
    local_description: String,
    /// Local slots keyed by media section id.
    local_audio: BTreeMap<String, StreamBinding>,
    local_video: BTreeMap<String, StreamBinding>,
    /// Subscribed remote videos keyed by media section id.
    remote_video_sources: BTreeMap<String, StreamBinding>,
    /// Remote video sources from the latest INDEX keyed by attendee id.
    attendee_bindings: BTreeMap<String, StreamBinding>,
    presence: PresenceTracker,
}

impl SignalingSession {
    #[must_use]
    pub fn new(
        config: SignalingClientConfig,
        factory: Arc<dyn SignalingTransportFactory>,
        observers: Arc<ObserverRegistry>,
    ) -> Self {
        let is_muted = config.mute_on_join;
        Self {
            config,
            factory,
            observers,
            transport: None,
            events: None,
            state: SessionState::Idle,
            is_joined: false,
            has_received_first_index: false,
            stopped_notified: false,
            is_muted,
            turn_credentials: None,
            local_description: String::new(),
            local_audio: BTreeMap::new(),
            local_video: BTreeMap::new(),
            remote_video_sources: BTreeMap::new(),
            attendee_bindings: BTreeMap::new(),
            presence: PresenceTracker::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.is_joined
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    #[must_use]
    pub fn config(&self) -> &SignalingClientConfig {
        &self.config
    }

    #[must_use]
    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.observers
    }

    /// Next event from the current transport. Pending while no transport is
    /// attached.
    pub async fn next_transport_event(&mut self) -> TransportEvent {
        loop {
            match self.events.as_mut() {
                Some(events) => match events.recv().await {
                    Some(event) => return event,
                    None => self.events = None,
                },
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Open a new signaling connection. Any previous transport is stopped
    /// and its pending events discarded.
    pub fn start(&mut self) {
        if let Some(mut previous) = self.transport.take() {
            debug!(target: "signaling.session", "Replacing previous transport");
            previous.stop();
        }

        self.is_joined = false;
        self.has_received_first_index = false;
        self.stopped_notified = false;
        self.turn_credentials = None;
        self.remote_video_sources.clear();
        self.attendee_bindings.clear();
        self.presence.reset();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut transport = self.factory.create(events_tx);
        transport.start();
        self.transport = Some(transport);
        self.events = Some(events_rx);
        self.state = SessionState::Connecting;

        info!(
            target: "signaling.session",
            meeting_id = %self.config.meeting.meeting_id,
            attendee_id = %self.config.meeting.credentials.attendee_id,
            "Signaling session starting"
        );
    }

    /// Leave the meeting. From `Connected` this sends LEAVE and waits for
    /// LEAVE_ACK; from any other state the transport is torn down at once.
    pub fn stop(&mut self) {
        if self.state == SessionState::Connected {
            info!(target: "signaling.session", "Sending LEAVE");
            self.send_frame(SignalFrame {
                leave: Some(LeaveFrame {}),
                ..SignalFrame::of_type(signal_frame::Type::Leave)
            });
            self.state = SessionState::Disconnecting;
            return;
        }

        if self.state != SessionState::Idle {
            self.state = SessionState::Disconnected;
        }
        self.teardown();
    }

    /// Stop without waiting for LEAVE_ACK or the transport's close event.
    /// Observers are told the session stopped if a run was in progress.
    pub fn shutdown(&mut self) {
        let was_active = matches!(
            self.state,
            SessionState::Connecting | SessionState::Connected | SessionState::Disconnecting
        );
        self.state = SessionState::Disconnected;
        self.teardown();
        self.transport = None;
        self.events = None;
        if was_active {
            self.notify_stopped(SignalingClientStatus::new(
                SignalingClientStatusType::Ok,
                "Signaling client shut down",
            ));
        }
    }

    /// Store the local offer used by the next [`send_updates`](Self::send_updates).
    pub fn set_local_description(&mut self, sdp: impl Into<String>) {
        self.local_description = sdp.into();
    }

    /// Send a SUBSCRIBE built from the local description, the local slots
    /// and the current remote subscriptions.
    ///
    /// Returns false when not connected or if the frame could not be sent.
    pub fn send_updates(&mut self) -> bool {
        if self.state != SessionState::Connected {
            warn!(
                target: "signaling.session",
                state = ?self.state,
                "Cannot send updates before the session is connected"
            );
            return false;
        }

        let subscribe = self.build_subscribe();
        debug!(
            target: "signaling.session",
            "Sending SUBSCRIBE: {}",
            frame_debug::subscribe_summary(&subscribe)
        );

        self.send_frame(SignalFrame {
            sub: Some(subscribe),
            ..SignalFrame::of_type(signal_frame::Type::Subscribe)
        })
    }

    fn build_subscribe(&self) -> SubscribeFrame {
        let mut duplex = StreamServiceType::Rx;
        let mut send_streams = Vec::new();
        let mut receive_stream_ids = Vec::new();

        for section in parse_media_sections(&self.local_description) {
            match section.kind {
                MediaKind::Audio => {
                    if let Some(binding) = self.local_audio.get(&section.mid) {
                        // Audio receive is implied; its slot holds a zero id
                        receive_stream_ids.push(0);
                        send_streams.push(send_descriptor(binding));
                    }
                }
                MediaKind::Video => {
                    if section.direction.is_sending() {
                        duplex = StreamServiceType::Duplex;
                    }
                    if let Some(binding) = self.local_video.get(&section.mid) {
                        send_streams.push(send_descriptor(binding));
                    } else if let Some(remote) = self.remote_video_sources.get(&section.mid) {
                        receive_stream_ids.push(if section.direction == MediaDirection::Inactive {
                            0
                        } else {
                            remote.stream_id
                        });
                    }
                }
            }
        }

        if !duplex.sends() {
            send_streams.clear();
        }

        let audio_host = &self.config.meeting.urls.audio_host_url;
        SubscribeFrame {
            duplex: Some(duplex as i32),
            send_streams,
            receive_stream_ids,
            sdp_offer: Some(self.local_description.clone()),
            audio_host: (!audio_host.is_empty()).then(|| audio_host.clone()),
            audio_checkin: None,
            audio_muted: self.is_muted.then_some(true),
        }
    }

    /// Add a local video slot, or update its bitrate if it exists.
    pub fn add_local_video(&mut self, mid: impl Into<String>, config: LocalVideoConfig) {
        self.update_local_video(mid, config);
    }

    pub fn update_local_video(&mut self, mid: impl Into<String>, config: LocalVideoConfig) {
        let attendee = self.local_attendee();
        self.local_video
            .entry(mid.into())
            .or_insert_with(|| StreamBinding {
                attendee,
                ..StreamBinding::default()
            })
            .max_bitrate_kbps = config.max_bitrate_kbps;
    }

    pub fn remove_local_video(&mut self, mid: &str) {
        self.local_video.remove(mid);
    }

    /// Add a local audio slot, or update it if it exists. The slot's mute
    /// state is applied through [`set_mute`](Self::set_mute).
    pub fn add_local_audio(&mut self, mid: impl Into<String>, config: LocalAudioConfig) {
        self.update_local_audio(mid, config);
    }

    pub fn update_local_audio(&mut self, mid: impl Into<String>, config: LocalAudioConfig) {
        let attendee = self.local_attendee();
        self.local_audio
            .entry(mid.into())
            .or_insert_with(|| StreamBinding {
                attendee,
                ..StreamBinding::default()
            });
        self.set_mute(config.mute_state.is_muted());
    }

    pub fn remove_local_audio(&mut self, mid: &str) {
        self.local_audio.remove(mid);
    }

    /// Change which remote videos are subscribed, keyed by media section id.
    ///
    /// Sources must have been announced in an INDEX frame; unknown attendees
    /// are skipped. Takes effect on the next [`send_updates`](Self::send_updates).
    pub fn update_remote_video_subscriptions(
        &mut self,
        added_or_updated: HashMap<String, RemoteVideoSourceInfo>,
        removed: &[String],
    ) {
        for (mid, info) in added_or_updated {
            let Some(binding) = self.attendee_bindings.get(&info.attendee.attendee_id) else {
                warn!(
                    target: "signaling.session",
                    attendee = %info.attendee,
                    mid = %mid,
                    "Cannot subscribe to unknown remote video source"
                );
                continue;
            };

            match self.remote_video_sources.get_mut(&mid) {
                Some(existing) => {
                    existing.stream_id = binding.stream_id;
                    existing.group_id = binding.group_id;
                    existing.max_bitrate_kbps = info.max_bitrate_kbps;
                }
                None => {
                    let subscription = StreamBinding {
                        max_bitrate_kbps: info.max_bitrate_kbps,
                        ..binding.clone()
                    };
                    self.remote_video_sources.insert(mid, subscription);
                }
            }
        }

        for mid in removed {
            self.remote_video_sources.remove(mid);
        }
    }

    /// Broadcast a data message. Invalid messages are reported to observers
    /// instead of being sent.
    pub fn send_data_message(&mut self, message: DataMessageToSend) {
        if self.state != SessionState::Connected {
            warn!(
                target: "signaling.session",
                topic = %message.topic,
                "Dropping data message, session is not connected"
            );
            return;
        }

        if let Some(reason) = validate_data_message(&message) {
            warn!(
                target: "signaling.session",
                topic = %message.topic,
                ?reason,
                "Rejecting data message"
            );
            let errors = [DataMessageSendError {
                topic: message.topic,
                data: message.data,
                reason,
            }];
            self.observers
                .notify(|o| o.on_data_messages_failed_to_send(&errors));
            return;
        }

        let lifetime_ms = u32::try_from(message.lifetime_ms).unwrap_or_default();
        self.send_frame(SignalFrame {
            data_message: Some(DataMessageFrame {
                messages: vec![DataMessagePayload {
                    topic: Some(message.topic),
                    data: Some(message.data),
                    lifetime_ms: Some(lifetime_ms),
                    ..DataMessagePayload::default()
                }],
            }),
            ..SignalFrame::of_type(signal_frame::Type::DataMessage)
        });
    }

    /// Set the local mute state, telling the server when connected.
    pub fn set_mute(&mut self, muted: bool) {
        if self.is_muted == muted {
            return;
        }
        self.is_muted = muted;

        if self.state != SessionState::Connected {
            warn!(
                target: "signaling.session",
                muted,
                "Mute state stored, session is not connected"
            );
            return;
        }

        self.send_frame(SignalFrame {
            audio_control: Some(AudioControlFrame { muted: Some(muted) }),
            ..SignalFrame::of_type(signal_frame::Type::AudioControl)
        });
    }

    /// Apply one event from the transport.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::FrameReceived(frame) => self.handle_frame(&frame),
            TransportEvent::Error(error) => self.on_transport_error(&error),
            TransportEvent::Closed(close) => self.on_transport_closed(&close),
        }
    }

    fn on_connected(&mut self) {
        if self.state != SessionState::Connecting {
            debug!(
                target: "signaling.session",
                state = ?self.state,
                "Ignoring transport connected event"
            );
            return;
        }

        let mut flags = JoinFlags::ExcludeSelfContentInIndex as u32;
        if self.config.enable_attendee_update {
            flags |= JoinFlags::HasStreamUpdate as u32;
        }

        info!(target: "signaling.session", "Transport connected, sending JOIN");
        self.send_frame(SignalFrame {
            join: Some(JoinFrame {
                protocol_version: Some(PROTOCOL_VERSION),
                max_num_of_videos: Some(MAX_NUM_OF_VIDEOS),
                flags: Some(flags),
                client_details: Some(ClientDetails {
                    client_source: Some(CLIENT_SOURCE.to_string()),
                    sdk_version: Some(env!("CARGO_PKG_VERSION").to_string()),
                    ..ClientDetails::default()
                }),
            }),
            ..SignalFrame::of_type(signal_frame::Type::Join)
        });
    }

    fn on_transport_error(&mut self, error: &SignalingError) {
        if !error.is_fatal() {
            warn!(
                target: "signaling.session",
                description = %error.description,
                "Non-fatal signaling error"
            );
            return;
        }

        error!(
            target: "signaling.session",
            description = %error.description,
            "Fatal signaling error, stopping session"
        );
        self.state = SessionState::Disconnected;
        self.teardown();
        self.notify_stopped(SignalingClientStatus::new(
            SignalingClientStatusType::ClientError,
            error.description.clone(),
        ));
    }

    fn on_transport_closed(&mut self, close: &CloseEvent) {
        info!(
            target: "signaling.session",
            initiator = ?close.initiator,
            description = %close.description,
            "Signaling connection closed"
        );
        self.state = SessionState::Disconnected;
        self.teardown();

        let kind = match close.initiator {
            CloseInitiator::Client => SignalingClientStatusType::Ok,
            CloseInitiator::Server => SignalingClientStatusType::NetworkError,
        };
        self.notify_stopped(SignalingClientStatus::new(kind, close.description.clone()));
    }

    fn handle_frame(&mut self, frame: &SignalFrame) {
        let Some(frame_type) = frame.frame_type() else {
            debug!(
                target: "signaling.session",
                frame_type = frame.r#type,
                "Ignoring frame of unknown type"
            );
            return;
        };

        match frame_type {
            signal_frame::Type::JoinAck => self.on_join_ack(frame),
            signal_frame::Type::LeaveAck => {
                info!(target: "signaling.session", "LEAVE_ACK received");
                self.state = SessionState::Disconnected;
                self.teardown();
            }
            signal_frame::Type::Index => match &frame.index {
                Some(index) => self.on_index(index),
                None => warn!(target: "signaling.session", "INDEX frame without payload"),
            },
            signal_frame::Type::SubscribeAck => match &frame.suback {
                Some(ack) => self.on_subscribe_ack(ack),
                None => warn!(target: "signaling.session", "SUBSCRIBE_ACK frame without payload"),
            },
            signal_frame::Type::AudioMetadata => {
                if let Some(metadata) = &frame.audio_metadata {
                    for event in self.presence.on_metadata(metadata) {
                        self.observers.notify_presence(&event);
                    }
                }
            }
            signal_frame::Type::AudioStreamIdInfo => {
                if let Some(info) = &frame.audio_stream_id_info {
                    for event in self.presence.on_stream_identity(info) {
                        self.observers.notify_presence(&event);
                    }
                }
            }
            signal_frame::Type::DataMessage => {
                if let Some(data) = &frame.data_message {
                    self.on_data_messages(data);
                }
            }
            // Liveness is covered by websocket pings
            signal_frame::Type::Bitrates | signal_frame::Type::PingPong => {
                debug!(
                    target: "signaling.session",
                    frame_type = frame_type.as_str_name(),
                    "Ignoring frame"
                );
            }
            other => {
                debug!(
                    target: "signaling.session",
                    frame_type = other.as_str_name(),
                    "Ignoring unhandled frame"
                );
            }
        }
    }

    fn on_join_ack(&mut self, frame: &SignalFrame) {
        let Some(proto) = frame.joinack.as_ref().and_then(|ack| ack.turn_credentials.as_ref())
        else {
            error!(target: "signaling.session", "JOIN_ACK without TURN credentials");
            return;
        };
        let Some(credentials) = TurnCredentials::from_proto(proto, Utc::now()) else {
            error!(target: "signaling.session", "JOIN_ACK carries incomplete TURN credentials");
            return;
        };

        self.turn_credentials = Some(credentials);
        self.is_joined = true;
        if self.state == SessionState::Connecting {
            self.state = SessionState::Connected;
            info!(target: "signaling.session", "Joined meeting");
        }
    }

    fn on_index(&mut self, index: &IndexFrame) {
        if self.state != SessionState::Connected || !self.is_joined {
            warn!(
                target: "signaling.session",
                state = ?self.state,
                joined = self.is_joined,
                "Ignoring INDEX before join completed"
            );
            return;
        }
        if index.at_capacity.unwrap_or(false) {
            warn!(target: "signaling.session", "Meeting is at video capacity");
            return;
        }

        debug!(
            target: "signaling.session",
            "Received INDEX: {}",
            frame_debug::index_summary(index)
        );

        let announced: Vec<&str> = index
            .sources
            .iter()
            .filter_map(|source| source.attendee_id.as_deref())
            .collect();
        let removed_ids: Vec<String> = self
            .attendee_bindings
            .keys()
            .filter(|attendee_id| !announced.contains(&attendee_id.as_str()))
            .cloned()
            .collect();
        self.remote_video_sources
            .retain(|_, subscription| !removed_ids.contains(&subscription.attendee.attendee_id));
        let mut removed = Vec::with_capacity(removed_ids.len());
        for attendee_id in removed_ids {
            if let Some(binding) = self.attendee_bindings.remove(&attendee_id) {
                removed.push(RemoteVideoSourceInfo::from(&binding));
            }
        }

        let mut added = Vec::new();
        for source in &index.sources {
            let Some(attendee_id) = source.attendee_id.clone() else {
                continue;
            };
            let fresh = StreamBinding::from_descriptor(source);
            match self.attendee_bindings.get_mut(&attendee_id) {
                Some(existing) => {
                    existing.stream_id = fresh.stream_id;
                    existing.group_id = fresh.group_id;
                    existing.max_bitrate_kbps = fresh.max_bitrate_kbps;
                    existing.attendee = fresh.attendee;
                }
                None => {
                    added.push(RemoteVideoSourceInfo::from(&fresh));
                    self.attendee_bindings.insert(attendee_id, fresh);
                }
            }
        }

        if !self.has_received_first_index {
            self.has_received_first_index = true;

            let credentials = match &self.turn_credentials {
                Some(credentials) if !credentials.is_expired(Utc::now()) => credentials.clone(),
                _ => {
                    error!(
                        target: "signaling.session",
                        "TURN credentials missing or expired at first INDEX"
                    );
                    self.state = SessionState::Disconnected;
                    self.teardown();
                    self.notify_stopped(SignalingClientStatus::new(
                        SignalingClientStatusType::ClientError,
                        STOPPED_REASON_TURN_EXPIRED,
                    ));
                    return;
                }
            };

            info!(
                target: "signaling.session",
                sources = added.len(),
                "Signaling session started"
            );
            let start_info = StartInfo {
                turn_credentials: credentials,
                sources: added,
            };
            self.observers
                .notify(|o| o.on_signaling_client_started(&start_info));
            return;
        }

        if !added.is_empty() {
            self.observers
                .notify(|o| o.on_remote_video_sources_available(&added));
        }
        if !removed.is_empty() {
            self.observers
                .notify(|o| o.on_remote_video_sources_unavailable(&removed));
        }
    }

    fn on_subscribe_ack(&mut self, ack: &SubscribeAckFrame) {
        let Some(answer) = ack.sdp_answer.as_deref() else {
            error!(target: "signaling.session", "SUBSCRIBE_ACK without SDP answer");
            return;
        };

        debug!(
            target: "signaling.session",
            "Received SUBSCRIBE_ACK: {}",
            frame_debug::subscribe_ack_summary(ack)
        );

        // Allocations come back in the order local sections appear in the answer
        let local_slots = self.local_audio.len() + self.local_video.len();
        let mut allocations = ack.allocations.iter();
        let mut assigned = 0;
        for section in parse_media_sections(answer) {
            if assigned >= local_slots {
                break;
            }
            let slot = match self.local_audio.get_mut(&section.mid) {
                Some(slot) => Some(slot),
                None => self.local_video.get_mut(&section.mid),
            };
            let Some(slot) = slot else {
                continue;
            };
            let Some(allocation) = allocations.next() else {
                break;
            };
            slot.group_id = allocation.group_id.unwrap_or_default();
            slot.stream_id = allocation.stream_id.unwrap_or_default();
            assigned += 1;
        }

        self.observers
            .notify(|o| o.on_remote_description_received(answer));
    }

    fn on_data_messages(&self, frame: &DataMessageFrame) {
        let mut received = Vec::new();
        let mut failed = Vec::new();

        for payload in &frame.messages {
            let topic = payload.topic.clone().unwrap_or_default();
            let data = payload.data.clone().unwrap_or_default();
            match payload.ingest_time_ns.unwrap_or(0) {
                // The server returns a message to its sender with no ingest
                // time when it was throttled
                0 => failed.push(DataMessageSendError {
                    topic,
                    data,
                    reason: DataMessageSendErrorReason::Throttled,
                }),
                ingest_time_ns => received.push(DataMessageReceived {
                    topic,
                    data,
                    attendee: Attendee::new(
                        payload.sender_attendee_id.clone().unwrap_or_default(),
                        payload.sender_external_user_id.clone().unwrap_or_default(),
                    ),
                    timestamp_ms: ingest_time_ns / 1_000_000,
                }),
            }
        }

        if !received.is_empty() {
            self.observers
                .notify(|o| o.on_data_messages_received(&received));
        }
        if !failed.is_empty() {
            self.observers
                .notify(|o| o.on_data_messages_failed_to_send(&failed));
        }
    }

    fn send_frame(&mut self, frame: SignalFrame) -> bool {
        match self.transport.as_mut() {
            Some(transport) => transport.send_signal_frame(frame),
            None => {
                warn!(target: "signaling.session", "No transport, dropping outgoing frame");
                false
            }
        }
    }

    fn notify_stopped(&mut self, status: SignalingClientStatus) {
        if self.stopped_notified {
            return;
        }
        self.stopped_notified = true;
        self.observers
            .notify(|o| o.on_signaling_client_stopped(&status));
    }

    /// Stop the transport and forget all per-session media and presence
    /// state. The event receiver is kept so the transport's final close
    /// event is still delivered.
    fn teardown(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.stop();
        }
        self.is_joined = false;
        self.has_received_first_index = false;
        self.turn_credentials = None;
        self.local_description.clear();
        self.local_audio.clear();
        self.local_video.clear();
        self.remote_video_sources.clear();
        self.attendee_bindings.clear();
        self.presence.reset();
    }

    fn local_attendee(&self) -> Attendee {
        Attendee::new(
            self.config.meeting.credentials.attendee_id.clone(),
            self.config.meeting.credentials.external_user_id.clone(),
        )
    }
}

impl std::fmt::Debug for SignalingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingSession")
            .field("state", &self.state)
            .field("is_joined", &self.is_joined)
            .field("local_audio", &self.local_audio.len())
            .field("local_video", &self.local_video.len())
            .field("remote_video_sources", &self.remote_video_sources.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(topic: &str, size: usize, lifetime_ms: i32) -> DataMessageToSend {
        DataMessageToSend {
            topic: topic.to_string(),
            data: vec![0; size],
            lifetime_ms,
        }
    }

    #[test]
    fn test_valid_data_message() {
        assert_eq!(validate_data_message(&message("chat_room-1", 10, 0)), None);
        assert_eq!(
            validate_data_message(&message("a", MAX_DATA_MESSAGE_SIZE, 1000)),
            None
        );
        assert_eq!(validate_data_message(&message(&"t".repeat(36), 0, 0)), None);
    }

    #[test]
    fn test_oversized_data_message() {
        assert_eq!(
            validate_data_message(&message("chat", MAX_DATA_MESSAGE_SIZE + 1, 0)),
            Some(DataMessageSendErrorReason::InvalidDataMessageSize)
        );
    }

    #[test]
    fn test_invalid_topics() {
        for topic in ["", "has space", "dot.ted", "new\nline", &"t".repeat(37)] {
            assert_eq!(
                validate_data_message(&message(topic, 1, 0)),
                Some(DataMessageSendErrorReason::InvalidTopic),
                "topic {topic:?}"
            );
        }
    }

    #[test]
    fn test_negative_lifetime() {
        assert_eq!(
            validate_data_message(&message("chat", 1, -1)),
            Some(DataMessageSendErrorReason::InvalidLifetimeMs)
        );
    }

    #[test]
    fn test_first_failing_rule_wins() {
        // Oversized with a bad topic and lifetime reports only the size
        assert_eq!(
            validate_data_message(&message("bad topic", MAX_DATA_MESSAGE_SIZE + 1, -5)),
            Some(DataMessageSendErrorReason::InvalidDataMessageSize)
        );
        assert_eq!(
            validate_data_message(&message("bad topic", 1, -5)),
            Some(DataMessageSendErrorReason::InvalidTopic)
        );
    }

    #[test]
    fn test_session_state_default() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }
}
