//! `SessionActor` - the task that drives one signaling session.
//!
//! # Lifecycle
//!
//! 1. [`SessionActor::spawn`] starts the task; the session is `Idle` until
//!    [`SignalingClientHandle::start`] is called
//! 2. Start/stop may be repeated; each start gets a fresh transport
//! 3. [`SignalingClientHandle::shutdown`], or dropping every handle, tears
//!    the session down and ends the task

use super::mailbox::MailboxMonitor;
use super::messages::SessionCommand;
use crate::config::SignalingClientConfig;
use crate::errors::ClientError;
use crate::observer::{ObserverRegistry, SignalingObserver};
use crate::session::{SessionState, SignalingSession};
use crate::types::{DataMessageToSend, LocalAudioConfig, LocalVideoConfig, RemoteVideoSourceInfo};

use signaling_transport::{SignalingTransportFactory, WebsocketTransportFactory};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Handle to a [`SessionActor`].
///
/// Every method only enqueues a command, so handles are safe to use from
/// observer callbacks.
#[derive(Clone, Debug)]
pub struct SignalingClientHandle {
    sender: mpsc::UnboundedSender<SessionCommand>,
    cancel_token: CancellationToken,
    observers: Arc<ObserverRegistry>,
    mailbox: Arc<MailboxMonitor>,
}

impl SignalingClientHandle {
    fn command(&self, command: SessionCommand) -> Result<(), ClientError> {
        self.sender
            .send(command)
            .map_err(|_| ClientError::ActorGone)?;
        self.mailbox.record_enqueue();
        Ok(())
    }

    /// Open the signaling connection and join the meeting.
    pub fn start(&self) -> Result<(), ClientError> {
        self.command(SessionCommand::Start)
    }

    /// Leave the meeting.
    pub fn stop(&self) -> Result<(), ClientError> {
        self.command(SessionCommand::Stop)
    }

    pub fn set_local_description(&self, sdp: impl Into<String>) -> Result<(), ClientError> {
        self.command(SessionCommand::SetLocalDescription { sdp: sdp.into() })
    }

    /// Send a SUBSCRIBE reflecting the current local description, local
    /// slots and remote subscriptions.
    ///
    /// Resolves to false when the session is not connected.
    pub async fn send_updates(&self) -> Result<bool, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.command(SessionCommand::SendUpdates { respond_to: tx })?;
        rx.await.map_err(|_| ClientError::ResponseDropped)
    }

    pub fn add_local_video(
        &self,
        mid: impl Into<String>,
        config: LocalVideoConfig,
    ) -> Result<(), ClientError> {
        self.command(SessionCommand::AddLocalVideo {
            mid: mid.into(),
            config,
        })
    }

    pub fn update_local_video(
        &self,
        mid: impl Into<String>,
        config: LocalVideoConfig,
    ) -> Result<(), ClientError> {
        self.command(SessionCommand::UpdateLocalVideo {
            mid: mid.into(),
            config,
        })
    }

    pub fn remove_local_video(&self, mid: impl Into<String>) -> Result<(), ClientError> {
        self.command(SessionCommand::RemoveLocalVideo { mid: mid.into() })
    }

    pub fn add_local_audio(
        &self,
        mid: impl Into<String>,
        config: LocalAudioConfig,
    ) -> Result<(), ClientError> {
        self.command(SessionCommand::AddLocalAudio {
            mid: mid.into(),
            config,
        })
    }

    pub fn update_local_audio(
        &self,
        mid: impl Into<String>,
        config: LocalAudioConfig,
    ) -> Result<(), ClientError> {
        self.command(SessionCommand::UpdateLocalAudio {
            mid: mid.into(),
            config,
        })
    }

    pub fn remove_local_audio(&self, mid: impl Into<String>) -> Result<(), ClientError> {
        self.command(SessionCommand::RemoveLocalAudio { mid: mid.into() })
    }

    /// Change remote video subscriptions, keyed by media section id.
    pub fn update_remote_video_subscriptions(
        &self,
        added_or_updated: HashMap<String, RemoteVideoSourceInfo>,
        removed: Vec<String>,
    ) -> Result<(), ClientError> {
        self.command(SessionCommand::UpdateRemoteVideoSubscriptions {
            added_or_updated,
            removed,
        })
    }

    pub fn send_data_message(&self, message: DataMessageToSend) -> Result<(), ClientError> {
        self.command(SessionCommand::SendDataMessage { message })
    }

    pub fn set_mute(&self, muted: bool) -> Result<(), ClientError> {
        self.command(SessionCommand::SetMute { muted })
    }

    /// Current session state.
    pub async fn state(&self) -> Result<SessionState, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.command(SessionCommand::GetState { respond_to: tx })?;
        rx.await.map_err(|_| ClientError::ResponseDropped)
    }

    pub fn add_observer(&self, observer: Arc<dyn SignalingObserver>) {
        self.observers.add(observer);
    }

    /// Returns false if the observer was not registered.
    pub fn remove_observer(&self, observer: &Arc<dyn SignalingObserver>) -> bool {
        self.observers.remove(observer)
    }

    /// Tear the session down and stop the actor.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    #[must_use]
    pub fn mailbox(&self) -> &MailboxMonitor {
        &self.mailbox
    }
}

/// Owns the [`SignalingSession`] and applies commands and transport events
/// to it in order.
pub struct SessionActor {
    meeting_id: String,
    attendee_id: String,
    session: SignalingSession,
    receiver: mpsc::UnboundedReceiver<SessionCommand>,
    cancel_token: CancellationToken,
    mailbox: Arc<MailboxMonitor>,
}

impl SessionActor {
    /// Spawn a session actor using `factory` to create a transport per start.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        config: SignalingClientConfig,
        factory: Arc<dyn SignalingTransportFactory>,
    ) -> (SignalingClientHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();
        let observers = Arc::new(ObserverRegistry::new());

        let meeting_id = config.meeting.meeting_id.clone();
        let attendee_id = config.meeting.credentials.attendee_id.clone();
        let mailbox = Arc::new(MailboxMonitor::new(format!("{meeting_id}/{attendee_id}")));

        let actor = Self {
            meeting_id,
            attendee_id,
            session: SignalingSession::new(config, factory, observers.clone()),
            receiver,
            cancel_token: cancel_token.clone(),
            mailbox: mailbox.clone(),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SignalingClientHandle {
            sender,
            cancel_token,
            observers,
            mailbox,
        };

        (handle, task_handle)
    }

    /// Spawn a session actor that connects over websocket.
    pub fn spawn_websocket(config: SignalingClientConfig) -> (SignalingClientHandle, JoinHandle<()>) {
        let factory = Arc::new(WebsocketTransportFactory::new(config.websocket_config()));
        Self::spawn(config, factory)
    }

    /// Spawn a websocket session actor configured from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if a required variable is missing or invalid.
    pub fn spawn_from_env() -> Result<(SignalingClientHandle, JoinHandle<()>), ClientError> {
        Self::spawn_from_vars(&std::env::vars().collect())
    }

    /// Spawn a websocket session actor configured from a variable map.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if a required variable is missing or invalid.
    pub fn spawn_from_vars(
        vars: &HashMap<String, String>,
    ) -> Result<(SignalingClientHandle, JoinHandle<()>), ClientError> {
        let config = SignalingClientConfig::from_vars(vars)?;
        Ok(Self::spawn_websocket(config))
    }

    #[instrument(
        skip_all,
        name = "signaling.actor.session",
        fields(meeting_id = %self.meeting_id, attendee_id = %self.attendee_id)
    )]
    async fn run(mut self) {
        debug!(target: "signaling.actor.session", "SessionActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "signaling.actor.session",
                        "SessionActor received cancellation signal"
                    );
                    break;
                }

                command = self.receiver.recv() => {
                    match command {
                        Some(command) => {
                            self.mailbox.record_dequeue();
                            self.handle_command(command);
                        }
                        None => {
                            debug!(
                                target: "signaling.actor.session",
                                "All handles dropped, exiting"
                            );
                            break;
                        }
                    }
                }

                event = self.session.next_transport_event() => {
                    self.session.handle_transport_event(event);
                }
            }
        }

        self.session.shutdown();

        info!(
            target: "signaling.actor.session",
            meeting_id = %self.meeting_id,
            attendee_id = %self.attendee_id,
            commands_handled = self.mailbox.commands_handled(),
            mailbox_high_water_mark = self.mailbox.high_water_mark(),
            "SessionActor stopped"
        );
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start => self.session.start(),
            SessionCommand::Stop => self.session.stop(),
            SessionCommand::SetLocalDescription { sdp } => self.session.set_local_description(sdp),
            SessionCommand::SendUpdates { respond_to } => {
                let sent = self.session.send_updates();
                let _ = respond_to.send(sent);
            }
            SessionCommand::AddLocalVideo { mid, config } => {
                self.session.add_local_video(mid, config);
            }
            SessionCommand::UpdateLocalVideo { mid, config } => {
                self.session.update_local_video(mid, config);
            }
            SessionCommand::RemoveLocalVideo { mid } => self.session.remove_local_video(&mid),
            SessionCommand::AddLocalAudio { mid, config } => {
                self.session.add_local_audio(mid, config);
            }
            SessionCommand::UpdateLocalAudio { mid, config } => {
                self.session.update_local_audio(mid, config);
            }
            SessionCommand::RemoveLocalAudio { mid } => self.session.remove_local_audio(&mid),
            SessionCommand::UpdateRemoteVideoSubscriptions {
                added_or_updated,
                removed,
            } => {
                self.session
                    .update_remote_video_subscriptions(added_or_updated, &removed);
            }
            SessionCommand::SendDataMessage { message } => self.session.send_data_message(message),
            SessionCommand::SetMute { muted } => self.session.set_mute(muted),
            SessionCommand::GetState { respond_to } => {
                let _ = respond_to.send(self.session.state());
            }
        }
    }
}
