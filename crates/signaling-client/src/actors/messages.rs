//! Commands accepted by the session actor.

use crate::session::SessionState;
use crate::types::{DataMessageToSend, LocalAudioConfig, LocalVideoConfig, RemoteVideoSourceInfo};
use std::collections::HashMap;
use tokio::sync::oneshot;

/// One caller operation on the session.
#[derive(Debug)]
pub enum SessionCommand {
    Start,
    Stop,
    SetLocalDescription {
        sdp: String,
    },
    /// Send SUBSCRIBE; replies whether the frame was handed to the transport.
    SendUpdates {
        respond_to: oneshot::Sender<bool>,
    },
    AddLocalVideo {
        mid: String,
        config: LocalVideoConfig,
    },
    UpdateLocalVideo {
        mid: String,
        config: LocalVideoConfig,
    },
    RemoveLocalVideo {
        mid: String,
    },
    AddLocalAudio {
        mid: String,
        config: LocalAudioConfig,
    },
    UpdateLocalAudio {
        mid: String,
        config: LocalAudioConfig,
    },
    RemoveLocalAudio {
        mid: String,
    },
    UpdateRemoteVideoSubscriptions {
        added_or_updated: HashMap<String, RemoteVideoSourceInfo>,
        removed: Vec<String>,
    },
    SendDataMessage {
        message: DataMessageToSend,
    },
    SetMute {
        muted: bool,
    },
    GetState {
        respond_to: oneshot::Sender<SessionState>,
    },
}
