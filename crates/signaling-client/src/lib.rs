//! Signaling Client Library
//!
//! Client side of the video-conferencing signaling protocol. It negotiates
//! session membership, advertises and receives media stream descriptors, and
//! relays attendee presence and data messages over a persistent websocket.
//! It does not touch media itself: the embedding media engine supplies the
//! local offer and applies the returned answer.
//!
//! # Architecture
//!
//! ```text
//! SignalingClientHandle (cloneable, any task)
//! └── SessionActor (one tokio task, single writer)
//!     └── SignalingSession (protocol state machine)
//!         ├── SignalingTransport (websocket, reconnect, keepalive)
//!         ├── PresenceTracker (attendee join/leave/mute/volume)
//!         └── sdp::parse_media_sections (offer/answer sections)
//! ```
//!
//! Observers registered through the handle receive every protocol event.
//!
//! # Modules
//!
//! - [`actors`] - Session actor and its handle
//! - [`config`] - Client configuration from environment
//! - [`errors`] - Error types
//! - [`observer`] - Observer trait and registry
//! - [`presence`] - Attendee presence and audio metadata tracking
//! - [`sdp`] - Media description parsing
//! - [`session`] - Protocol state machine
//! - [`types`] - Public data types

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod actors;
pub mod config;
pub mod errors;
mod frame_debug;
pub mod observer;
pub mod presence;
pub mod sdp;
pub mod session;
pub mod types;

pub use actors::{SessionActor, SessionCommand, SignalingClientHandle};
pub use config::{
    ConfigError, MeetingSessionConfig, MeetingSessionCredentials, MeetingSessionUrls,
    SignalingClientConfig,
};
pub use errors::ClientError;
pub use observer::{ObserverRegistry, SignalingObserver};
pub use session::{SessionState, SignalingSession};
