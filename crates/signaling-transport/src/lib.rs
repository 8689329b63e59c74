//! Signaling transport.
//!
//! Delivers whole [`SignalFrame`](signal_proto::signal::SignalFrame)s over a
//! websocket connection to the signaling endpoint:
//! - Wire envelope: one tag byte followed by the protobuf payload ([`codec`])
//! - Reassembly of fragmented inbound messages ([`fragment`])
//! - Bounded reconnect with jittered backoff ([`retry`])
//! - Keepalive pings and idle hang-up ([`keepalive`])
//!
//! The session consumes a transport through the [`SignalingTransport`] trait
//! and observes it through a stream of [`TransportEvent`]s.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod codec;
pub mod config;
pub mod errors;
pub mod fragment;
pub mod keepalive;
pub mod retry;
pub mod transport;
pub mod websocket;

pub use codec::{decode_envelope, encode_envelope, CodecError, ENVELOPE_TAG};
pub use config::WebsocketConfig;
pub use errors::TransportError;
pub use retry::RetryPolicy;
pub use transport::{
    CloseEvent, CloseInitiator, SignalingTransport, SignalingTransportFactory, TransportEvent,
};
pub use websocket::{
    BoxedWebsocket, TungsteniteConnector, WebsocketConnector, WebsocketIo,
    WebsocketSignalingTransport, WebsocketTransportFactory,
};
