//! Transport abstraction consumed by the signaling session.

use common::error::SignalingError;
use signal_proto::signal::SignalFrame;
use tokio::sync::mpsc;

/// Who ended the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseInitiator {
    /// Closed on request of this client.
    Client,
    /// The far end closed the connection.
    Server,
}

/// Terminal close notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub initiator: CloseInitiator,
    pub description: String,
}

/// Notifications from a running transport, delivered in receive order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is up and frames may flow.
    Connected,
    /// One complete inbound frame.
    FrameReceived(SignalFrame),
    /// The connection failed. Terminal unless the error is non-fatal.
    Error(SignalingError),
    /// The connection closed. Terminal.
    Closed(CloseEvent),
}

/// Frame-level transport driven by the session.
///
/// Implementations report progress on the event channel they were created
/// with. `start` and `stop` are idempotent.
pub trait SignalingTransport: Send {
    /// Begin connecting.
    fn start(&mut self);

    /// Close the connection. Does not wait for the close to complete.
    fn stop(&mut self);

    /// Stamp, encode and queue a frame for sending.
    ///
    /// Returns `false` only if the frame could not be serialized.
    fn send_signal_frame(&mut self, frame: SignalFrame) -> bool;
}

/// Creates a fresh transport for each session run.
pub trait SignalingTransportFactory: Send + Sync {
    fn create(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Box<dyn SignalingTransport>;
}
