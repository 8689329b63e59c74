//! Websocket implementation of [`SignalingTransport`].
//!
//! Each `start` spawns a connection task that owns the socket. The task:
//! 1. Connects, retrying per the configured [`RetryPolicy`](crate::RetryPolicy)
//! 2. Reports `Connected`, then pumps outbound envelopes and inbound messages
//! 3. Pings on silence and hangs up after the idle timeout
//! 4. Ends with exactly one terminal `Error` or `Closed` event

use crate::codec::{decode_envelope, encode_envelope, CodecError};
use crate::config::{
    WebsocketConfig, CONTROL_PROTOCOL_VERSION, CONTROL_PROTOCOL_VERSION_HEADER,
    SESSION_COOKIE_NAME,
};
use crate::errors::TransportError;
use crate::fragment::FragmentAssembler;
use crate::keepalive::{IdleAction, IdleMonitor};
use crate::transport::{
    CloseEvent, CloseInitiator, SignalingTransport, SignalingTransportFactory, TransportEvent,
};

use async_trait::async_trait;
use bytes::Bytes;
use common::error::SignalingError;
use futures::{Sink, SinkExt, Stream, StreamExt};
use secrecy::ExposeSecret;
use signal_proto::signal::{signal_frame, SignalFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{
    HeaderName, HeaderValue, COOKIE, SEC_WEBSOCKET_PROTOCOL,
};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

/// How often the keepalive monitor is consulted.
const KEEPALIVE_CHECK_PERIOD: Duration = Duration::from_secs(1);

/// Close description when this client ends the connection.
const CLOSED_BY_CLIENT: &str = "Connection closed by client";

/// Close code reported when the server's close frame carries none.
const NO_STATUS_CODE: u16 = 1005;

/// A bidirectional websocket message stream.
pub trait WebsocketIo:
    Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError>
{
}

impl<T> WebsocketIo for T where
    T: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError>
{
}

/// Type-erased websocket returned by a [`WebsocketConnector`].
pub type BoxedWebsocket = Box<dyn WebsocketIo + Send + Unpin>;

/// Opens websocket connections.
#[async_trait]
pub trait WebsocketConnector: Send + Sync {
    async fn connect(&self, config: &WebsocketConfig) -> Result<BoxedWebsocket, TransportError>;
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    /// Build the upgrade request: subprotocol, session cookie, protocol
    /// version and any configured extra headers.
    pub fn build_request(
        config: &WebsocketConfig,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, TransportError> {
        let mut request = config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let headers = request.headers_mut();
        headers.insert(SEC_WEBSOCKET_PROTOCOL, header_value(&config.protocol_name)?);
        headers.insert(
            COOKIE,
            header_value(&format!(
                "{SESSION_COOKIE_NAME}={}",
                config.session_token.expose_secret()
            ))?,
        );
        headers.insert(
            HeaderName::from_static(CONTROL_PROTOCOL_VERSION_HEADER),
            HeaderValue::from_static(CONTROL_PROTOCOL_VERSION),
        );

        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidHeader(format!("{name}: {e}")))?;
            headers.insert(name, header_value(value)?);
        }

        Ok(request)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader(e.to_string()))
}

#[async_trait]
impl WebsocketConnector for TungsteniteConnector {
    async fn connect(&self, config: &WebsocketConfig) -> Result<BoxedWebsocket, TransportError> {
        let request = Self::build_request(config)?;
        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Box::new(stream))
    }
}

/// Builds [`WebsocketSignalingTransport`]s sharing one config and connector.
#[derive(Clone)]
pub struct WebsocketTransportFactory {
    config: WebsocketConfig,
    connector: Arc<dyn WebsocketConnector>,
}

impl WebsocketTransportFactory {
    /// Factory connecting with [`TungsteniteConnector`].
    #[must_use]
    pub fn new(config: WebsocketConfig) -> Self {
        Self::with_connector(config, Arc::new(TungsteniteConnector))
    }

    #[must_use]
    pub fn with_connector(config: WebsocketConfig, connector: Arc<dyn WebsocketConnector>) -> Self {
        Self { config, connector }
    }
}

impl SignalingTransportFactory for WebsocketTransportFactory {
    fn create(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Box<dyn SignalingTransport> {
        Box::new(WebsocketSignalingTransport::new(
            self.config.clone(),
            Arc::clone(&self.connector),
            events,
        ))
    }
}

struct RunningConnection {
    outbound: mpsc::UnboundedSender<Bytes>,
    cancel_token: CancellationToken,
}

/// Websocket-backed signaling transport.
///
/// Must be started from within a tokio runtime.
pub struct WebsocketSignalingTransport {
    config: WebsocketConfig,
    connector: Arc<dyn WebsocketConnector>,
    events: mpsc::UnboundedSender<TransportEvent>,
    running: Option<RunningConnection>,
}

impl WebsocketSignalingTransport {
    #[must_use]
    pub fn new(
        config: WebsocketConfig,
        connector: Arc<dyn WebsocketConnector>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            config,
            connector,
            events,
            running: None,
        }
    }

    /// Whether a connection task has been started and not stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn enqueue_frame(&self, frame: &SignalFrame) -> Result<(), TransportError> {
        let envelope: Bytes = encode_envelope(frame)?;
        let running = self.running.as_ref().ok_or(TransportError::Closed)?;
        running
            .outbound
            .send(envelope)
            .map_err(|_| TransportError::Closed)
    }
}

impl SignalingTransport for WebsocketSignalingTransport {
    fn start(&mut self) {
        if self.running.is_some() {
            debug!(target: "signaling.transport", "Transport already started");
            return;
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        let task = ConnectionTask {
            config: self.config.clone(),
            connector: Arc::clone(&self.connector),
            events: self.events.clone(),
            outbound: outbound_rx,
            cancel_token: cancel_token.clone(),
        };
        tokio::spawn(task.run());

        info!(target: "signaling.transport", url = %self.config.url, "Transport started");

        self.running = Some(RunningConnection {
            outbound: outbound_tx,
            cancel_token,
        });
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            info!(target: "signaling.transport", "Stopping transport");
            running.cancel_token.cancel();
        }
    }

    fn send_signal_frame(&mut self, mut frame: SignalFrame) -> bool {
        frame.timestamp_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);

        let type_name = frame_type_name(&frame);
        if frame.frame_type() == Some(signal_frame::Type::ClientMetric) {
            trace!(target: "signaling.transport", frame_type = type_name, "Sending signal frame");
        } else {
            info!(target: "signaling.transport", frame_type = type_name, "Sending signal frame");
        }

        match self.enqueue_frame(&frame) {
            Ok(()) => true,
            Err(TransportError::Codec(e)) => {
                error!(
                    target: "signaling.transport",
                    frame_type = type_name,
                    error = %e,
                    "Failed to serialize signal frame"
                );
                false
            }
            Err(e) => {
                warn!(
                    target: "signaling.transport",
                    frame_type = type_name,
                    error = %e,
                    "Dropping signal frame, transport is not running"
                );
                true
            }
        }
    }
}

impl Drop for WebsocketSignalingTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

fn frame_type_name(frame: &SignalFrame) -> &'static str {
    frame
        .frame_type()
        .map_or("UNKNOWN", |frame_type| frame_type.as_str_name())
}

/// Owns the socket for one transport run.
struct ConnectionTask {
    config: WebsocketConfig,
    connector: Arc<dyn WebsocketConnector>,
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: mpsc::UnboundedReceiver<Bytes>,
    cancel_token: CancellationToken,
}

impl ConnectionTask {
    #[instrument(skip_all, name = "signaling.websocket", fields(url = %self.config.url))]
    async fn run(mut self) {
        let Some(websocket) = self.connect_with_retry().await else {
            return;
        };

        info!(target: "signaling.websocket", "Websocket connected");
        self.emit(TransportEvent::Connected);

        self.drive(websocket).await;
        debug!(target: "signaling.websocket", "Connection task exiting");
    }

    /// Connect, backing off between failures. `None` means a terminal event
    /// has already been emitted.
    async fn connect_with_retry(&mut self) -> Option<BoxedWebsocket> {
        let mut failures = 0usize;

        loop {
            let attempt = tokio::select! {
                () = self.cancel_token.cancelled() => {
                    self.emit_closed(CloseInitiator::Client, CLOSED_BY_CLIENT.to_string());
                    return None;
                }
                result = self.connector.connect(&self.config) => result,
            };

            let e = match attempt {
                Ok(websocket) => return Some(websocket),
                Err(e) => e,
            };

            failures += 1;
            let delay = self
                .config
                .retry
                .delay_after_failure(failures, &mut rand::thread_rng());

            let Some(delay) = delay else {
                error!(
                    target: "signaling.websocket",
                    attempts = failures,
                    error = %e,
                    "Websocket connection failed, giving up"
                );
                self.emit(TransportEvent::Error(SignalingError::client_fatal(format!(
                    "Websocket connection failed after {failures} attempts: {e}"
                ))));
                return None;
            };

            warn!(
                target: "signaling.websocket",
                attempt = failures,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %e,
                "Websocket connection failed, retrying"
            );

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    self.emit_closed(CloseInitiator::Client, CLOSED_BY_CLIENT.to_string());
                    return None;
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn drive(&mut self, websocket: BoxedWebsocket) {
        let (mut sink, mut stream) = websocket.split();
        let mut assembler = FragmentAssembler::new();
        let mut idle = IdleMonitor::new(
            self.config.ping_interval,
            self.config.idle_timeout,
            Instant::now(),
        );
        let mut keepalive = tokio::time::interval(KEEPALIVE_CHECK_PERIOD);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        debug!(target: "signaling.websocket", error = %e, "Close frame not sent");
                    }
                    self.emit_closed(CloseInitiator::Client, CLOSED_BY_CLIENT.to_string());
                    return;
                }

                Some(envelope) = self.outbound.recv() => {
                    if let Err(e) = sink.send(Message::Binary(envelope.to_vec())).await {
                        self.emit_fatal(format!("Websocket write failed: {e}"));
                        return;
                    }
                }

                message = stream.next() => {
                    match message {
                        Some(Ok(message)) => {
                            idle.record_activity(Instant::now());
                            if self.handle_message(message, &mut assembler) {
                                return;
                            }
                        }
                        Some(Err(e)) => {
                            self.emit_fatal(format!("Websocket read failed: {e}"));
                            return;
                        }
                        None => {
                            self.emit_fatal("Websocket stream ended".to_string());
                            return;
                        }
                    }
                }

                _ = keepalive.tick() => {
                    match idle.check(Instant::now()) {
                        IdleAction::None => {}
                        IdleAction::SendPing => {
                            trace!(target: "signaling.websocket", "Sending keepalive ping");
                            if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                                self.emit_fatal(format!("Websocket ping failed: {e}"));
                                return;
                            }
                        }
                        IdleAction::HangUp => {
                            if let Err(e) = sink.send(Message::Close(None)).await {
                                debug!(target: "signaling.websocket", error = %e, "Close frame not sent");
                            }
                            self.emit_fatal(format!(
                                "No traffic for {}s, connection considered dead",
                                self.config.idle_timeout.as_secs()
                            ));
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Handle one inbound message. Returns true once the connection is over.
    fn handle_message(&self, message: Message, assembler: &mut FragmentAssembler) -> bool {
        match message {
            Message::Binary(data) => {
                if assembler.pending_len() > 0 {
                    warn!(
                        target: "signaling.websocket",
                        pending = assembler.pending_len(),
                        "Whole message interrupted a fragmented one, discarding fragments"
                    );
                    assembler.clear();
                }
                if let Some(complete) = assembler.push(&data, true) {
                    self.deliver(&complete);
                }
                false
            }
            // tungstenite reassembles continuation frames before `next()`
            // returns, so raw frames only arrive from connectors that hand
            // them through unassembled, such as in-memory sockets.
            Message::Frame(frame) => {
                let is_final = frame.header().is_final;
                if let Some(complete) = assembler.push(&frame.into_data(), is_final) {
                    self.deliver(&complete);
                }
                false
            }
            Message::Close(close_frame) => {
                let code = close_frame.map_or(NO_STATUS_CODE, |f| u16::from(f.code));
                info!(target: "signaling.websocket", code, "Websocket closed by server");
                self.emit_closed(
                    CloseInitiator::Server,
                    format!("Websocket closed with status: {code}"),
                );
                true
            }
            Message::Ping(_) | Message::Pong(_) => false,
            Message::Text(_) => {
                warn!(target: "signaling.websocket", "Ignoring text message on signaling channel");
                false
            }
        }
    }

    fn deliver(&self, data: &[u8]) {
        match decode_envelope(data) {
            Ok(frame) => {
                let type_name = frame_type_name(&frame);
                match frame.frame_type() {
                    Some(signal_frame::Type::Bitrates | signal_frame::Type::AudioMetadata) => {
                        trace!(target: "signaling.transport", frame_type = type_name, "Received signal frame");
                    }
                    _ => {
                        info!(target: "signaling.transport", frame_type = type_name, "Received signal frame");
                    }
                }
                self.emit(TransportEvent::FrameReceived(frame));
            }
            Err(CodecError::InsufficientData) => {
                debug!(target: "signaling.transport", len = data.len(), "Ignoring short message");
            }
            Err(e) => {
                error!(target: "signaling.transport", error = %e, "Failed to decode signal frame");
            }
        }
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!(target: "signaling.websocket", "Event receiver gone");
        }
    }

    fn emit_fatal(&self, description: String) {
        error!(target: "signaling.websocket", %description, "Websocket connection failed");
        self.emit(TransportEvent::Error(SignalingError::client_fatal(description)));
    }

    fn emit_closed(&self, initiator: CloseInitiator, description: String) {
        self.emit(TransportEvent::Closed(CloseEvent {
            initiator,
            description,
        }));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config() -> WebsocketConfig {
        let mut config = WebsocketConfig::new(
            "wss://signal.example.com/control/meeting-1",
            SecretString::from("join-token-1"),
        );
        config.headers.push(("User-Agent".to_string(), "signaling-client".to_string()));
        config
    }

    #[test]
    fn test_request_headers() {
        let request = TungsteniteConnector::build_request(&config()).unwrap();
        let headers = request.headers();

        assert_eq!(headers.get(COOKIE).unwrap(), "_aws_wt_session=join-token-1");
        assert_eq!(headers.get(SEC_WEBSOCKET_PROTOCOL).unwrap(), "Signaling-SDK");
        assert_eq!(headers.get(CONTROL_PROTOCOL_VERSION_HEADER).unwrap(), "3");
        assert_eq!(headers.get("user-agent").unwrap(), "signaling-client");
    }

    #[test]
    fn test_request_rejects_bad_url() {
        let mut config = config();
        config.url = "not a url".to_string();

        assert!(matches!(
            TungsteniteConnector::build_request(&config),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_request_rejects_bad_header() {
        let mut config = config();
        config.headers.push(("bad header".to_string(), "x".to_string()));

        assert!(matches!(
            TungsteniteConnector::build_request(&config),
            Err(TransportError::InvalidHeader(_))
        ));
    }

    #[tokio::test]
    async fn test_send_before_start_is_dropped() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let mut transport =
            WebsocketSignalingTransport::new(config(), Arc::new(TungsteniteConnector), events_tx);

        assert!(transport.send_signal_frame(SignalFrame::of_type(signal_frame::Type::Leave)));
        assert!(!transport.is_running());
    }

    #[tokio::test]
    async fn test_enqueue_without_connection_reports_closed() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let transport =
            WebsocketSignalingTransport::new(config(), Arc::new(TungsteniteConnector), events_tx);

        let frame = SignalFrame::of_type(signal_frame::Type::Join);
        assert!(matches!(
            transport.enqueue_frame(&frame),
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let mut transport =
            WebsocketSignalingTransport::new(config(), Arc::new(TungsteniteConnector), events_tx);

        transport.stop();
        transport.stop();
        assert!(!transport.is_running());
    }
}
