//! In-memory websocket for transport tests.
//!
//! [`mock_websocket_pair`] returns the client end, which the transport
//! drives through a [`MockConnector`], and a [`MockWebsocketPeer`] that
//! plays the server.

use async_trait::async_trait;
use futures::{Sink, Stream};
use signal_proto::signal::SignalFrame;
use signaling_transport::{
    decode_envelope, encode_envelope, BoxedWebsocket, TransportError, WebsocketConfig,
    WebsocketConnector,
};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::{CloseCode, Data, OpCode};
use tokio_tungstenite::tungstenite::protocol::frame::Frame;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Client end of an in-memory websocket.
#[derive(Debug)]
pub struct MockWebsocket {
    incoming: mpsc::UnboundedReceiver<Result<Message, WsError>>,
    outgoing: mpsc::UnboundedSender<Message>,
}

/// Server end of an in-memory websocket.
#[derive(Debug)]
pub struct MockWebsocketPeer {
    to_client: Option<mpsc::UnboundedSender<Result<Message, WsError>>>,
    from_client: mpsc::UnboundedReceiver<Message>,
}

/// Create a connected client/server pair.
#[must_use]
pub fn mock_websocket_pair() -> (MockWebsocket, MockWebsocketPeer) {
    let (to_client, incoming) = mpsc::unbounded_channel();
    let (outgoing, from_client) = mpsc::unbounded_channel();
    (
        MockWebsocket { incoming, outgoing },
        MockWebsocketPeer {
            to_client: Some(to_client),
            from_client,
        },
    )
}

impl Stream for MockWebsocket {
    type Item = Result<Message, WsError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.incoming.poll_recv(cx)
    }
}

impl Sink<Message> for MockWebsocket {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        self.outgoing
            .send(item)
            .map_err(|_| WsError::ConnectionClosed)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

impl MockWebsocketPeer {
    /// Send a raw message to the client.
    ///
    /// # Panics
    ///
    /// Panics after [`hang_up`](Self::hang_up).
    pub fn send(&self, message: Message) {
        let _ = self
            .to_client
            .as_ref()
            .expect("peer already hung up")
            .send(Ok(message));
    }

    /// Send a frame in a single binary message.
    pub fn send_frame(&self, frame: &SignalFrame) {
        let envelope = encode_envelope(frame).expect("encode frame");
        self.send(Message::Binary(envelope.to_vec()));
    }

    /// Send a frame split across `chunks` websocket fragments.
    pub fn send_fragmented(&self, frame: &SignalFrame, chunks: usize) {
        let envelope = encode_envelope(frame).expect("encode frame").to_vec();
        let chunk_len = envelope.len().div_ceil(chunks.max(1));
        let pieces: Vec<&[u8]> = envelope.chunks(chunk_len).collect();
        let last = pieces.len() - 1;

        for (i, piece) in pieces.into_iter().enumerate() {
            let opcode = if i == 0 {
                OpCode::Data(Data::Binary)
            } else {
                OpCode::Data(Data::Continue)
            };
            self.send(Message::Frame(Frame::message(piece.to_vec(), opcode, i == last)));
        }
    }

    /// Send a close frame with `code`.
    pub fn close(&self, code: u16) {
        self.send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        })));
    }

    /// Drop the connection without a close frame.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// Next message written by the client.
    pub async fn recv(&mut self) -> Option<Message> {
        self.from_client.recv().await
    }

    /// Next signal frame written by the client, skipping control messages.
    pub async fn recv_frame(&mut self) -> Option<SignalFrame> {
        while let Some(message) = self.from_client.recv().await {
            if let Message::Binary(data) = message {
                return Some(decode_envelope(&data).expect("decode client frame"));
            }
        }
        None
    }
}

enum ScriptedConnect {
    Fail(String),
    Succeed(MockWebsocket),
}

/// Connector that returns scripted outcomes in order and fails once the
/// script runs out.
#[derive(Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<ScriptedConnect>>,
    attempts: AtomicUsize,
}

impl MockConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failed connection attempt.
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedConnect::Fail(reason.into()));
    }

    /// Script a successful attempt and return the server end of its socket.
    pub fn push_websocket(&self) -> MockWebsocketPeer {
        let (client, peer) = mock_websocket_pair();
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedConnect::Succeed(client));
        peer
    }

    /// Connection attempts made so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebsocketConnector for MockConnector {
    async fn connect(&self, _config: &WebsocketConfig) -> Result<BoxedWebsocket, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(ScriptedConnect::Succeed(websocket)) => Ok(Box::new(websocket)),
            Some(ScriptedConnect::Fail(reason)) => Err(TransportError::Connect(reason)),
            None => Err(TransportError::Connect("connection refused".to_string())),
        }
    }
}
