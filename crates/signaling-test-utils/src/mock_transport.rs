//! Mock signaling transport.
//!
//! Every transport created by a [`MockTransportFactory`] shares one
//! [`MockTransportState`], so a test can inspect frames sent across
//! restarts and inject events into whichever transport is current.

use signal_proto::signal::{signal_frame, SignalFrame};
use signaling_transport::{
    CloseEvent, CloseInitiator, SignalingTransport, SignalingTransportFactory, TransportEvent,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// State shared by a factory and the transports it created.
#[derive(Debug, Default)]
pub struct MockTransportState {
    /// Number of transports created.
    pub created: usize,
    pub starts: usize,
    pub stops: usize,
    /// Frames passed to `send_signal_frame`, in order, across all transports.
    pub sent: Vec<SignalFrame>,
    /// Event sender of the most recently created transport.
    pub events: Option<mpsc::UnboundedSender<TransportEvent>>,
    /// When set, `stop` reports a client close like the websocket transport.
    pub emit_close_on_stop: bool,
}

/// Transport that records calls instead of connecting.
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    running: bool,
}

impl SignalingTransport for MockTransport {
    fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.state.lock().unwrap().starts += 1;
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        let emit_close = {
            let mut state = self.state.lock().unwrap();
            state.stops += 1;
            state.emit_close_on_stop
        };
        if emit_close {
            let _ = self.events.send(TransportEvent::Closed(CloseEvent {
                initiator: CloseInitiator::Client,
                description: "Connection closed by client".to_string(),
            }));
        }
    }

    fn send_signal_frame(&mut self, frame: SignalFrame) -> bool {
        self.state.lock().unwrap().sent.push(frame);
        true
    }
}

/// Factory producing [`MockTransport`]s.
#[derive(Debug, Clone, Default)]
pub struct MockTransportFactory {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransportFactory {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Factory whose transports emit `Closed { Client }` when stopped.
    #[must_use]
    pub fn closing_on_stop() -> Arc<Self> {
        let factory = Self::default();
        factory.state.lock().unwrap().emit_close_on_stop = true;
        Arc::new(factory)
    }

    /// Deliver an event as if the current transport had produced it.
    ///
    /// # Panics
    ///
    /// Panics if no transport has been created.
    pub fn inject(&self, event: TransportEvent) {
        let sender = self
            .state
            .lock()
            .unwrap()
            .events
            .clone()
            .expect("no transport created");
        sender.send(event).expect("event receiver dropped");
    }

    /// Inject a received frame.
    pub fn inject_frame(&self, frame: SignalFrame) {
        self.inject(TransportEvent::FrameReceived(frame));
    }

    /// Event sender of the current transport, for holding across a restart.
    #[must_use]
    pub fn current_sender(&self) -> Option<mpsc::UnboundedSender<TransportEvent>> {
        self.state.lock().unwrap().events.clone()
    }

    #[must_use]
    pub fn created(&self) -> usize {
        self.state.lock().unwrap().created
    }

    #[must_use]
    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    #[must_use]
    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    /// All frames sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SignalFrame> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Sent frames of one type.
    #[must_use]
    pub fn sent_of_type(&self, frame_type: signal_frame::Type) -> Vec<SignalFrame> {
        self.sent()
            .into_iter()
            .filter(|frame| frame.frame_type() == Some(frame_type))
            .collect()
    }

    /// The most recent frame of a type.
    ///
    /// # Panics
    ///
    /// Panics if no such frame was sent.
    #[must_use]
    pub fn last_sent(&self, frame_type: signal_frame::Type) -> SignalFrame {
        self.sent_of_type(frame_type)
            .pop()
            .unwrap_or_else(|| panic!("no {} frame sent", frame_type.as_str_name()))
    }

    pub fn clear_sent(&self) {
        self.state.lock().unwrap().sent.clear();
    }
}

impl SignalingTransportFactory for MockTransportFactory {
    fn create(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Box<dyn SignalingTransport> {
        {
            let mut state = self.state.lock().unwrap();
            state.created += 1;
            state.events = Some(events.clone());
        }
        Box::new(MockTransport {
            state: Arc::clone(&self.state),
            events,
            running: false,
        })
    }
}
