//! # Signaling Test Utilities
//!
//! Mocks and fixtures for testing the signaling transport and session
//! without a signaling server.
//!
//! ## Modules
//!
//! - `mock_transport` - Scriptable [`SignalingTransport`](signaling_transport::SignalingTransport)
//!   that records sent frames and lets tests inject events
//! - `mock_websocket` - In-memory websocket and connector for transport tests
//! - `recording_observer` - Observer that records every callback
//! - `fixtures` - Client configuration and inbound frame builders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use signaling_test_utils::*;
//!
//! let factory = MockTransportFactory::new();
//! let observers = Arc::new(ObserverRegistry::new());
//! let recorder = RecordingObserver::new();
//! observers.add(recorder.clone());
//!
//! let mut session = SignalingSession::new(test_client_config(), factory.clone(), observers);
//! session.start();
//! factory.inject(TransportEvent::Connected);
//! ```

pub mod fixtures;
pub mod mock_transport;
pub mod mock_websocket;
pub mod recording_observer;

pub use fixtures::*;
pub use mock_transport::*;
pub use mock_websocket::*;
pub use recording_observer::*;
