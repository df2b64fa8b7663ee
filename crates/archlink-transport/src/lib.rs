//! Transport layer for Archlink.
//!
//! Delivers whole JSON text messages between the client and the
//! multiworld server, byte-exact, in both directions:
//!
//! - **Framing** ([`split_message`], [`FrameAssembler`]): large outgoing
//!   messages are cut into bounded slices; incoming fragments are buffered
//!   until the end-of-message marker.
//! - **Connection** ([`Transport`], [`Connection`]): connect, send, close,
//!   with a [`ConnectionState`] lifecycle.
//! - **Events** ([`TransportHandler`]): open / close / error / message
//!   callbacks invoked from the connection's receive task.
//! - **Foreign hosts** ([`CallbackBridge`]): the same events delivered
//!   through opaque callback handles with `(message, stack)` error payloads.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod callback;
mod config;
mod error;
mod framing;
mod state;
#[cfg(feature = "websocket")]
mod websocket;

pub use callback::{CallbackBridge, CallbackTransport, ErrorPayload, ForeignCallbacks};
pub use config::TransportConfig;
pub use error::TransportError;
pub use framing::{split_message, FrameAssembler, Slice, Slices};
pub use state::ConnectionState;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::sync::Arc;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Receives connection events.
///
/// Every method runs on the connection's receive task. Nothing is queued in
/// between: a handler that blocks stalls delivery of the next frame, so
/// long-running work should be handed off elsewhere.
pub trait TransportHandler: Send + Sync + 'static {
    /// The connection reached the `Open` state.
    fn on_open(&self) {}

    /// The connection reached the `Closed` state. Fires exactly once.
    fn on_close(&self) {}

    /// A receive or reassembly error occurred.
    fn on_error(&self, error: &TransportError) {
        let _ = error;
    }

    /// A complete text message arrived.
    fn on_message(&self, message: &str);
}

impl<H: TransportHandler + ?Sized> TransportHandler for Arc<H> {
    fn on_open(&self) {
        (**self).on_open()
    }

    fn on_close(&self) {
        (**self).on_close()
    }

    fn on_error(&self, error: &TransportError) {
        (**self).on_error(error)
    }

    fn on_message(&self, message: &str) {
        (**self).on_message(message)
    }
}

/// Opens outgoing connections to a server.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Connects to `url` and starts delivering events to `handler`.
    async fn connect(
        &self,
        url: &str,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<Self::Connection, Self::Error>;
}

/// A single open connection.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one whole text message.
    ///
    /// Concurrent callers never interleave slices of different messages.
    /// Fails immediately if the connection is not open.
    async fn send(&self, message: &str) -> Result<(), Self::Error>;

    /// Starts a graceful close. The handler's `on_close` fires once the
    /// peer acknowledges or the stream ends.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
