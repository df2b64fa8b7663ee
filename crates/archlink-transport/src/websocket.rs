//! WebSocket client transport using `tokio-tungstenite`.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::{Data, OpCode};
use tokio_tungstenite::tungstenite::protocol::frame::Frame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::state::StateCell;
use crate::{
    split_message, Connection, ConnectionId, ConnectionState, FrameAssembler,
    Transport, TransportConfig, TransportError, TransportHandler,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// A WebSocket-based [`Transport`] that opens client connections.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    chunk_size: NonZeroUsize,
    max_message_size: usize,
}

impl WebSocketTransport {
    /// Creates a transport with the given configuration.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidConfig`] for zero-sized limits.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let chunk_size = config.validate()?;
        Ok(Self {
            chunk_size,
            max_message_size: config.max_message_size,
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn connect(
        &self,
        url: &str,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<Self::Connection, Self::Error> {
        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        let state = StateCell::new(ConnectionState::Connecting);
        tracing::debug!(%id, url, "connecting");

        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| {
                TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;
        let (sink, source) = ws.split();

        let shared = Arc::new(Shared {
            id,
            state,
            sink: Mutex::new(sink),
            close_emitted: AtomicBool::new(false),
            handler,
        });

        shared.state.set(ConnectionState::Open);
        tracing::info!(%id, url, "connection open");
        shared.handler.on_open();

        let receiver = tokio::spawn(receive_loop(
            Arc::clone(&shared),
            source,
            FrameAssembler::new(self.max_message_size),
        ));

        Ok(WebSocketConnection {
            shared,
            chunk_size: self.chunk_size,
            receiver,
        })
    }
}

/// State shared between a [`WebSocketConnection`] and its receive task.
struct Shared {
    id: ConnectionId,
    state: StateCell,
    /// Held for the duration of a whole message so slices never interleave.
    sink: Mutex<WsSink>,
    close_emitted: AtomicBool,
    handler: Arc<dyn TransportHandler>,
}

impl Shared {
    fn ensure_open(&self) -> Result<(), TransportError> {
        let state = self.state.get();
        if state.is_open() {
            Ok(())
        } else {
            Err(TransportError::not_open(state))
        }
    }

    /// Moves to `Closed` and fires `on_close`, at most once.
    fn finish(&self) {
        self.state.set(ConnectionState::Closed);
        if !self.close_emitted.swap(true, Ordering::AcqRel) {
            tracing::info!(id = %self.id, "connection closed");
            self.handler.on_close();
        }
    }

    /// Flushes the queued close reply. The peer may already be gone, so
    /// failures here are only logged.
    async fn acknowledge_close(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            tracing::debug!(id = %self.id, error = %e, "close acknowledgement failed");
        }
    }

    fn deliver(
        &self,
        assembler: &mut FrameAssembler,
        fragment: &[u8],
        is_final: bool,
    ) {
        match assembler.push(fragment, is_final) {
            Ok(Some(message)) => self.handler.on_message(&message),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "dropping incoming message");
                self.handler.on_error(&e);
            }
        }
    }
}

/// Reads messages until the stream ends, the peer closes, or an error occurs.
///
/// tungstenite reassembles continuation frames before yielding, so text
/// and binary messages arrive whole and go through the assembler as a
/// single final fragment; on a live connection it only applies the size
/// limit and the UTF-8 check. The multi-fragment path serves streams that
/// yield raw `Frame`s.
async fn receive_loop(
    shared: Arc<Shared>,
    mut source: WsSource,
    mut assembler: FrameAssembler,
) {
    while let Some(next) = source.next().await {
        match next {
            Ok(Message::Text(text)) => {
                shared.deliver(&mut assembler, text.as_bytes(), true);
            }
            Ok(Message::Binary(data)) => {
                shared.deliver(&mut assembler, &data, true);
            }
            Ok(Message::Frame(frame)) => {
                let is_final = frame.header().is_final;
                shared.deliver(&mut assembler, frame.payload(), is_final);
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(frame)) => {
                tracing::debug!(id = %shared.id, ?frame, "peer sent close");
                shared.state.set(ConnectionState::Closing);
                shared.acknowledge_close().await;
                break;
            }
            Err(tungstenite::Error::ConnectionClosed) => break,
            Err(e) => {
                let error = TransportError::ReceiveFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    e,
                ));
                tracing::warn!(id = %shared.id, error = %error, "receive loop failed");
                shared.handler.on_error(&error);
                break;
            }
        }
    }
    shared.finish();
}

/// A single WebSocket client connection.
///
/// Dropping the connection stops its receive task without firing
/// `on_close`; call [`close`](Connection::close) for a graceful shutdown.
pub struct WebSocketConnection {
    shared: Arc<Shared>,
    chunk_size: NonZeroUsize,
    receiver: JoinHandle<()>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, message: &str) -> Result<(), Self::Error> {
        self.shared.ensure_open()?;
        let mut sink = self.shared.sink.lock().await;
        // A close may have won the race for the lock.
        self.shared.ensure_open()?;

        for (index, slice) in
            split_message(message.as_bytes(), self.chunk_size).enumerate()
        {
            let opcode = if index == 0 {
                OpCode::Data(Data::Text)
            } else {
                OpCode::Data(Data::Continue)
            };
            let frame = Frame::message(slice.data.to_vec(), opcode, slice.is_final);
            sink.feed(Message::Frame(frame)).await.map_err(send_failed)?;
        }
        sink.flush().await.map_err(send_failed)?;

        tracing::trace!(id = %self.shared.id, len = message.len(), "message sent");
        Ok(())
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if !self
            .shared
            .state
            .transition(ConnectionState::Open, ConnectionState::Closing)
        {
            return Err(TransportError::not_open(self.shared.state.get()));
        }
        tracing::debug!(id = %self.shared.id, "closing connection");
        let mut sink = self.shared.sink.lock().await;
        match sink.close().await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(send_failed(e)),
        }
    }

    fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    fn id(&self) -> ConnectionId {
        self.shared.id
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

fn send_failed(e: tungstenite::Error) -> TransportError {
    TransportError::SendFailed(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        e,
    ))
}
