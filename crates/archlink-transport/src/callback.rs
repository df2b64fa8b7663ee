//! Callback adapter for hosts that cannot consume Rust traits directly.
//!
//! Embedding hosts (scripting runtimes, game engines, FFI shims) register
//! four opaque callback handles instead of implementing
//! [`TransportHandler`]. The bridge translates connection events into
//! those calls:
//!
//! - errors become an [`ErrorPayload`] `(message, stack)` pair,
//! - [`TransportError::Aggregate`] is unwrapped so the host receives one
//!   error callback per contained error.
//!
//! The bridge sits behind the same [`Transport`] interface as any native
//! handler, so nothing above the transport knows it exists.

use std::error::Error as _;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{ConnectionState, Transport, TransportError, TransportHandler};

type OpenFn = Box<dyn Fn() + Send + Sync>;
type CloseFn = Box<dyn Fn() + Send + Sync>;
type ErrorFn = Box<dyn Fn(ErrorPayload) + Send + Sync>;
type MessageFn = Box<dyn Fn(String) + Send + Sync>;

/// An error flattened for a foreign host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    /// The error's own message.
    pub message: String,
    /// The rendered source chain, one `caused by:` line per cause.
    pub stack: String,
}

impl ErrorPayload {
    /// Renders a single (non-aggregate) error.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut stack = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            stack.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            stack: stack.join("\n"),
        }
    }
}

/// The callback handles a host registers.
///
/// Any handle may be left unset; the matching event is then ignored.
#[derive(Default)]
pub struct ForeignCallbacks {
    on_open: Option<OpenFn>,
    on_close: Option<CloseFn>,
    on_error: Option<ErrorFn>,
    on_message: Option<MessageFn>,
}

impl ForeignCallbacks {
    /// Creates an empty set of callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Box::new(f));
        self
    }

    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    pub fn on_error(
        mut self,
        f: impl Fn(ErrorPayload) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_message(
        mut self,
        f: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for ForeignCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignCallbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

/// A [`TransportHandler`] that forwards events to [`ForeignCallbacks`].
///
/// Also records the last observed [`ConnectionState`] so hosts can poll it
/// without holding a connection handle.
#[derive(Debug)]
pub struct CallbackBridge {
    callbacks: ForeignCallbacks,
    state: Mutex<ConnectionState>,
}

impl CallbackBridge {
    pub fn new(callbacks: ForeignCallbacks) -> Self {
        Self {
            callbacks,
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    /// The state implied by the events seen so far.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Reports `error` to the host, once per leaf error.
    pub fn report(&self, error: &TransportError) {
        let Some(on_error) = &self.callbacks.on_error else {
            return;
        };
        for leaf in error.leaves() {
            on_error(ErrorPayload::from_error(leaf));
        }
    }
}

impl TransportHandler for CallbackBridge {
    fn on_open(&self) {
        self.set_state(ConnectionState::Open);
        if let Some(f) = &self.callbacks.on_open {
            f();
        }
    }

    fn on_close(&self) {
        self.set_state(ConnectionState::Closed);
        if let Some(f) = &self.callbacks.on_close {
            f();
        }
    }

    fn on_error(&self, error: &TransportError) {
        self.report(error);
    }

    fn on_message(&self, message: &str) {
        if let Some(f) = &self.callbacks.on_message {
            f(message.to_owned());
        }
    }
}

/// Wraps any [`Transport`] so connections report to foreign callbacks.
#[derive(Debug, Clone)]
pub struct CallbackTransport<T> {
    inner: T,
}

impl<T: Transport> CallbackTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Connects through the wrapped transport. Returns the connection and
    /// the bridge delivering its events.
    ///
    /// A failed connect is also reported through the error callback, so a
    /// host that only watches callbacks still learns about it.
    pub async fn connect(
        &self,
        url: &str,
        callbacks: ForeignCallbacks,
    ) -> Result<(T::Connection, Arc<CallbackBridge>), T::Error>
    where
        T::Error: 'static,
    {
        let bridge = Arc::new(CallbackBridge::new(callbacks));
        bridge.set_state(ConnectionState::Connecting);
        match self.inner.connect(url, bridge.clone()).await {
            Ok(conn) => Ok((conn, bridge)),
            Err(e) => {
                bridge.set_state(ConnectionState::Closed);
                if let Some(on_error) = &bridge.callbacks.on_error {
                    on_error(ErrorPayload::from_error(&e));
                }
                Err(e)
            }
        }
    }
}
