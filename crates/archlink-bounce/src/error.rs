//! Error types for the dispatch and bounce layer.

use archlink_protocol::ProtocolError;

/// Errors returned when a feature tries to send packets.
///
/// Incoming-side problems (unknown packets, malformed DeathLink payloads)
/// are never errors here: they are logged or audited and dropped.
#[derive(Debug, thiserror::Error)]
pub enum BounceError {
    /// The connection is not open; nothing was sent.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The outbound queue already holds this many messages; nothing was
    /// queued.
    #[error("outbound queue is full ({0} messages)")]
    QueueFull(usize),

    /// The packets could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The underlying sender failed for another reason.
    #[error("send failed: {0}")]
    SendFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}
