//! Unified error type for Archlink.

use archlink_bounce::BounceError;
use archlink_protocol::ProtocolError;
use archlink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `archlink` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]` attribute
/// on each variant generates `From` impls, so `?` converts sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum ArchlinkError {
    /// A transport-level error (connect, send, close).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A feature could not send its packets.
    #[error(transparent)]
    Bounce(#[from] BounceError),

    /// Configuration could not be loaded.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    /// Tracing could not be installed.
    #[error("failed to initialize tracing: {0}")]
    Tracing(String),
}
