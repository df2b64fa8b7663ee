//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// A `ProtocolError` always concerns a whole message. Problems with a
/// single element of a packet batch are not errors; they are reported as
/// [`SkippedPacket`](crate::SkippedPacket)s so the rest of the batch still
/// goes through.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning packets into JSON text).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The message was not a JSON array of objects.
    ///
    /// Common causes: malformed JSON, a truncated message, or a top-level
    /// value that is not an array.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}
