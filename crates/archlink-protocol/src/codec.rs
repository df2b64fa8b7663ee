//! Encoding and decoding packet batches.
//!
//! Decoding is tolerant at the element level: a batch is only rejected as a
//! whole when the message is not a JSON array. Inside the array, elements
//! with a missing or unknown `cmd`, or with fields that don't match their
//! kind, are set aside as [`SkippedPacket`]s and the remaining elements are
//! still returned, in their original order.

use serde_json::Value;

use crate::{Packet, ProtocolError};

/// Why an element of a batch did not become a [`Packet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The element had no string `cmd` field.
    MissingCommand,
    /// The `cmd` names a kind this client does not handle.
    UnknownCommand(String),
    /// The kind is known but its fields did not decode.
    Malformed { cmd: String, error: String },
}

/// An element of a batch that was set aside during decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPacket {
    /// Position of the element in the incoming array.
    pub index: usize,
    pub reason: SkipReason,
}

/// The result of decoding one incoming message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedBatch {
    /// Recognized packets, in wire order.
    pub packets: Vec<Packet>,
    pub skipped: Vec<SkippedPacket>,
}

/// Decodes one message into its packets.
///
/// # Errors
/// Returns [`ProtocolError::Decode`] if `message` is not a JSON array.
/// Problems with individual elements never fail the batch.
pub fn decode_packets(message: &str) -> Result<DecodedBatch, ProtocolError> {
    let elements: Vec<Value> =
        serde_json::from_str(message).map_err(ProtocolError::Decode)?;

    let mut batch = DecodedBatch {
        packets: Vec::with_capacity(elements.len()),
        skipped: Vec::new(),
    };

    for (index, element) in elements.into_iter().enumerate() {
        let cmd = match element.get("cmd").and_then(Value::as_str) {
            Some(cmd) => cmd.to_owned(),
            None => {
                batch.skipped.push(SkippedPacket {
                    index,
                    reason: SkipReason::MissingCommand,
                });
                continue;
            }
        };

        if !Packet::is_known_command(&cmd) {
            batch.skipped.push(SkippedPacket {
                index,
                reason: SkipReason::UnknownCommand(cmd),
            });
            continue;
        }

        match serde_json::from_value::<Packet>(element) {
            Ok(packet) => batch.packets.push(packet),
            Err(e) => batch.skipped.push(SkippedPacket {
                index,
                reason: SkipReason::Malformed {
                    cmd,
                    error: e.to_string(),
                },
            }),
        }
    }

    Ok(batch)
}

/// Encodes packets as one wire message (a JSON array).
///
/// # Errors
/// Returns [`ProtocolError::Encode`] if a payload cannot be serialized.
pub fn encode_packets(packets: &[Packet]) -> Result<String, ProtocolError> {
    serde_json::to_string(packets).map_err(ProtocolError::Encode)
}
