//! Turns decoded messages into an ordered stream of packet events.
//!
//! ```text
//! "[{cmd:A},{cmd:?},{cmd:B}]" ──decode──► A, B ──► listener 1 (A, B)
//!                                                 listener 2 (A, B)
//! ```
//!
//! Every listener sees every recognized packet, in wire order. Dispatch is
//! synchronous: it returns after the last listener has handled the last
//! packet.

use std::sync::{Arc, PoisonError, RwLock};

use archlink_protocol::{decode_packets, Packet, ProtocolError, SkipReason};

use crate::{BounceError, Delivery};

/// Receives every dispatched packet.
pub trait PacketListener: Send + Sync {
    fn on_packet(&self, packet: &Packet);
}

impl<F> PacketListener for F
where
    F: Fn(&Packet) + Send + Sync,
{
    fn on_packet(&self, packet: &Packet) {
        self(packet)
    }
}

/// Sends packets to the server.
///
/// Implementations must keep the packets of one call together as a single
/// wire message and must fail, not drop, when the connection is closed.
/// A message accepted for later writing reports its outcome through the
/// returned [`Delivery`].
pub trait PacketSender: Send + Sync {
    fn send_packets(&self, packets: Vec<Packet>) -> Result<Delivery, BounceError>;
}

/// Fan-out of decoded packets to subscribed listeners.
#[derive(Default)]
pub struct PacketDispatcher {
    listeners: RwLock<Vec<Arc<dyn PacketListener>>>,
}

impl PacketDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener. It receives packets from the next dispatch on.
    pub fn subscribe(&self, listener: Arc<dyn PacketListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Decodes `message` and publishes its packets in order.
    ///
    /// Returns how many packets were published. Unknown and malformed
    /// elements are logged and skipped.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if `message` is not a JSON array;
    /// nothing is published in that case.
    pub fn dispatch(&self, message: &str) -> Result<usize, ProtocolError> {
        let batch = decode_packets(message)?;

        for skipped in &batch.skipped {
            match &skipped.reason {
                SkipReason::UnknownCommand(cmd) => {
                    tracing::debug!(index = skipped.index, %cmd, "ignoring unknown packet");
                }
                SkipReason::MissingCommand => {
                    tracing::warn!(index = skipped.index, "packet without cmd");
                }
                SkipReason::Malformed { cmd, error } => {
                    tracing::warn!(index = skipped.index, %cmd, %error, "dropping malformed packet");
                }
            }
        }

        for packet in &batch.packets {
            self.publish(packet);
        }
        Ok(batch.packets.len())
    }

    /// Hands one packet to every listener.
    pub fn publish(&self, packet: &Packet) {
        // Snapshot so a listener may subscribe others without deadlocking.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        tracing::trace!(cmd = packet.command(), listeners = listeners.len(), "publishing packet");
        for listener in &listeners {
            listener.on_packet(packet);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
