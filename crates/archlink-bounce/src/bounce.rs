//! Tag-filtered publish/subscribe over `Bounce` / `Bounced` packets.
//!
//! A bounce is an arbitrary payload the server relays to every client that
//! advertises a matching tag. Locally, features register the tags they
//! care about; an incoming `Bounced` packet reaches a feature only when its
//! tag set and the feature's tag set intersect.
//!
//! ```text
//! Bounced {tags: [DeathLink, Other]} ──► registry ──► [DeathLink] handler ✓
//!                                                 └─► [Ring]      handler ✗
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use archlink_protocol::{BouncePacket, Packet, Slot};
use serde_json::{Map, Value};

use crate::{BounceError, Delivery, PacketListener, PacketSender};

/// A received bounce.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BounceEvent {
    pub tags: HashSet<String>,
    pub data: Map<String, Value>,
    /// Games the sender targeted, if any.
    pub games: Vec<String>,
    /// Slots the sender targeted, if any.
    pub slots: Vec<Slot>,
}

impl BounceEvent {
    /// Returns `true` if this event carries at least one of `tags`.
    pub fn matches(&self, tags: &HashSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }
}

impl From<BouncePacket> for BounceEvent {
    fn from(packet: BouncePacket) -> Self {
        Self {
            tags: packet.tags.into_iter().collect(),
            data: packet.data,
            games: packet.games,
            slots: packet.slots,
        }
    }
}

/// Receives bounces whose tags match a registration.
pub trait BounceHandler: Send + Sync {
    fn on_bounce(&self, event: &BounceEvent);
}

impl<F> BounceHandler for F
where
    F: Fn(&BounceEvent) + Send + Sync,
{
    fn on_bounce(&self, event: &BounceEvent) {
        self(event)
    }
}

/// Handle returned by [`BounceRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    tags: HashSet<String>,
    handler: Arc<dyn BounceHandler>,
}

/// Registry of `(tag set, handler)` pairs plus the outgoing side.
pub struct BounceRegistry {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
    sender: Arc<dyn PacketSender>,
}

impl BounceRegistry {
    pub fn new(sender: Arc<dyn PacketSender>) -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            sender,
        }
    }

    /// Registers `handler` for bounces carrying any of `tags`.
    ///
    /// A registration with no tags never matches.
    pub fn register<I, S>(
        &self,
        tags: I,
        handler: Arc<dyn BounceHandler>,
    ) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tags: HashSet<String> = tags.into_iter().map(Into::into).collect();
        tracing::debug!(?id, ?tags, "bounce handler registered");
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration { id, tags, handler });
        id
    }

    /// Removes a registration. Returns `false` if it was already gone.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }

    /// Delivers `event` to every registration whose tags intersect the
    /// event's. Returns the number of handlers called.
    pub fn deliver(&self, event: &BounceEvent) -> usize {
        let matching: Vec<Arc<dyn BounceHandler>> = self
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| event.matches(&r.tags))
            .map(|r| Arc::clone(&r.handler))
            .collect();

        for handler in &matching {
            handler.on_bounce(event);
        }
        matching.len()
    }

    /// Bounces `data` to every client advertising `tag`.
    pub fn send(
        &self,
        tag: impl Into<String>,
        data: Map<String, Value>,
    ) -> Result<Delivery, BounceError> {
        self.send_packet(Packet::Bounce(BouncePacket::tagged(tag, data)))
    }

    /// Sends an arbitrary packet through the registry's sender.
    pub fn send_packet(&self, packet: Packet) -> Result<Delivery, BounceError> {
        self.sender.send_packets(vec![packet])
    }
}

impl PacketListener for BounceRegistry {
    fn on_packet(&self, packet: &Packet) {
        if let Packet::Bounced(body) = packet {
            let event = BounceEvent::from(body.clone());
            let delivered = self.deliver(&event);
            tracing::trace!(tags = ?event.tags, delivered, "bounce received");
        }
    }
}
