//! Packet dispatch and bounce features for Archlink.
//!
//! This crate sits between the protocol codec and the application:
//!
//! 1. **Dispatch**: a decoded message becomes an ordered stream of packets
//!    handed to every [`PacketListener`] ([`PacketDispatcher`])
//! 2. **Bounce**: tag-filtered pub/sub over `Bounce` / `Bounced` packets
//!    ([`BounceRegistry`])
//! 3. **DeathLink**: the best known bounce convention, with an audit trail
//!    of everything sent and received ([`DeathLinkService`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← DeathLinkHandler, BounceHandler callbacks
//!     ↕
//! Dispatch Layer (this crate)  ← routes packets, sends through PacketSender
//!     ↕
//! Protocol Layer (below)  ← Packet types, batch codec
//! ```
//!
//! Sending never touches the network directly: features hand packets to a
//! [`PacketSender`], which the host wires to its connection. Each send
//! returns a [`Delivery`] that resolves once the message was written.

mod bounce;
mod deathlink;
mod delivery;
mod dispatcher;
mod error;

pub use bounce::{BounceEvent, BounceHandler, BounceRegistry, SubscriptionId};
pub use deathlink::{
    DeathLink, DeathLinkHandler, DeathLinkParseError, DeathLinkService,
    DEATH_LINK_TAG, FAILED_LOG_KEY,
};
pub use delivery::{Delivery, DeliveryNotice};
pub use dispatcher::{PacketDispatcher, PacketListener, PacketSender};
pub use error::BounceError;
