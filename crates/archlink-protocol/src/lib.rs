//! Wire protocol for Archlink.
//!
//! This crate defines what travels between the client and the multiworld
//! server, and what the client needs to know to interpret it:
//!
//! - **Types** ([`Packet`], [`BouncePacket`], [`PrintJsonPacket`], ...):
//!   the packet kinds, discriminated by their `cmd` field.
//! - **Parts** ([`JsonMessagePart`], [`WireColor`], [`HintStatus`]): the
//!   loosely typed fragments inside rich-text log packets.
//! - **Codec** ([`decode_packets`], [`encode_packets`]): whole messages to
//!   and from packet batches, skipping elements it cannot use.
//! - **Context** ([`PlayerRoster`], [`ItemNames`], [`LocationNames`],
//!   [`ActiveIdentity`], [`AuditLog`]): lookups supplied by the host.
//!
//! ```text
//! Transport (text) → Protocol (Packet batch) → Dispatcher → features
//! ```

mod codec;
mod context;
mod error;
pub mod memory;
mod parts;
mod types;

pub use codec::{decode_packets, encode_packets, DecodedBatch, SkipReason, SkippedPacket};
pub use context::{
    ActiveIdentity, AuditLog, ItemNames, LocationNames, PlayerInfo, PlayerRoster,
};
pub use error::ProtocolError;
pub use parts::{HintStatus, JsonMessagePart, PartType, WireColor};
pub use types::{
    BouncePacket, ConnectUpdatePacket, InvalidPacketPacket, ItemFlags,
    NetworkItem, Packet, PrintJsonKind, PrintJsonPacket, SayPacket, Slot, Team,
};
