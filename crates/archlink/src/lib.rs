//! # Archlink
//!
//! Client library for the Archipelago multiworld protocol.
//!
//! Archlink turns the stream of JSON packets a multiworld server sends over
//! a WebSocket into typed events, and sends features' packets back:
//!
//! - **Bounces**: tag-filtered cross-game messages, including DeathLink
//! - **Log messages**: rich-text `PrintJSON` lines resolved into colored,
//!   named parts
//!
//! Session negotiation, the data package cache, and reconnect policy live
//! outside this crate; they are consumed through small traits
//! ([`PlayerRoster`], [`ItemNames`], [`LocationNames`], [`ActiveIdentity`],
//! [`AuditLog`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use archlink::prelude::*;
//!
//! # async fn run() -> Result<(), ArchlinkError> {
//! let config = ClientConfig::default().with_url("ws://localhost:38281");
//! let client = ArchlinkClient::connect(config).await?;
//!
//! client.on_death_link(Arc::new(|dl: &DeathLink| {
//!     println!("{} died", dl.source());
//! }));
//! client.on_log_message(Arc::new(|line: &LogMessage| println!("{line}")));
//! client.enable_death_link().await?;
//!
//! client.closed().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod tracing;

pub use client::{ArchlinkClient, ArchlinkClientBuilder};
pub use config::ClientConfig;
pub use error::ArchlinkError;
pub use self::tracing::init_tracing;

pub use archlink_bounce as bounce;
pub use archlink_messages as messages;
pub use archlink_protocol as protocol;
pub use archlink_transport as transport;

pub use archlink_protocol::{
    ActiveIdentity, AuditLog, ItemNames, LocationNames, PlayerRoster,
};

/// The types most applications need.
pub mod prelude {
    pub use crate::{ArchlinkClient, ArchlinkError, ClientConfig, init_tracing};
    pub use archlink_bounce::{BounceEvent, DeathLink, Delivery};
    pub use archlink_messages::{Color, LogMessage, LogMessageKind, MessagePart};
    pub use archlink_protocol::{Packet, PlayerInfo, Slot, Team};
}
