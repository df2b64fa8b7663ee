//! Rich-text log decoding for Archlink.
//!
//! The server describes log lines as a flat list of loosely typed fragments:
//! "player 3", "item 42 for player 4", "some text in red". This crate turns
//! them into something a UI can render directly:
//!
//! 1. **Parts**: each fragment is resolved into a [`MessagePart`] with final
//!    display text and a [`Color`] ([`PartResolver`])
//! 2. **Messages**: the whole packet becomes a [`LogMessage`] whose
//!    [`LogMessageKind`] carries the structured fields of its type
//!    ([`LogDecoder`])
//!
//! ```text
//! PrintJSON {type: ItemSend, data: [player_id "4", text " found ", item_id "42"]}
//!     ↓ LogDecoder
//! LogMessage { parts: ["Samus", " found ", "Sword"], kind: ItemSend {..} }
//! ```
//!
//! Name lookups go through the collaborator traits of `archlink-protocol`.
//! Anything they cannot resolve is shown as a placeholder such as
//! `Item: 42`; decoding never fails.

mod color;
mod decoder;
mod message;
mod part;

pub use color::Color;
pub use decoder::{LogDecoder, LogMessageHandler};
pub use message::{ItemInfo, LogMessage, LogMessageKind, PlayerContext};
pub use part::{MessagePart, MessagePartKind, PartResolver};
