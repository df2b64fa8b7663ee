//! Packet types for the multiworld wire format.
//!
//! Every message on the wire is a JSON array of packet objects. Each object
//! names its kind in a `cmd` field:
//!
//! ```text
//! [{"cmd":"Bounced","tags":["DeathLink"],"data":{...}}, {"cmd":"PrintJSON",...}]
//! ```
//!
//! [`Packet`] is the closed set of kinds this client understands. Adding a
//! kind means adding a variant, which makes every `match` over packets
//! point at the code that has to learn about it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::parts::JsonMessagePart;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A participant's numeric slot within a session.
///
/// `#[serde(transparent)]` keeps the wire form a plain number: `Slot(3)`
/// travels as `3`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Slot(pub i32);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A group of slots sharing a win condition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Team(pub i32);

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification bits carried by an item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemFlags(pub u32);

impl ItemFlags {
    pub const NONE: Self = Self(0);
    /// Required to reach the goal.
    pub const ADVANCEMENT: Self = Self(0b001);
    /// Useful, never placed on excluded locations.
    pub const NEVER_EXCLUDE: Self = Self(0b010);
    pub const TRAP: Self = Self(0b100);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_advancement(self) -> bool {
        self.contains(Self::ADVANCEMENT)
    }

    pub fn is_never_exclude(self) -> bool {
        self.contains(Self::NEVER_EXCLUDE)
    }

    pub fn is_trap(self) -> bool {
        self.contains(Self::TRAP)
    }
}

impl std::ops::BitOr for ItemFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// An item as it appears inside item-related packets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkItem {
    /// Item id, resolved against the receiving player's game.
    pub item: i64,
    /// Location id, resolved against the finding player's game.
    pub location: i64,
    /// The slot that found the item.
    pub player: Slot,
    #[serde(default)]
    pub flags: ItemFlags,
}

// ---------------------------------------------------------------------------
// Packets
// ---------------------------------------------------------------------------

/// A packet discriminated by its `cmd` field.
///
/// `#[serde(tag = "cmd")]` produces internally tagged JSON:
///   `{ "cmd": "Say", "text": "hello" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Packet {
    /// Client → Server: broadcast a tagged payload to matching clients.
    Bounce(BouncePacket),

    /// Server → Client: a payload some client bounced.
    Bounced(BouncePacket),

    /// Server → Client: a rich-text log line.
    #[serde(rename = "PrintJSON")]
    PrintJson(PrintJsonPacket),

    /// Client → Server: a chat message.
    Say(SayPacket),

    /// Client → Server: replace this client's tags.
    ConnectUpdate(ConnectUpdatePacket),

    /// Server → Client: the server rejected one of our packets.
    InvalidPacket(InvalidPacketPacket),
}

impl Packet {
    /// Every `cmd` value that decodes into a [`Packet`].
    pub const COMMANDS: &'static [&'static str] = &[
        "Bounce",
        "Bounced",
        "PrintJSON",
        "Say",
        "ConnectUpdate",
        "InvalidPacket",
    ];

    /// The wire discriminator of this packet.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Bounce(_) => "Bounce",
            Self::Bounced(_) => "Bounced",
            Self::PrintJson(_) => "PrintJSON",
            Self::Say(_) => "Say",
            Self::ConnectUpdate(_) => "ConnectUpdate",
            Self::InvalidPacket(_) => "InvalidPacket",
        }
    }

    /// Returns `true` if `cmd` names a known packet kind.
    pub fn is_known_command(cmd: &str) -> bool {
        Self::COMMANDS.contains(&cmd)
    }
}

/// Body shared by `Bounce` and `Bounced`.
///
/// All routing lists are optional on the wire; empty lists are omitted
/// when encoding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BouncePacket {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub games: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<Slot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl BouncePacket {
    /// A bounce carrying one tag and a payload.
    pub fn tagged(tag: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            tags: vec![tag.into()],
            data,
            ..Self::default()
        }
    }
}

/// The `type` of a `PrintJSON` packet.
///
/// Unrecognized values decode as [`Unknown`](Self::Unknown) and are shown as
/// plain log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrintJsonKind {
    ItemSend,
    ItemCheat,
    Hint,
    Join,
    /// A player left.
    Part,
    Chat,
    ServerChat,
    Tutorial,
    TagsChanged,
    CommandResult,
    AdminCommandResult,
    Goal,
    Release,
    Collect,
    Countdown,
    #[serde(other)]
    Unknown,
}

/// A rich-text log line plus the fields specific to its kind.
///
/// Which optional fields are present depends on [`kind`](Self::kind); for
/// example `ItemSend` carries `receiving` and `item`, `Join` carries
/// `team`, `slot` and `tags`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrintJsonPacket {
    pub data: Vec<JsonMessagePart>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PrintJsonKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving: Option<Slot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<NetworkItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SayPacket {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectUpdatePacket {
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_handling: Option<u8>,
}

/// The server's report of a packet it could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidPacketPacket {
    /// `"cmd"` or `"arguments"`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_cmd: Option<String>,
    pub text: String,
}
