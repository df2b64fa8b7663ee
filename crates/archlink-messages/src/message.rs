//! Decoded log lines.

use std::fmt;

use archlink_protocol::{ItemFlags, PlayerInfo, Slot, Team};

use crate::MessagePart;

/// A player referenced by a log line, seen from the active player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerContext {
    /// Roster record; only team and slot are filled when the roster has
    /// no entry.
    pub player: PlayerInfo,
    /// Same team and slot as the active identity.
    pub is_active_player: bool,
    /// The active player, or a player sharing a group with it on the same
    /// team.
    pub is_related_to_active_player: bool,
}

impl PlayerContext {
    pub fn team(&self) -> Team {
        self.player.team
    }

    pub fn slot(&self) -> Slot {
        self.player.slot
    }
}

/// An item referenced by an item log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfo {
    pub id: i64,
    /// Resolved through the receiving player's game, or `Item: {id}`.
    pub name: String,
    pub location_id: i64,
    /// Resolved through the finding player's game, or `Location: {id}`.
    pub location_name: String,
    pub flags: ItemFlags,
    /// Slot that found the item.
    pub sender: Slot,
}

/// What a log line is about.
///
/// Chosen by the `type` of the originating `PrintJSON`. A type whose
/// required fields are missing falls back to [`Plain`](Self::Plain).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMessageKind {
    Plain,
    Chat {
        player: PlayerContext,
        message: String,
    },
    ServerChat {
        message: String,
    },
    Join {
        player: PlayerContext,
        tags: Vec<String>,
    },
    Leave {
        player: PlayerContext,
    },
    TagsChanged {
        player: PlayerContext,
        tags: Vec<String>,
    },
    Goal {
        player: PlayerContext,
    },
    Release {
        player: PlayerContext,
    },
    Collect {
        player: PlayerContext,
    },
    Countdown {
        remaining: i64,
    },
    Tutorial,
    CommandResult,
    AdminCommandResult,
    ItemSend {
        receiver: PlayerContext,
        sender: PlayerContext,
        item: ItemInfo,
    },
    ItemCheat {
        receiver: PlayerContext,
        item: ItemInfo,
        team: Team,
    },
    Hint {
        receiver: PlayerContext,
        sender: PlayerContext,
        item: ItemInfo,
        found: bool,
    },
}

/// One resolved log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub parts: Vec<MessagePart>,
    pub kind: LogMessageKind,
}

impl LogMessage {
    /// The player the line is about, for player-specific kinds.
    pub fn player(&self) -> Option<&PlayerContext> {
        match &self.kind {
            LogMessageKind::Chat { player, .. }
            | LogMessageKind::Join { player, .. }
            | LogMessageKind::Leave { player }
            | LogMessageKind::TagsChanged { player, .. }
            | LogMessageKind::Goal { player }
            | LogMessageKind::Release { player }
            | LogMessageKind::Collect { player } => Some(player),
            LogMessageKind::ItemSend { receiver, .. }
            | LogMessageKind::ItemCheat { receiver, .. }
            | LogMessageKind::Hint { receiver, .. } => Some(receiver),
            _ => None,
        }
    }

    pub fn item(&self) -> Option<&ItemInfo> {
        match &self.kind {
            LogMessageKind::ItemSend { item, .. }
            | LogMessageKind::ItemCheat { item, .. }
            | LogMessageKind::Hint { item, .. } => Some(item),
            _ => None,
        }
    }
}

/// The line as plain text.
impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            f.write_str(&part.text)?;
        }
        Ok(())
    }
}
