//! In-memory implementations of the collaborator traits.
//!
//! Useful for tests, tools, and hosts that already hold the roster and
//! catalogs in memory.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::context::{
    ActiveIdentity, AuditLog, ItemNames, LocationNames, PlayerInfo,
    PlayerRoster,
};
use crate::{Slot, Team};

/// A fixed player roster.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: HashMap<(Team, Slot), PlayerInfo>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a player, keyed by its team and slot.
    pub fn with_player(mut self, player: PlayerInfo) -> Self {
        self.players.insert((player.team, player.slot), player);
        self
    }
}

impl PlayerRoster for Roster {
    fn player(&self, team: Team, slot: Slot) -> Option<PlayerInfo> {
        self.players.get(&(team, slot)).cloned()
    }
}

/// Item and location names per game.
#[derive(Debug, Clone, Default)]
pub struct NameCatalog {
    items: HashMap<(String, i64), String>,
    locations: HashMap<(String, i64), String>,
}

impl NameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(
        mut self,
        game: impl Into<String>,
        id: i64,
        name: impl Into<String>,
    ) -> Self {
        self.items.insert((game.into(), id), name.into());
        self
    }

    pub fn with_location(
        mut self,
        game: impl Into<String>,
        id: i64,
        name: impl Into<String>,
    ) -> Self {
        self.locations.insert((game.into(), id), name.into());
        self
    }
}

impl ItemNames for NameCatalog {
    fn item_name(&self, game: &str, id: i64) -> Option<String> {
        self.items.get(&(game.to_owned(), id)).cloned()
    }
}

impl LocationNames for NameCatalog {
    fn location_name(&self, game: &str, id: i64) -> Option<String> {
        self.locations.get(&(game.to_owned(), id)).cloned()
    }
}

/// A fixed identity with a mutable tag list.
#[derive(Debug, Default)]
pub struct Identity {
    team: Team,
    slot: Slot,
    tags: Mutex<Vec<String>>,
}

impl Identity {
    pub fn new(team: Team, slot: Slot) -> Self {
        Self {
            team,
            slot,
            tags: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.tags.lock().unwrap_or_else(PoisonError::into_inner) =
            tags.into_iter().map(Into::into).collect();
        self
    }
}

impl ActiveIdentity for Identity {
    fn team(&self) -> Team {
        self.team
    }

    fn slot(&self) -> Slot {
        self.slot
    }

    fn tags(&self) -> Vec<String> {
        self.tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_tags(&self, tags: Vec<String>) {
        *self.tags.lock().unwrap_or_else(PoisonError::into_inner) = tags;
    }
}

/// An [`AuditLog`] that keeps every entry in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries appended under `key`, oldest first.
    pub fn entries(&self, key: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Every key that has at least one entry, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, key: &str, entries: &[String]) {
        if entries.is_empty() {
            return;
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_owned())
            .or_default()
            .extend_from_slice(entries);
    }
}
