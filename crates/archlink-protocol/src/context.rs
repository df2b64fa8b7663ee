//! Lookup interfaces the protocol pipeline consumes from the rest of a
//! client.
//!
//! The roster, the item/location catalogs, the active identity, and the
//! audit log all live outside this workspace (session negotiation and data
//! package caching are someone else's job). The decoders only ever query
//! them through these narrow traits, which are injected, never global. In
//! tests they are replaced by the in-memory versions in
//! [`memory`](crate::memory).

use serde::{Deserialize, Serialize};

use crate::{Slot, Team};

/// What the roster knows about one slot.
///
/// `Default` is the "unknown player" value used when a slot is missing from
/// the roster: every field empty, team and slot zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub team: Team,
    pub slot: Slot,
    /// Name chosen at generation time.
    pub name: String,
    /// Current display name; may be changed during a session.
    pub alias: String,
    /// Game played in this slot, used to pick the right name catalog.
    pub game: String,
    /// Group slots (e.g. item-link groups) this player belongs to.
    pub groups: Vec<Slot>,
}

impl PlayerInfo {
    /// Returns `true` if the two players are on the same team and either
    /// one is a group containing the other, or both belong to a common
    /// group.
    pub fn shares_group_with(&self, other: &PlayerInfo) -> bool {
        if self.team != other.team {
            return false;
        }
        self.groups.contains(&other.slot)
            || other.groups.contains(&self.slot)
            || self.groups.iter().any(|g| other.groups.contains(g))
    }
}

/// Slot → player lookup.
pub trait PlayerRoster: Send + Sync {
    fn player(&self, team: Team, slot: Slot) -> Option<PlayerInfo>;
}

/// `(game, item id) → name` lookup.
pub trait ItemNames: Send + Sync {
    fn item_name(&self, game: &str, id: i64) -> Option<String>;
}

/// `(game, location id) → name` lookup.
pub trait LocationNames: Send + Sync {
    fn location_name(&self, game: &str, id: i64) -> Option<String>;
}

/// The player this client is connected as.
pub trait ActiveIdentity: Send + Sync {
    fn team(&self) -> Team;

    fn slot(&self) -> Slot;

    /// Tags this client currently advertises to the server.
    fn tags(&self) -> Vec<String>;

    /// Replaces the advertised tag list.
    fn set_tags(&self, tags: Vec<String>);
}

/// Append-only, key-scoped diagnostic log.
///
/// Appends to one key keep their order; nothing is promised across keys.
pub trait AuditLog: Send + Sync {
    fn append(&self, key: &str, entries: &[String]);
}
