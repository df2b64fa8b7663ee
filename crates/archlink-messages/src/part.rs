//! Resolution of wire fragments into display parts.
//!
//! Resolution is total: an id the catalogs do not know becomes a visible
//! placeholder such as `Item: 42`, never an error. It is also pure; the
//! same fragment resolved twice against the same collaborators gives equal
//! parts.

use std::sync::Arc;

use archlink_protocol::{
    ActiveIdentity, HintStatus, ItemFlags, ItemNames, JsonMessagePart,
    LocationNames, PartType, PlayerRoster, Slot,
};

use crate::Color;

/// What a resolved part refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessagePartKind {
    Text,
    Player { slot: Slot },
    Item { id: i64, flags: ItemFlags },
    Location { id: i64 },
    Entrance,
    HintStatus { status: HintStatus },
}

/// One display segment of a log line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessagePart {
    pub text: String,
    pub kind: MessagePartKind,
    pub color: Color,
    /// `color` applies to the background rather than the text.
    pub is_background: bool,
}

impl MessagePart {
    fn new(text: String, kind: MessagePartKind, color: Color) -> Self {
        Self {
            text,
            kind,
            color,
            is_background: false,
        }
    }
}

/// Resolves fragments using the roster and name catalogs.
#[derive(Clone)]
pub struct PartResolver {
    roster: Arc<dyn PlayerRoster>,
    items: Arc<dyn ItemNames>,
    locations: Arc<dyn LocationNames>,
    identity: Arc<dyn ActiveIdentity>,
}

impl PartResolver {
    pub fn new(
        roster: Arc<dyn PlayerRoster>,
        items: Arc<dyn ItemNames>,
        locations: Arc<dyn LocationNames>,
        identity: Arc<dyn ActiveIdentity>,
    ) -> Self {
        Self {
            roster,
            items,
            locations,
            identity,
        }
    }

    pub fn roster(&self) -> &dyn PlayerRoster {
        self.roster.as_ref()
    }

    pub fn identity(&self) -> &dyn ActiveIdentity {
        self.identity.as_ref()
    }

    pub fn resolve_all(&self, parts: &[JsonMessagePart]) -> Vec<MessagePart> {
        parts.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn resolve(&self, part: &JsonMessagePart) -> MessagePart {
        let text = part.text.clone().unwrap_or_default();

        match part.kind {
            Some(PartType::PlayerId) => self.player_id(text),
            Some(PartType::PlayerName) => MessagePart::new(
                text,
                MessagePartKind::Player { slot: Slot(0) },
                Color::YELLOW,
            ),
            Some(PartType::ItemId) => self.item_id(text, part),
            Some(PartType::ItemName) => {
                let flags = part.flags.unwrap_or(ItemFlags::NONE);
                MessagePart::new(
                    text,
                    MessagePartKind::Item { id: 0, flags },
                    Color::for_item(flags),
                )
            }
            Some(PartType::LocationId) => self.location_id(text, part),
            Some(PartType::LocationName) => {
                MessagePart::new(text, MessagePartKind::Location { id: 0 }, Color::GREEN)
            }
            Some(PartType::EntranceName) => {
                MessagePart::new(text, MessagePartKind::Entrance, Color::BLUE)
            }
            Some(PartType::HintStatus) => {
                let status = part.hint_status.unwrap_or(HintStatus::Unspecified);
                MessagePart::new(
                    text,
                    MessagePartKind::HintStatus { status },
                    Color::for_hint_status(status),
                )
            }
            Some(PartType::Text | PartType::Color | PartType::Unknown) | None => {
                let mut resolved =
                    MessagePart::new(text, MessagePartKind::Text, Color::WHITE);
                if let Some(wire) = part.color {
                    if let Some(color) = Color::from_wire(wire) {
                        resolved.color = color;
                        resolved.is_background = wire.is_background();
                    }
                }
                resolved
            }
        }
    }

    fn player_id(&self, text: String) -> MessagePart {
        let color = |slot: Slot| {
            if slot == self.identity.slot() {
                Color::MAGENTA
            } else {
                Color::YELLOW
            }
        };

        let Ok(slot) = text.trim().parse::<i32>().map(Slot) else {
            return MessagePart::new(
                text,
                MessagePartKind::Player { slot: Slot(0) },
                Color::YELLOW,
            );
        };

        let name = self
            .roster
            .player(self.identity.team(), slot)
            .and_then(|p| non_empty(p.alias).or_else(|| non_empty(p.name)))
            .unwrap_or_else(|| format!("Player {slot}"));
        MessagePart::new(name, MessagePartKind::Player { slot }, color(slot))
    }

    fn item_id(&self, text: String, part: &JsonMessagePart) -> MessagePart {
        let flags = part.flags.unwrap_or(ItemFlags::NONE);
        let color = Color::for_item(flags);

        let Ok(id) = text.trim().parse::<i64>() else {
            return MessagePart::new(text, MessagePartKind::Item { id: 0, flags }, color);
        };

        let name = match part.player {
            Some(receiver) => self.item_name(receiver, id),
            None => format!("Item: {id}"),
        };
        MessagePart::new(name, MessagePartKind::Item { id, flags }, color)
    }

    fn location_id(&self, text: String, part: &JsonMessagePart) -> MessagePart {
        let Ok(id) = text.trim().parse::<i64>() else {
            return MessagePart::new(text, MessagePartKind::Location { id: 0 }, Color::GREEN);
        };

        let name = match part.player {
            Some(owner) => self.location_name(owner, id),
            None => format!("Location: {id}"),
        };
        MessagePart::new(name, MessagePartKind::Location { id }, Color::GREEN)
    }

    /// Game played in `slot` of the active team.
    fn game_of(&self, slot: Slot) -> Option<String> {
        self.roster
            .player(self.identity.team(), slot)
            .and_then(|p| non_empty(p.game))
    }

    pub(crate) fn item_name(&self, receiver: Slot, id: i64) -> String {
        self.game_of(receiver)
            .and_then(|game| self.items.item_name(&game, id))
            .unwrap_or_else(|| format!("Item: {id}"))
    }

    pub(crate) fn location_name(&self, owner: Slot, id: i64) -> String {
        self.game_of(owner)
            .and_then(|game| self.locations.location_name(&game, id))
            .unwrap_or_else(|| format!("Location: {id}"))
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
