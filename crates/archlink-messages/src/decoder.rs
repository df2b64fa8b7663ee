//! `PrintJSON` packets to [`LogMessage`]s.

use std::sync::{Arc, PoisonError, RwLock};

use archlink_bounce::PacketListener;
use archlink_protocol::{
    NetworkItem, Packet, PlayerInfo, PrintJsonKind, PrintJsonPacket, Slot, Team,
};

use crate::{ItemInfo, LogMessage, LogMessageKind, PartResolver, PlayerContext};

/// Receives every decoded log line.
pub trait LogMessageHandler: Send + Sync {
    fn on_log_message(&self, message: &LogMessage);
}

impl<F> LogMessageHandler for F
where
    F: Fn(&LogMessage) + Send + Sync,
{
    fn on_log_message(&self, message: &LogMessage) {
        self(message)
    }
}

/// Decodes `PrintJSON` packets and hands the result to registered handlers.
///
/// Subscribe it to a [`PacketDispatcher`](archlink_bounce::PacketDispatcher);
/// other packets are ignored.
pub struct LogDecoder {
    resolver: PartResolver,
    handlers: RwLock<Vec<Arc<dyn LogMessageHandler>>>,
}

impl LogDecoder {
    pub fn new(resolver: PartResolver) -> Self {
        Self {
            resolver,
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn on_log_message(&self, handler: Arc<dyn LogMessageHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Resolves every fragment and picks the kind.
    pub fn decode(&self, packet: &PrintJsonPacket) -> LogMessage {
        LogMessage {
            parts: self.resolver.resolve_all(&packet.data),
            kind: self.kind(packet).unwrap_or(LogMessageKind::Plain),
        }
    }

    fn kind(&self, packet: &PrintJsonPacket) -> Option<LogMessageKind> {
        let player = || Some(self.context(packet.team?, packet.slot?));
        let tags = || packet.tags.clone().unwrap_or_default();

        let kind = match packet.kind? {
            PrintJsonKind::Chat => LogMessageKind::Chat {
                player: player()?,
                message: packet.message.clone()?,
            },
            PrintJsonKind::ServerChat => LogMessageKind::ServerChat {
                message: packet.message.clone()?,
            },
            PrintJsonKind::Join => LogMessageKind::Join {
                player: player()?,
                tags: tags(),
            },
            PrintJsonKind::Part => LogMessageKind::Leave { player: player()? },
            PrintJsonKind::TagsChanged => LogMessageKind::TagsChanged {
                player: player()?,
                tags: tags(),
            },
            PrintJsonKind::Goal => LogMessageKind::Goal { player: player()? },
            PrintJsonKind::Release => LogMessageKind::Release { player: player()? },
            PrintJsonKind::Collect => LogMessageKind::Collect { player: player()? },
            PrintJsonKind::Countdown => LogMessageKind::Countdown {
                remaining: packet.countdown?,
            },
            PrintJsonKind::Tutorial => LogMessageKind::Tutorial,
            PrintJsonKind::CommandResult => LogMessageKind::CommandResult,
            PrintJsonKind::AdminCommandResult => LogMessageKind::AdminCommandResult,
            PrintJsonKind::ItemSend => {
                let (receiver, item) = self.item_fields(packet)?;
                LogMessageKind::ItemSend {
                    sender: self.context(self.active_team(), item.sender),
                    receiver,
                    item,
                }
            }
            PrintJsonKind::ItemCheat => {
                let (receiver, item) = self.item_fields(packet)?;
                LogMessageKind::ItemCheat {
                    receiver,
                    item,
                    team: packet.team?,
                }
            }
            PrintJsonKind::Hint => {
                let (receiver, item) = self.item_fields(packet)?;
                LogMessageKind::Hint {
                    sender: self.context(self.active_team(), item.sender),
                    receiver,
                    item,
                    found: packet.found.unwrap_or(false),
                }
            }
            PrintJsonKind::Unknown => return None,
        };
        Some(kind)
    }

    fn active_team(&self) -> Team {
        self.resolver.identity().team()
    }

    fn item_fields(&self, packet: &PrintJsonPacket) -> Option<(PlayerContext, ItemInfo)> {
        let receiving = packet.receiving?;
        let item = packet.item.as_ref()?;
        Some((
            self.context(self.active_team(), receiving),
            self.item_info(receiving, item),
        ))
    }

    fn item_info(&self, receiving: Slot, item: &NetworkItem) -> ItemInfo {
        ItemInfo {
            id: item.item,
            name: self.resolver.item_name(receiving, item.item),
            location_id: item.location,
            location_name: self.resolver.location_name(item.player, item.location),
            flags: item.flags,
            sender: item.player,
        }
    }

    /// Looks `team`/`slot` up and relates it to the active identity.
    pub fn context(&self, team: Team, slot: Slot) -> PlayerContext {
        let identity = self.resolver.identity();
        let lookup = |team: Team, slot: Slot| {
            self.resolver
                .roster()
                .player(team, slot)
                .unwrap_or_else(|| PlayerInfo {
                    team,
                    slot,
                    ..PlayerInfo::default()
                })
        };

        let player = lookup(team, slot);
        let is_active_player = team == identity.team() && slot == identity.slot();
        let is_related_to_active_player = is_active_player
            || lookup(identity.team(), identity.slot()).shares_group_with(&player);

        PlayerContext {
            player,
            is_active_player,
            is_related_to_active_player,
        }
    }

    fn emit(&self, message: &LogMessage) {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in &handlers {
            handler.on_log_message(message);
        }
    }
}

impl PacketListener for LogDecoder {
    fn on_packet(&self, packet: &Packet) {
        if let Packet::PrintJson(body) = packet {
            let message = self.decode(body);
            tracing::trace!(kind = ?body.kind, parts = message.parts.len(), "log message decoded");
            self.emit(&message);
        }
    }
}
