//! Symbolic map locations.
//!
//! Scripts name places indirectly: an action point, a hero gate, a player's
//! dungeon heart, "where the last event happened". The name is resolved when
//! the line is loaded; the coordinates only when the command runs, since the
//! place may move or vanish in between.

use std::fmt;

use keeper_data::{PLAYER_NEUTRAL, PlayerId, PlayerRange};
use serde::{Deserialize, Serialize};
use variantly::Variantly;

use crate::context::CheckContext;
use crate::diagnostic::ScriptError;
use crate::sim::Simulation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Variantly)]
pub enum MapLocation {
    #[default]
    None,
    ActionPoint(u16),
    HeroGate(u16),
    PlayerHeart(PlayerId),
    /// First creature of this kind owned by the target player.
    CreatureKind(u16),
    /// First room of this kind owned by the target player.
    RoomKind(u16),
    LastEvent,
    Combat,
    /// Fixed subtile coordinates given directly by a command.
    Subtile(u16, u16),
}

impl MapLocation {
    /// Parse a location word.
    ///
    /// # Errors
    /// Unknown names, missing action points or hero gates, and `0`.
    pub fn parse(text: &str, cx: &mut CheckContext<'_>) -> Result<Self, ScriptError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(MapLocation::None);
        }
        if let Some(range) = PlayerRange::from_name(text) {
            return Ok(match range.single_player() {
                Some(player) if player != PLAYER_NEUTRAL => {
                    if cx.sim.heart(player).is_none() {
                        cx.warn(format!("{player} has no dungeon heart to use as a location"));
                    }
                    MapLocation::PlayerHeart(player)
                },
                _ => MapLocation::None,
            });
        }
        if let Some(id) = cx.catalog.creatures.id(text) {
            return Ok(MapLocation::CreatureKind(id));
        }
        if let Some(id) = cx.catalog.rooms.id(text) {
            return Ok(MapLocation::RoomKind(id));
        }
        if text.eq_ignore_ascii_case("LAST_EVENT") {
            return Ok(MapLocation::LastEvent);
        }
        if text.eq_ignore_ascii_case("COMBAT") {
            return Ok(MapLocation::Combat);
        }
        let Ok(number) = text.parse::<i64>() else {
            return Err(ScriptError::UnknownName {
                kind: "location",
                name: text.to_string(),
            });
        };
        let id = u16::try_from(number.unsigned_abs()).map_err(|_| ScriptError::UnknownName {
            kind: "location",
            name: text.to_string(),
        })?;
        match number.signum() {
            -1 if cx.sim.hero_gate(id).is_some() => Ok(MapLocation::HeroGate(id)),
            -1 => Err(ScriptError::UnknownName {
                kind: "hero gate",
                name: id.to_string(),
            }),
            1 if cx.sim.action_point(id).is_some() => Ok(MapLocation::ActionPoint(id)),
            1 => Err(ScriptError::UnknownName {
                kind: "action point",
                name: id.to_string(),
            }),
            _ => Err(ScriptError::Invalid("location 0 is not valid".to_string())),
        }
    }

    /// Subtile coordinates, if the location currently exists.
    pub fn resolve(self, sim: &dyn Simulation, player: PlayerId) -> Option<(u16, u16)> {
        match self {
            MapLocation::None => None,
            MapLocation::ActionPoint(id) => sim.action_point(id),
            MapLocation::HeroGate(id) => sim.hero_gate(id),
            MapLocation::PlayerHeart(owner) => sim.heart(owner).map(|heart| (heart.x, heart.y)),
            MapLocation::CreatureKind(kind) => sim.creature_position(player, kind),
            MapLocation::RoomKind(kind) => sim.room_position(player, kind),
            MapLocation::LastEvent => sim.last_event(player),
            MapLocation::Combat => sim.combat(player),
            MapLocation::Subtile(x, y) => Some((x, y)),
        }
    }
}

impl fmt::Display for MapLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapLocation::None => f.write_str("nowhere"),
            MapLocation::ActionPoint(id) => write!(f, "action point {id}"),
            MapLocation::HeroGate(id) => write!(f, "hero gate {id}"),
            MapLocation::PlayerHeart(player) => write!(f, "heart of {player}"),
            MapLocation::CreatureKind(kind) => write!(f, "creature kind {kind}"),
            MapLocation::RoomKind(kind) => write!(f, "room kind {kind}"),
            MapLocation::LastEvent => f.write_str("LAST_EVENT"),
            MapLocation::Combat => f.write_str("COMBAT"),
            MapLocation::Subtile(x, y) => write!(f, "subtile ({x}, {y})"),
        }
    }
}
