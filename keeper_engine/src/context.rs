//! State handed to command check and process functions.

use keeper_data::{PlayerId, PlayerRange, SymbolCatalog};
use log::info;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::condition::{ConditionRef, ConditionTable};
use crate::config::EngineConfig;
use crate::diagnostic::{Diagnostics, ProcessError};
use crate::location::MapLocation;
use crate::party::PartyTable;
use crate::sim::{Simulation, WorldOp};
use crate::strings::StringArena;

/// Loader bookkeeping that control commands update.
#[derive(Debug, Clone, Default)]
pub struct LoadState {
    pub level_version: i64,
    /// Set to 2 by `NEXT_COMMAND_REUSABLE`, decremented on every line.
    pub next_command_reusable: u8,
    pub win_conditions: Vec<ConditionRef>,
    pub lose_conditions: Vec<ConditionRef>,
    pub run_after_victory: bool,
}

impl LoadState {
    pub fn reusable(&self) -> bool {
        self.next_command_reusable > 0
    }
}

/// Everything a check function may read or update while a line is compiled.
pub struct CheckContext<'a> {
    pub line: usize,
    pub command: &'a str,
    /// `DRAWFROM` ranges are accepted for text parameters (`IF*` commands).
    pub allow_ranges: bool,
    pub config: &'a EngineConfig,
    pub catalog: &'a SymbolCatalog,
    pub sim: &'a dyn Simulation,
    pub conditions: &'a mut ConditionTable,
    pub parties: &'a mut PartyTable,
    pub strings: &'a mut StringArena,
    pub rng: &'a mut StdRng,
    pub load: &'a mut LoadState,
    pub diagnostics: &'a mut Diagnostics,
}

impl CheckContext<'_> {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.diagnostics.warning(self.line, self.command, message);
    }

    /// Record an error without refusing the command.
    pub fn error(&mut self, message: impl Into<String>) {
        self.diagnostics.error(self.line, self.command, message);
    }

    /// Clamp `value` into `min..=max`, warning when it had to move.
    pub fn clamp(&mut self, what: &str, value: i64, min: i64, max: i64) -> i64 {
        let clamped = value.clamp(min, max);
        if clamped != value {
            self.warn(format!("{what} {value} out of range {min}..={max}, using {clamped}"));
        }
        clamped
    }

    pub fn in_condition(&self) -> bool {
        !self.conditions.current().is_always()
    }
}

/// Per-invocation state of a command's process function.
pub struct ExecutionContext<'a> {
    pub players: PlayerRange,
    pub line: usize,
    pub command: &'a str,
    pub config: &'a EngineConfig,
    pub catalog: &'a SymbolCatalog,
    pub sim: &'a mut dyn Simulation,
    pub strings: &'a StringArena,
    pub parties: &'a mut PartyTable,
    pub countdowns: &'a mut Countdowns,
    pub rng: &'a mut StdRng,
    pub diagnostics: &'a mut Diagnostics,
}

impl ExecutionContext<'_> {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.diagnostics.warning(self.line, self.command, message);
    }

    /// Run `each` for every player in `players`.
    ///
    /// A player the command cannot be applied to is skipped with a warning;
    /// the remaining players are still processed.
    pub fn for_each_player(
        &mut self,
        players: impl IntoIterator<Item = PlayerId>,
        mut each: impl FnMut(&mut Self, PlayerId) -> Result<(), ProcessError>,
    ) {
        for player in players {
            if let Err(err) = each(self, player) {
                self.warn(format!("skipped {player}: {err}"));
            }
        }
    }

    /// First player of the target range.
    pub fn player(&self) -> PlayerId {
        PlayerId(self.players.start)
    }

    /// Players in range that own a dungeon.
    pub fn dungeon_players(&self) -> Vec<PlayerId> {
        self.players.iter().filter(|p| self.sim.has_dungeon(*p)).collect()
    }

    pub fn apply(&mut self, op: WorldOp) -> Result<(), ProcessError> {
        info!("└─ op: {op:?}");
        self.sim.apply(op)
    }

    /// Map position of `location` as seen by the target player.
    pub fn resolve(&self, location: MapLocation) -> Option<(u16, u16)> {
        location.resolve(&*self.sim, self.player())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub player: PlayerId,
    pub remaining: i64,
}

/// On-screen countdowns the dispatcher runs down once per turn.
#[derive(Debug, Clone, Default)]
pub struct Countdowns {
    entries: Vec<Countdown>,
}

impl Countdowns {
    /// Start (or restart) the countdown shown to `player`.
    pub fn start(&mut self, player: PlayerId, turns: i64) {
        self.entries.retain(|c| c.player != player);
        self.entries.push(Countdown {
            player,
            remaining: turns,
        });
    }

    /// Advance one turn; returns the players whose countdown ran out.
    pub fn tick(&mut self) -> Vec<PlayerId> {
        let mut expired = Vec::new();
        for countdown in &mut self.entries {
            countdown.remaining -= 1;
            if countdown.remaining <= 0 {
                expired.push(countdown.player);
            }
        }
        self.entries.retain(|c| c.remaining > 0);
        expired
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Countdown> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdowns_expire_once() {
        let mut countdowns = Countdowns::default();
        countdowns.start(PlayerId(0), 2);
        countdowns.start(PlayerId(1), 1);
        assert_eq!(countdowns.tick(), vec![PlayerId(1)]);
        assert_eq!(countdowns.tick(), vec![PlayerId(0)]);
        assert!(countdowns.tick().is_empty());
        assert!(countdowns.is_empty());
    }

    #[test]
    fn restarting_replaces_the_old_countdown() {
        let mut countdowns = Countdowns::default();
        countdowns.start(PlayerId(0), 1);
        countdowns.start(PlayerId(0), 3);
        assert_eq!(countdowns.iter().count(), 1);
        assert!(countdowns.tick().is_empty());
    }

    #[test]
    fn reusable_counter_covers_one_line() {
        let mut load = LoadState {
            next_command_reusable: 2,
            ..LoadState::default()
        };
        load.next_command_reusable = load.next_command_reusable.saturating_sub(1);
        assert!(load.reusable());
        load.next_command_reusable = load.next_command_reusable.saturating_sub(1);
        assert!(!load.reusable());
    }
}
