//! The script engine: loads a level script and runs its triggers turn by turn.
//!
//! Loading compiles every line exactly once. Commands outside any condition
//! run on the spot; commands inside an `IF` block, or marked reusable, are
//! stored as triggers. [`ScriptEngine::advance_turn`] then re-evaluates the
//! condition table and fires the triggers whose gate is met, in the order
//! they were created.

use keeper_data::{PlayerId, PlayerRange, SymbolCatalog};
use keeper_script::{ScriptLine, parse_script};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::codec::encode;
use crate::condition::{ConditionRef, ConditionTable};
use crate::config::EngineConfig;
use crate::context::{CheckContext, Countdowns, ExecutionContext, LoadState};
use crate::diagnostic::{Diagnostics, ProcessError, ScriptError};
use crate::party::PartyTable;
use crate::registry::{COMMANDS, CommandDescriptor, CommandId, CommandRegistry};
use crate::sim::{Simulation, WorldOp};
use crate::strings::StringArena;
use crate::trigger::{Trigger, TriggerQueue};
use crate::value::EncodedValue;

/// Summary of one `load_script` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Command lines the parser produced.
    pub lines: usize,
    /// Commands processed while loading.
    pub executed: usize,
    pub triggers: usize,
    pub conditions: usize,
    pub parties: usize,
    pub string_bytes: usize,
    pub level_version: i64,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredTrigger {
    pub index: usize,
    pub command: &'static str,
    pub line: usize,
}

/// What happened during one call to [`ScriptEngine::advance_turn`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub turn: i64,
    pub fired: Vec<FiredTrigger>,
    /// A win condition was met on this turn.
    pub won: bool,
    /// A lose condition was met on this turn.
    pub lost: bool,
    /// The engine stopped dispatching triggers.
    pub halted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub won: bool,
    pub lost: bool,
    pub halted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPass {
    Preload,
    Main,
}

pub struct ScriptEngine {
    config: EngineConfig,
    catalog: SymbolCatalog,
    commands: &'static CommandRegistry,
    conditions: ConditionTable,
    triggers: TriggerQueue,
    parties: PartyTable,
    strings: StringArena,
    countdowns: Countdowns,
    rng: StdRng,
    diagnostics: Diagnostics,
    load: LoadState,
    outcome: Outcome,
}

impl ScriptEngine {
    pub fn new(config: EngineConfig, catalog: SymbolCatalog) -> Self {
        Self {
            conditions: ConditionTable::new(config.max_conditions),
            triggers: TriggerQueue::new(config.max_triggers),
            parties: PartyTable::new(config.max_parties, config.max_party_members),
            strings: StringArena::new(config.string_pool_bytes),
            countdowns: Countdowns::default(),
            rng: StdRng::seed_from_u64(config.rng_seed),
            diagnostics: Diagnostics::default(),
            load: LoadState::default(),
            outcome: Outcome::default(),
            commands: &COMMANDS,
            catalog,
            config,
        }
    }

    /// Drop everything a previous script left behind.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone(), std::mem::take(&mut self.catalog));
    }

    /// Compile `source` against the world in its current state.
    ///
    /// Problems are recorded as diagnostics; the rest of the script still loads.
    pub fn load_script(&mut self, source: &str, sim: &mut dyn Simulation) -> LoadReport {
        let parsed = parse_script(source);
        for err in &parsed.errors {
            self.diagnostics.error(err.line, "", err.error.to_string());
        }
        let commands = self.commands;
        let mut executed = 0;
        for pass in [LoadPass::Preload, LoadPass::Main] {
            for line in &parsed.lines {
                let found = commands.lookup(&line.command);
                let preloaded = found.is_some_and(|(_, descriptor)| descriptor.preloaded);
                if preloaded != (pass == LoadPass::Preload) {
                    continue;
                }
                if pass == LoadPass::Main {
                    self.load.next_command_reusable = self.load.next_command_reusable.saturating_sub(1);
                }
                let Some((id, descriptor)) = found else {
                    self.diagnostics.error(line.line_no, &line.command, ScriptError::UnknownCommand.to_string());
                    continue;
                };
                if self.load_line(id, descriptor, line, sim) {
                    executed += 1;
                }
            }
        }
        self.finish_load();
        LoadReport {
            lines: parsed.lines.len(),
            executed,
            triggers: self.triggers.len(),
            conditions: self.conditions.len(),
            parties: self.parties.len(),
            string_bytes: self.strings.used(),
            level_version: self.load.level_version,
            errors: self.diagnostics.errors().count(),
            warnings: self.diagnostics.warnings().count(),
        }
    }

    /// Check one line and run or store its value. Returns whether it ran.
    fn load_line(
        &mut self,
        id: CommandId,
        descriptor: &'static CommandDescriptor,
        line: &ScriptLine,
        sim: &mut dyn Simulation,
    ) -> bool {
        debug!("line {}: {}", line.line_no, descriptor.name);
        let gate = self.conditions.current();
        let reusable = self.load.reusable();
        let checked = {
            let mut cx = CheckContext {
                line: line.line_no,
                command: descriptor.name,
                allow_ranges: descriptor.opens_block,
                config: &self.config,
                catalog: &self.catalog,
                sim: &*sim,
                conditions: &mut self.conditions,
                parties: &mut self.parties,
                strings: &mut self.strings,
                rng: &mut self.rng,
                load: &mut self.load,
                diagnostics: &mut self.diagnostics,
            };
            encode(&descriptor.signature, &line.args, &mut cx)
                .and_then(|args| (descriptor.check)(&args, &mut cx).map(|value| (value, args.first_player())))
        };
        let (value, players) = match checked {
            Ok((Some(value), players)) => (value, players.unwrap_or_else(PlayerRange::all)),
            Ok((None, _)) => return false,
            Err(err) => {
                self.diagnostics.error(line.line_no, descriptor.name, err.to_string());
                if descriptor.opens_block {
                    self.conditions.push_never();
                }
                return false;
            },
        };
        match gate {
            ConditionRef::Always if !reusable => {
                self.dispatch_immediate(descriptor, &value, players, line.line_no, sim);
                self.release(&value);
                true
            },
            ConditionRef::Never => {
                self.release(&value);
                false
            },
            _ => {
                let trigger = Trigger::new(id, value, players, gate, reusable, line.line_no);
                if let Err(err) = self.triggers.append(trigger) {
                    self.diagnostics.error(line.line_no, descriptor.name, err.to_string());
                    self.release(&value);
                }
                false
            },
        }
    }

    /// Run a command's process function right away.
    pub fn dispatch_immediate(
        &mut self,
        descriptor: &CommandDescriptor,
        value: &EncodedValue,
        players: PlayerRange,
        line: usize,
        sim: &mut dyn Simulation,
    ) {
        if let Err(err) = self.process(descriptor, value, players, line, sim) {
            self.diagnostics.warning(line, descriptor.name, err.to_string());
        }
    }

    /// Fire the trigger at `index`. Returns `false` if it is retired or missing.
    pub fn dispatch_deferred(&mut self, index: usize, sim: &mut dyn Simulation) -> bool {
        let Some(trigger) = self.triggers.get_mut(index).filter(|t| t.is_armed()) else {
            return false;
        };
        trigger.fire();
        let (command, value, players, line, retired) =
            (trigger.command, trigger.value, trigger.players, trigger.line, !trigger.is_armed());
        let commands = self.commands;
        let Some(descriptor) = commands.get(command) else {
            return false;
        };
        info!("Trigger fired: {} (line {line}, trigger {index})", descriptor.name);
        if let Err(err) = self.process(descriptor, &value, players, line, sim) {
            warn!("trigger {index} ({}) did nothing: {err}", descriptor.name);
            self.diagnostics.warning(line, descriptor.name, err.to_string());
        }
        if retired {
            self.release(&value);
        }
        true
    }

    fn process(
        &mut self,
        descriptor: &CommandDescriptor,
        value: &EncodedValue,
        players: PlayerRange,
        line: usize,
        sim: &mut dyn Simulation,
    ) -> Result<(), ProcessError> {
        let Some(process) = descriptor.process.as_ref() else {
            return Ok(());
        };
        let mut cx = ExecutionContext {
            players,
            line,
            command: descriptor.name,
            config: &self.config,
            catalog: &self.catalog,
            sim,
            strings: &self.strings,
            parties: &mut self.parties,
            countdowns: &mut self.countdowns,
            rng: &mut self.rng,
            diagnostics: &mut self.diagnostics,
        };
        process(value, &mut cx)
    }

    fn release(&mut self, value: &EncodedValue) {
        if let Some(handle) = value.string_handle()
            && let Err(err) = self.strings.release(handle)
        {
            warn!("releasing script string: {err}");
        }
    }

    fn finish_load(&mut self) {
        if self.conditions.depth() > 0 {
            self.diagnostics.warning(0, "", format!("{} IF block(s) without ENDIF", self.conditions.depth()));
        }
        if self.load.win_conditions.is_empty() {
            self.diagnostics.warning(0, "", "no WIN_GAME condition; the level cannot be won");
        }
        info!(
            "Used script resources: {}/{} triggers, {}/{} conditions, {} parties, {}/{} string bytes",
            self.triggers.len(),
            self.triggers.capacity(),
            self.conditions.len(),
            self.conditions.capacity(),
            self.parties.len(),
            self.strings.used(),
            self.strings.budget(),
        );
    }

    /// Run one game turn: evaluate conditions, fire due triggers, then check
    /// the win and lose conditions and run down the countdowns.
    pub fn advance_turn(&mut self, sim: &mut dyn Simulation) -> TurnReport {
        let mut report = TurnReport {
            turn: sim.game_turn(),
            halted: self.outcome.halted,
            ..TurnReport::default()
        };
        if self.outcome.halted {
            return report;
        }
        self.conditions.evaluate_all(&*sim);

        let mut due = Vec::new();
        let conditions = &self.conditions;
        self.triggers.for_each_active(|index, trigger| {
            if conditions.is_met(trigger.condition) {
                due.push(index);
            }
        });
        for index in due {
            if self.dispatch_deferred(index, sim) {
                let command = self
                    .triggers
                    .get(index)
                    .and_then(|t| self.commands.get(t.command).map(|d| (d.name, t.line)));
                if let Some((command, line)) = command {
                    report.fired.push(FiredTrigger { index, command, line });
                }
            }
        }

        self.check_outcome(sim, &mut report);
        if !self.countdowns.tick().is_empty() {
            self.apply_quietly(sim, WorldOp::HideDisplay);
        }
        report.halted = self.outcome.halted;
        report
    }

    fn check_outcome(&mut self, sim: &mut dyn Simulation, report: &mut TurnReport) {
        let player = PlayerId(self.config.human_player);
        if !self.outcome.won && any_met(&self.load.win_conditions, &self.conditions) {
            info!("{player} has won the level");
            self.outcome.won = true;
            report.won = true;
            self.apply_quietly(sim, WorldOp::WinGame { player });
            if !self.load.run_after_victory {
                self.outcome.halted = true;
            }
        }
        if !self.outcome.lost && any_met(&self.load.lose_conditions, &self.conditions) {
            info!("{player} has lost the level");
            self.outcome.lost = true;
            self.outcome.halted = true;
            report.lost = true;
            self.apply_quietly(sim, WorldOp::LoseGame { player });
        }
    }

    fn apply_quietly(&mut self, sim: &mut dyn Simulation, op: WorldOp) {
        info!("└─ op: {op:?}");
        if let Err(err) = sim.apply(op) {
            self.diagnostics.warning(0, "", err.to_string());
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    pub fn conditions(&self) -> &ConditionTable {
        &self.conditions
    }

    pub fn triggers(&self) -> &TriggerQueue {
        &self.triggers
    }

    pub fn parties(&self) -> &PartyTable {
        &self.parties
    }

    pub fn strings(&self) -> &StringArena {
        &self.strings
    }

    pub fn countdowns(&self) -> &Countdowns {
        &self.countdowns
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

fn any_met(gates: &[ConditionRef], conditions: &ConditionTable) -> bool {
    gates.iter().any(|gate| conditions.is_met(*gate))
}
