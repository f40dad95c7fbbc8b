//! Command registry.
//!
//! Maps a command word to its [`CommandDescriptor`]: the argument signature,
//! the check function run while the script loads, and the process function
//! run when the command (or the trigger holding it) executes. The built-in
//! table is assembled once, on first use, and is read-only afterwards.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use log::error;

use crate::codec::{ArgList, Signature};
use crate::commands;
use crate::context::{CheckContext, ExecutionContext};
use crate::diagnostic::{ProcessError, ScriptError};
use crate::value::{EncodedValue, Payload};

pub type CheckFn =
    Box<dyn Fn(&ArgList, &mut CheckContext<'_>) -> Result<Option<EncodedValue>, ScriptError> + Send + Sync>;
pub type ProcessFn = Box<dyn Fn(&EncodedValue, &mut ExecutionContext<'_>) -> Result<(), ProcessError> + Send + Sync>;

lazy_static! {
    /// Every command the engine understands.
    pub static ref COMMANDS: CommandRegistry = commands::builtin();
}

/// Index of a descriptor in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub u16);

pub struct CommandDescriptor {
    pub name: &'static str,
    pub signature: Signature,
    pub check: CheckFn,
    /// `None` for control commands, which only act on loader state.
    pub process: Option<ProcessFn>,
    /// Run in the first load pass, before every other command.
    pub preloaded: bool,
    /// Opens an `IF` block; a refusal still has to push a block marker.
    pub opens_block: bool,
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("signature", &self.signature.text())
            .field("process", &self.process.is_some())
            .field("preloaded", &self.preloaded)
            .field("opens_block", &self.opens_block)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
    by_name: HashMap<&'static str, CommandId>,
}

impl CommandRegistry {
    fn insert(&mut self, name: &'static str, signature: &'static str, check: CheckFn, process: Option<ProcessFn>) {
        let signature = match Signature::parse(signature) {
            Ok(signature) => signature,
            Err(err) => {
                error!("command {name}: bad signature \"{signature}\": {err}");
                return;
            },
        };
        if self.by_name.contains_key(name) {
            error!("command {name} registered twice; keeping the first");
            return;
        }
        let Ok(index) = u16::try_from(self.commands.len()) else {
            error!("command table full, dropping {name}");
            return;
        };
        self.by_name.insert(name, CommandId(index));
        self.commands.push(CommandDescriptor {
            name,
            signature,
            check,
            process,
            preloaded: false,
            opens_block: false,
        });
    }

    /// Register a command that produces a `P` payload and runs it later.
    pub fn value<P: Payload + 'static>(
        &mut self,
        name: &'static str,
        signature: &'static str,
        check: fn(&ArgList, &mut CheckContext<'_>) -> Result<P, ScriptError>,
        process: fn(&P, &mut ExecutionContext<'_>) -> Result<(), ProcessError>,
    ) {
        let check: CheckFn = Box::new(move |args: &ArgList, cx: &mut CheckContext<'_>| {
            check(args, cx).map(|payload| Some(payload.wrap()))
        });
        let process: ProcessFn = Box::new(move |value: &EncodedValue, cx: &mut ExecutionContext<'_>| {
            process(P::expect_in(value)?, cx)
        });
        self.insert(name, signature, check, Some(process));
    }

    /// Register a command that only updates loader state.
    pub fn control(
        &mut self,
        name: &'static str,
        signature: &'static str,
        check: fn(&ArgList, &mut CheckContext<'_>) -> Result<(), ScriptError>,
    ) {
        let check: CheckFn =
            Box::new(move |args: &ArgList, cx: &mut CheckContext<'_>| check(args, cx).map(|()| None));
        self.insert(name, signature, check, None);
    }

    /// Register an `IF`-style command.
    pub fn condition(
        &mut self,
        name: &'static str,
        signature: &'static str,
        check: fn(&ArgList, &mut CheckContext<'_>) -> Result<(), ScriptError>,
    ) {
        self.control(name, signature, check);
        if let Some(&CommandId(index)) = self.by_name.get(name) {
            self.commands[usize::from(index)].opens_block = true;
        }
    }

    /// Move a command into the first load pass.
    pub fn preload(&mut self, name: &'static str) {
        match self.by_name.get(name) {
            Some(&CommandId(index)) => self.commands[usize::from(index)].preloaded = true,
            None => error!("cannot preload unknown command {name}"),
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<(CommandId, &CommandDescriptor)> {
        let id = *self.by_name.get(name)?;
        self.get(id).map(|descriptor| (id, descriptor))
    }

    pub fn get(&self, id: CommandId) -> Option<&CommandDescriptor> {
        self.commands.get(usize::from(id.0))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_complete() {
        for name in [
            "IF",
            "ENDIF",
            "SET_FLAG",
            "ADD_TO_PARTY",
            "WIN_GAME",
            "REVEAL_MAP_RECT",
            "SET_SACRIFICE_RECIPE",
            "DISPLAY_COUNTDOWN",
            "MAGIC_AVAILABLE",
            "RESEARCH_ORDER",
            "CHANGE_CREATURE_OWNER",
            "LEVEL_UP_CREATURE",
            "ADD_TUNNELLER_PARTY_TO_LEVEL",
            "EXPORT_VARIABLE",
            "QUICK_INFORMATION_WITH_POS",
            "SET_DOOR_CONFIGURATION",
            "ALLY_PLAYERS",
            "RESET_ACTION_POINT",
        ] {
            assert!(COMMANDS.lookup(name).is_some(), "{name} missing");
        }
        assert!(COMMANDS.iter().all(|c| c.name.chars().all(|ch| !ch.is_ascii_lowercase())));
    }

    #[test]
    fn lookup_is_exact() {
        assert!(COMMANDS.lookup("set_flag").is_none());
        assert!(COMMANDS.lookup("SET_FLAG ").is_none());
    }

    #[test]
    fn flags_are_set_on_the_right_commands() {
        let (_, level_version) = COMMANDS.lookup("LEVEL_VERSION").unwrap();
        assert!(level_version.preloaded);
        let (_, if_cmd) = COMMANDS.lookup("IF").unwrap();
        assert!(if_cmd.opens_block && if_cmd.process.is_none());
        let (_, set_flag) = COMMANDS.lookup("SET_FLAG").unwrap();
        assert!(set_flag.process.is_some() && !set_flag.opens_block);
    }

    #[test]
    fn duplicates_and_bad_signatures_are_skipped() {
        fn ok(_: &ArgList, _: &mut CheckContext<'_>) -> Result<(), ScriptError> {
            Ok(())
        }
        let mut registry = CommandRegistry::default();
        registry.control("ONE", "N", ok);
        registry.control("ONE", "NN", ok);
        registry.control("TWO", "Q", ok);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("ONE").unwrap().1.signature.len(), 1);
    }
}
