//! Built-in script commands.
//!
//! Each submodule registers a family of commands: a check function that
//! validates the encoded arguments and builds the payload, and a process
//! function that turns the payload into world operations.

mod flags;
mod flow;
mod map;
mod messages;
mod party;
mod player;
mod rules;

use keeper_data::catalog::NameTable;
use keeper_data::{FlagStore, MapDef, PlayerId, SymbolCatalog};

use crate::codec::{ArgList, CreatureSel};
use crate::condition::parse_settable;
use crate::context::{CheckContext, ExecutionContext};
use crate::diagnostic::{ProcessError, ScriptError};
use crate::location::MapLocation;
use crate::registry::CommandRegistry;

/// The registry of every built-in command.
pub fn builtin() -> CommandRegistry {
    let mut registry = CommandRegistry::default();
    flow::register(&mut registry);
    flags::register(&mut registry);
    player::register(&mut registry);
    party::register(&mut registry);
    map::register(&mut registry);
    messages::register(&mut registry);
    rules::register(&mut registry);
    registry.preload("LEVEL_VERSION");
    registry
}

/// Location argument at `index`, parsed against the current world.
fn location(args: &ArgList, index: usize, cx: &mut CheckContext<'_>) -> Result<MapLocation, ScriptError> {
    let text = args.text(index)?.to_string();
    MapLocation::parse(&text, cx)
}

/// Settable variable named by argument `index`.
fn settable(args: &ArgList, index: usize, catalog: &SymbolCatalog) -> Result<(FlagStore, u16), ScriptError> {
    let name = args.text(index)?;
    parse_settable(name, catalog).ok_or_else(|| ScriptError::UnknownName {
        kind: "flag",
        name: name.to_string(),
    })
}

/// Creature argument that must name one kind rather than `ANY_CREATURE`.
fn creature_kind(args: &ArgList, index: usize) -> Result<u16, ScriptError> {
    match args.creature(index)? {
        CreatureSel::Kind(id) => Ok(id),
        CreatureSel::Any => Err(ScriptError::Invalid("a specific creature is required".to_string())),
    }
}

/// Resolve a kind name from a catalog table, accepting raw ids as well.
fn kind_id(table: &NameTable, kind: &'static str, name: &str) -> Result<u16, ScriptError> {
    if let Some(id) = table.id(name) {
        return Ok(id);
    }
    name.parse::<i64>()
        .ok()
        .filter(|&id| table.contains_id(id))
        .and_then(|id| u16::try_from(id).ok())
        .ok_or_else(|| ScriptError::UnknownName {
            kind,
            name: name.to_string(),
        })
}

/// Integer parameter that must lie in `min..=max`; anything else refuses the command.
fn in_range(what: &'static str, value: i64, min: i64, max: i64) -> Result<i64, ScriptError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ScriptError::OutOfRange { what, value, min, max })
    }
}

fn coordinate(what: &'static str, value: i64, limit: u16) -> Result<u16, ScriptError> {
    let max = i64::from(limit) - 1;
    in_range(what, value, 0, max).and_then(|v| {
        u16::try_from(v).map_err(|_| ScriptError::OutOfRange {
            what,
            value,
            min: 0,
            max,
        })
    })
}

/// Slab position from two number arguments.
fn slab_position(args: &ArgList, x: usize, cx: &CheckContext<'_>) -> Result<(u16, u16), ScriptError> {
    let map = cx.sim.map();
    Ok((
        coordinate("slab x", args.number(x)?, map.width)?,
        coordinate("slab y", args.number(x + 1)?, map.height)?,
    ))
}

/// Subtile position from two number arguments.
fn subtile_position(args: &ArgList, x: usize, cx: &CheckContext<'_>) -> Result<(u16, u16), ScriptError> {
    let map = cx.sim.map();
    let per = MapDef::SUBTILES_PER_SLAB;
    Ok((
        coordinate("subtile x", args.number(x)?, map.width.saturating_mul(per))?,
        coordinate("subtile y", args.number(x + 1)?, map.height.saturating_mul(per))?,
    ))
}

/// Creature level parameter, 1 up to the configured maximum.
fn creature_level(value: i64, cx: &CheckContext<'_>) -> Result<u8, ScriptError> {
    let max = i64::from(cx.config.max_creature_level);
    let level = in_range("creature level", value, 1, max)?;
    u8::try_from(level).map_err(|_| ScriptError::OutOfRange {
        what: "creature level",
        value,
        min: 1,
        max,
    })
}

/// Clamp into `u16` with a warning.
fn clamp_u16(cx: &mut CheckContext<'_>, what: &str, value: i64, min: u16) -> u16 {
    let clamped = cx.clamp(what, value, i64::from(min), i64::from(u16::MAX));
    u16::try_from(clamped).unwrap_or(u16::MAX)
}

/// Resolve a location to coordinates or fail the invocation.
fn position_of(cx: &ExecutionContext<'_>, location: MapLocation, player: PlayerId) -> Result<(u16, u16), ProcessError> {
    location
        .resolve(&*cx.sim, player)
        .ok_or_else(|| ProcessError::Unresolved(location.to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Check-context scaffolding shared by the command tests.

    use keeper_data::{CreatureDef, KindDef, LevelDef, PlayerDef, PointDef, SymbolCatalog};
    use keeper_script::parse_line;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::codec::{ArgList, encode};
    use crate::condition::ConditionTable;
    use crate::config::EngineConfig;
    use crate::context::{CheckContext, LoadState};
    use crate::diagnostic::{Diagnostics, ScriptError};
    use crate::party::PartyTable;
    use crate::registry::COMMANDS;
    use crate::strings::StringArena;
    use crate::value::EncodedValue;
    use crate::world::KeeperWorld;

    pub fn level() -> LevelDef {
        let creature = |name: &str, evil: bool, digger: bool| CreatureDef {
            name: name.into(),
            evil,
            digger,
            spectator: false,
        };
        let kind = |name: &str| KindDef { name: name.into() };
        LevelDef {
            name: "command tests".into(),
            creatures: vec![
                creature("IMP", true, true),
                creature("TROLL", true, false),
                creature("KNIGHT", false, false),
                creature("WIZARD", false, false),
                creature("TUNNELLER", false, true),
            ],
            rooms: vec![kind("TREASURE"), kind("LAIR"), kind("LIBRARY")],
            doors: vec![kind("WOOD"), kind("BRACED")],
            traps: vec![kind("BOULDER"), kind("ALARM")],
            slabs: vec![kind("ROCK"), kind("GOLD"), kind("PATH"), kind("CLAIMED")],
            effects: vec![kind("EFFECT_EXPLOSION_1")],
            powers: vec![kind("POWER_HAND"), kind("POWER_SLAP"), kind("POWER_SIGHT")],
            action_points: vec![PointDef { id: 1, x: 30, y: 30 }],
            hero_gates: vec![PointDef { id: 1, x: 60, y: 60 }],
            players: vec![
                PlayerDef {
                    player: 0,
                    heart: Some((10, 10)),
                    money: 5000,
                    campaign_flags: vec![0, 7],
                },
                PlayerDef {
                    player: 4,
                    heart: None,
                    money: 0,
                    campaign_flags: Vec::new(),
                },
            ],
            ..LevelDef::default()
        }
    }

    /// Owns everything a [`CheckContext`] borrows.
    pub struct Harness {
        pub config: EngineConfig,
        pub catalog: SymbolCatalog,
        pub world: KeeperWorld,
        pub conditions: ConditionTable,
        pub parties: PartyTable,
        pub strings: StringArena,
        pub rng: StdRng,
        pub load: LoadState,
        pub diagnostics: Diagnostics,
    }

    impl Harness {
        pub fn new() -> Self {
            let config = EngineConfig::default();
            let level = level();
            Self {
                catalog: SymbolCatalog::from_level(&level),
                world: KeeperWorld::from_level(&level),
                conditions: ConditionTable::new(config.max_conditions),
                parties: PartyTable::new(config.max_parties, config.max_party_members),
                strings: StringArena::new(config.string_pool_bytes),
                rng: StdRng::seed_from_u64(config.rng_seed),
                load: LoadState::default(),
                diagnostics: Diagnostics::default(),
                config,
            }
        }

        /// Encode and check one script line.
        pub fn check(&mut self, line: &str) -> Result<Option<EncodedValue>, ScriptError> {
            let parsed = parse_line(line, 1).expect("test line parses").expect("test line is a command");
            let (_, descriptor) = COMMANDS.lookup(&parsed.command).ok_or(ScriptError::UnknownCommand)?;
            let mut cx = CheckContext {
                line: 1,
                command: descriptor.name,
                allow_ranges: descriptor.opens_block,
                config: &self.config,
                catalog: &self.catalog,
                sim: &self.world,
                conditions: &mut self.conditions,
                parties: &mut self.parties,
                strings: &mut self.strings,
                rng: &mut self.rng,
                load: &mut self.load,
                diagnostics: &mut self.diagnostics,
            };
            let args: ArgList = encode(&descriptor.signature, &parsed.args, &mut cx)?;
            (descriptor.check)(&args, &mut cx)
        }
    }
}
