//! Loader utilities: level definitions, engine configuration and sessions.
//!
//! Level data is RON (`LevelDef`), engine limits are TOML (`EngineConfig`).
//! A [`Session`] pairs a loaded [`ScriptEngine`] with the [`KeeperWorld`] it
//! drives, which is all the command-line runner needs.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use keeper_data::{LevelDef, SymbolCatalog};
use log::info;

use crate::config::EngineConfig;
use crate::engine::{LoadReport, ScriptEngine, TurnReport};
use crate::sim::Simulation;
use crate::world::KeeperWorld;

/// Read a level definition from a RON file.
///
/// # Errors
/// File IO and RON syntax errors.
pub fn load_level_def(path: &Path) -> Result<LevelDef> {
    let text = fs::read_to_string(path).with_context(|| format!("reading level file {}", path.display()))?;
    let level: LevelDef = ron::from_str(&text).with_context(|| format!("parsing level file {}", path.display()))?;
    info!("level \"{}\" read from {}", level.name, path.display());
    Ok(level)
}

/// Read engine limits; without a path the built-in defaults are used.
///
/// # Errors
/// File IO and TOML errors.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        info!("no engine config given, using defaults");
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
    let config =
        EngineConfig::from_toml_str(&text).with_context(|| format!("parsing config file {}", path.display()))?;
    info!("engine config loaded from {}", path.display());
    Ok(config)
}

/// Validate a level definition and return a single aggregated error.
///
/// # Errors
/// Every [`keeper_data::ValidationError`] found, one per line.
pub fn validate_level_def(level: &LevelDef) -> Result<()> {
    let errors = keeper_data::validate_level(level);
    if errors.is_empty() {
        return Ok(());
    }
    let details = errors
        .into_iter()
        .map(|err| format!("- {err}"))
        .collect::<Vec<_>>()
        .join("\n");
    bail!("level definition validation failed:\n{details}");
}

/// A script engine loaded against its own world.
pub struct Session {
    pub engine: ScriptEngine,
    pub world: KeeperWorld,
}

impl Session {
    /// Build the world for `level` and compile `script` into it.
    ///
    /// # Errors
    /// Only an invalid level definition fails; script problems are diagnostics.
    pub fn new(level: &LevelDef, config: EngineConfig, script: &str) -> Result<(Self, LoadReport)> {
        validate_level_def(level)?;
        let mut world = KeeperWorld::from_level(level);
        let mut engine = ScriptEngine::new(config, SymbolCatalog::from_level(level));
        let report = engine.load_script(script, &mut world);
        info!(
            "script loaded: {} lines, {} run at load, {} triggers, {} errors, {} warnings",
            report.lines, report.executed, report.triggers, report.errors, report.warnings
        );
        Ok((Self { engine, world }, report))
    }

    /// Load level, script and optional config from files.
    ///
    /// # Errors
    /// File IO, RON/TOML parsing and level validation.
    pub fn open(level_path: &Path, script_path: &Path, config_path: Option<&Path>) -> Result<(Self, LoadReport)> {
        let level = load_level_def(level_path).context("while loading level definition")?;
        let config = load_config(config_path).context("while loading engine config")?;
        let script = fs::read_to_string(script_path)
            .with_context(|| format!("reading script file {}", script_path.display()))?;
        Self::new(&level, config, &script)
    }

    /// Advance up to `turns` game turns, stopping early once the engine halts.
    pub fn run_turns(&mut self, turns: usize) -> Vec<TurnReport> {
        let mut reports = Vec::with_capacity(turns);
        for _ in 0..turns {
            let report = self.engine.advance_turn(&mut self.world);
            let halted = report.halted;
            reports.push(report);
            if halted {
                info!("engine halted after turn {}", self.world.game_turn());
                break;
            }
            self.world.next_turn();
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_data::{KindDef, PlayerDef};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn level() -> LevelDef {
        LevelDef {
            name: "loader".into(),
            rooms: vec![KindDef { name: "LAIR".into() }],
            players: vec![PlayerDef {
                player: 0,
                heart: Some((12, 12)),
                money: 0,
                campaign_flags: Vec::new(),
            }],
            ..LevelDef::default()
        }
    }

    #[test]
    fn config_defaults_without_a_file() {
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn config_file_overrides_limits() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_triggers = 2").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.max_triggers, 2);
    }

    #[test]
    fn level_file_round_trips_through_ron() {
        let mut file = NamedTempFile::new().unwrap();
        let text = ron::ser::to_string(&level()).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        let loaded = load_level_def(file.path()).unwrap();
        assert_eq!(loaded.name, "loader");
        assert_eq!(loaded.players.len(), 1);
    }

    #[test]
    fn missing_files_carry_context() {
        let err = load_level_def(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(format!("{err:#}").contains("reading level file"));
    }

    #[test]
    fn run_turns_stops_when_halted() {
        let script = "IF(PLAYER0, GAME_TURN >= 2)\nWIN_GAME\nENDIF\n";
        let (mut session, report) = Session::new(&level(), EngineConfig::default(), script).unwrap();
        assert_eq!(report.errors, 0);
        let turns = session.run_turns(10);
        assert_eq!(turns.len(), 3);
        assert!(turns[2].won);
    }
}
