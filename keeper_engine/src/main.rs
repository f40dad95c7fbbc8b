#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Keeper **
//! Runs a level script against a level definition for a number of turns.
//!
//! Usage: `keeper_engine <level.ron> <script.txt> [--turns N] [--config engine.toml] [--json]`

use keeper_engine::diagnostic::Severity;
use keeper_engine::{KEEPER_VERSION, LoadReport, ScriptEngine, Session, TurnReport};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::Serialize;

use log::info;

use std::env;
use std::path::PathBuf;

const DEFAULT_TURNS: usize = 100;

struct Options {
    level: PathBuf,
    script: PathBuf,
    config: Option<PathBuf>,
    turns: usize,
    json: bool,
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut paths = Vec::new();
    let mut config = None;
    let mut turns = DEFAULT_TURNS;
    let mut json = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--turns" => {
                let value = iter.next().context("--turns requires a number")?;
                turns = value.parse().with_context(|| format!("invalid turn count '{value}'"))?;
            },
            "--config" => {
                config = Some(PathBuf::from(iter.next().context("--config requires a filepath")?));
            },
            "--json" => json = true,
            flag if flag.starts_with("--") => bail!("unknown option '{flag}'"),
            path => paths.push(PathBuf::from(path)),
        }
    }
    let [level, script] = <[PathBuf; 2]>::try_from(paths).map_err(|_| {
        anyhow::anyhow!("usage: keeper_engine <level.ron> <script.txt> [--turns N] [--config engine.toml] [--json]")
    })?;
    Ok(Options {
        level,
        script,
        config,
        turns,
        json,
    })
}

#[derive(Serialize)]
struct RunDump<'a> {
    load: &'a LoadReport,
    turns: &'a [TurnReport],
    diagnostics: Vec<&'a keeper_engine::Diagnostic>,
}

fn print_diagnostics(engine: &ScriptEngine) {
    for diagnostic in engine.diagnostics().iter() {
        let label = match diagnostic.severity {
            Severity::Error => "error".bright_red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        println!("{label}: {diagnostic}");
    }
}

fn print_summary(load: &LoadReport, turns: &[TurnReport], engine: &ScriptEngine) {
    println!(
        "{} {} lines, {} run at load, {} triggers, {} conditions, {} parties, {} string bytes",
        "Loaded:".bright_blue().bold(),
        load.lines,
        load.executed,
        load.triggers,
        load.conditions,
        load.parties,
        load.string_bytes,
    );
    for turn in turns.iter().filter(|t| !t.fired.is_empty()) {
        let fired = turn
            .fired
            .iter()
            .map(|f| format!("{} (line {})", f.command, f.line))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{} {fired}", format!("turn {:>5}:", turn.turn).bright_black());
    }
    let outcome = engine.outcome();
    let verdict = if outcome.won {
        "victory".bright_green().bold()
    } else if outcome.lost {
        "defeat".bright_red().bold()
    } else {
        "undecided".normal()
    };
    println!("{} {} turns run, {verdict}", "Result:".bright_blue().bold(), turns.len());
}

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_options(&args)?;
    info!("Start: keeper engine {KEEPER_VERSION}");

    let (mut session, load) = Session::open(&options.level, &options.script, options.config.as_deref())
        .context("while opening level session")?;
    let turns = session.run_turns(options.turns);
    info!("Run complete after {} turns.", turns.len());

    if options.json {
        let dump = RunDump {
            load: &load,
            turns: &turns,
            diagnostics: session.engine.diagnostics().iter().collect(),
        };
        println!("{}", serde_json::to_string_pretty(&dump)?);
    } else {
        print_diagnostics(&session.engine);
        print_summary(&load, &turns, &session.engine);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn options_take_flags_in_any_order() {
        let options = parse_options(&strings(&["--json", "level.ron", "--turns", "12", "demo.txt"])).unwrap();
        assert_eq!(options.level, PathBuf::from("level.ron"));
        assert_eq!(options.script, PathBuf::from("demo.txt"));
        assert_eq!(options.turns, 12);
        assert!(options.json);
        assert!(options.config.is_none());
    }

    #[test]
    fn options_need_both_paths() {
        assert!(parse_options(&strings(&["level.ron"])).is_err());
        assert!(parse_options(&strings(&["a", "b", "--turns"])).is_err());
        assert!(parse_options(&strings(&["a", "b", "--fast"])).is_err());
    }
}
