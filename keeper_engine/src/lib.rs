#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const KEEPER_VERSION: &str = env!("CARGO_PKG_VERSION");

// Script compilation
pub mod codec;
pub mod commands;
pub mod registry;
pub mod value;

// Runtime state
pub mod condition;
pub mod context;
pub mod party;
pub mod strings;
pub mod trigger;

// Engine and its world
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod loader;
pub mod location;
pub mod sim;
pub mod world;

// Re-exports for convenience
pub use config::EngineConfig;
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use engine::{FiredTrigger, LoadReport, Outcome, ScriptEngine, TurnReport};
pub use loader::{Session, load_config, load_level_def};
pub use sim::{Simulation, WorldOp};
pub use world::KeeperWorld;
