//! Engine limits and tunables.
//!
//! Every field has a default, so an empty TOML file (or none at all) yields the
//! stock limits the level format was designed around.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Condition table capacity (`IF` and friends).
    pub max_conditions: usize,
    /// Deferred trigger capacity.
    pub max_triggers: usize,
    pub max_parties: usize,
    pub max_party_members: usize,
    /// Limit for `WIN_GAME` and, separately, for `LOSE_GAME`.
    pub max_win_conditions: usize,
    /// Byte budget of the script string arena.
    pub string_pool_bytes: usize,
    pub max_creature_level: u8,
    pub heart_max_health: i64,
    /// Seed for `DRAWFROM` and `RANDOMISE_FLAG`.
    pub rng_seed: u64,
    /// Player whose victory or defeat `WIN_GAME`/`LOSE_GAME` decide.
    pub human_player: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conditions: 48,
            max_triggers: 128,
            max_parties: 16,
            max_party_members: 8,
            max_win_conditions: 4,
            string_pool_bytes: 4096,
            max_creature_level: 10,
            heart_max_health: 30_000,
            rng_seed: 0,
            human_player: 0,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns the TOML error for malformed input or wrongly typed keys.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
