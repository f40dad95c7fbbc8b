use serde::{Deserialize, Serialize};

/// Static level data the script engine is loaded against.
///
/// Produced by the level editor / configuration loaders and read from RON. The
/// kind lists populate the name catalogs; their order defines the ids scripts
/// are compiled to (first entry is id 1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelDef {
    pub name: String,
    #[serde(default)]
    pub map: MapDef,
    #[serde(default)]
    pub creatures: Vec<CreatureDef>,
    #[serde(default)]
    pub rooms: Vec<KindDef>,
    #[serde(default)]
    pub doors: Vec<KindDef>,
    #[serde(default)]
    pub traps: Vec<KindDef>,
    #[serde(default)]
    pub slabs: Vec<KindDef>,
    #[serde(default)]
    pub effects: Vec<KindDef>,
    /// Keeper powers (spells) that `MAGIC_AVAILABLE` and `RESEARCH` name.
    #[serde(default)]
    pub powers: Vec<KindDef>,
    #[serde(default)]
    pub action_points: Vec<PointDef>,
    #[serde(default)]
    pub hero_gates: Vec<PointDef>,
    #[serde(default)]
    pub players: Vec<PlayerDef>,
}

/// Map dimensions in slabs. One slab is 3×3 subtiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDef {
    pub width: u16,
    pub height: u16,
}

impl Default for MapDef {
    fn default() -> Self {
        Self { width: 85, height: 85 }
    }
}

impl MapDef {
    pub const SUBTILES_PER_SLAB: u16 = 3;

    pub fn contains_slab(&self, x: i64, y: i64) -> bool {
        (0..i64::from(self.width)).contains(&x) && (0..i64::from(self.height)).contains(&y)
    }

    pub fn contains_subtile(&self, x: i64, y: i64) -> bool {
        let per = i64::from(Self::SUBTILES_PER_SLAB);
        (0..i64::from(self.width) * per).contains(&x) && (0..i64::from(self.height) * per).contains(&y)
    }
}

/// A named kind (room, door, trap, slab, effect, power).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDef {
    pub name: String,
}

/// A creature kind with the traits conditions filter on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureDef {
    pub name: String,
    #[serde(default)]
    pub evil: bool,
    #[serde(default)]
    pub digger: bool,
    #[serde(default)]
    pub spectator: bool,
}

/// A numbered map point (action point or hero gate) in subtile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointDef {
    pub id: u16,
    pub x: u16,
    pub y: u16,
}

/// Starting state of one player slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerDef {
    pub player: u8,
    /// Subtile position of the dungeon heart; `None` for players without one.
    #[serde(default)]
    pub heart: Option<(u16, u16)>,
    #[serde(default)]
    pub money: i64,
    #[serde(default)]
    pub campaign_flags: Vec<i64>,
}
