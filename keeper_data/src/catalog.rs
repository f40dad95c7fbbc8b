//! Name catalogs built from a [`LevelDef`].
//!
//! The static tables in [`crate::symbols`] cover words the engine itself
//! defines. Creature, room, door, trap, slab, effect and power names come from the
//! level's configuration instead and are resolved here.

use crate::defs::{CreatureDef, KindDef, LevelDef};

/// Ordered list of names; ids are 1-based positions, 0 means "none".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: Vec<String>,
}

impl NameTable {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-insensitive name lookup.
    pub fn id(&self, name: &str) -> Option<u16> {
        self.names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .and_then(|idx| u16::try_from(idx + 1).ok())
    }

    pub fn name(&self, id: u16) -> Option<&str> {
        let idx = usize::from(id).checked_sub(1)?;
        self.names.get(idx).map(String::as_str)
    }

    /// Whether `id` addresses an entry (used for raw numeric fallbacks).
    pub fn contains_id(&self, id: i64) -> bool {
        id >= 1 && usize::try_from(id).is_ok_and(|n| n <= self.names.len())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Every level-defined name table the script engine resolves words against.
#[derive(Debug, Clone, Default)]
pub struct SymbolCatalog {
    pub creatures: NameTable,
    pub rooms: NameTable,
    pub doors: NameTable,
    pub traps: NameTable,
    pub slabs: NameTable,
    pub effects: NameTable,
    pub powers: NameTable,
    creature_defs: Vec<CreatureDef>,
}

impl SymbolCatalog {
    pub fn from_level(level: &LevelDef) -> Self {
        fn names(kinds: &[KindDef]) -> NameTable {
            NameTable::new(kinds.iter().map(|k| k.name.clone()))
        }
        Self {
            creatures: NameTable::new(level.creatures.iter().map(|c| c.name.clone())),
            rooms: names(&level.rooms),
            doors: names(&level.doors),
            traps: names(&level.traps),
            slabs: names(&level.slabs),
            effects: names(&level.effects),
            powers: names(&level.powers),
            creature_defs: level.creatures.clone(),
        }
    }

    /// First creature kind that digs for the heroes, used to lead tunneller parties.
    pub fn hero_digger(&self) -> Option<u16> {
        self.creature_defs
            .iter()
            .position(|c| c.digger && !c.evil)
            .and_then(|idx| u16::try_from(idx + 1).ok())
    }

    /// Traits of a creature kind by id.
    pub fn creature(&self, id: u16) -> Option<&CreatureDef> {
        let idx = usize::from(id).checked_sub(1)?;
        self.creature_defs.get(idx)
    }
}
