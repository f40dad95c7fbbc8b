//! Conditions gating script commands.
//!
//! `IF`-style commands push a [`Condition`] into the [`ConditionTable`] and
//! onto the nesting stack; `ENDIF` pops it. Every command line records the
//! innermost condition in force as its gate. Once per turn the table is
//! re-evaluated front to back, so a parent's status is always current
//! before its children are looked at.

use keeper_data::{
    BOXES_COUNT, CAMPAIGN_FLAGS_COUNT, Comparison, FLAGS_COUNT, FlagStore, GLOBAL_VARIABLES, KEEPERS_COUNT, PlayerId,
    PlayerRange, SymbolCatalog, TIMERS_COUNT, VariableKind, indexed_name, lookup,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use variantly::Variantly;

use crate::diagnostic::CapacityError;
use crate::sim::{AvailKind, CreatureFilter, Simulation};

lazy_static! {
    static ref BOX_RE: Regex = Regex::new(r"^(?i)BOX(\d+)_ACTIVATED$").expect("box regex must compile");
    static ref SACRIFICED_RE: Regex = Regex::new(r"^(?i)SACRIFICED\[([A-Z0-9_]+)\]$").expect("sacrificed regex must compile");
    static ref REWARDED_RE: Regex = Regex::new(r"^(?i)REWARDED\[([A-Z0-9_]+)\]$").expect("rewarded regex must compile");
}

/// A readable value: its kind plus the kind-specific index.
///
/// Slab kinds address a map position: `id` is x and `aux` is y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableRef {
    pub kind: VariableKind,
    pub id: u16,
    pub aux: u16,
}

impl VariableRef {
    pub fn new(kind: VariableKind, id: u16) -> Self {
        Self { kind, id, aux: 0 }
    }

    pub fn store(store: FlagStore, index: u16) -> Self {
        Self::new(store.variable_kind(), index)
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Literal(i64),
    Variable { player: PlayerId, var: VariableRef },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub players: PlayerRange,
    pub op: Comparison,
    pub left: VariableRef,
    pub right: Operand,
    /// Condition in force when this one was opened.
    pub parent: ConditionRef,
}

impl Condition {
    /// Whether `player` satisfies the comparison, ignoring the parent.
    pub fn holds_for(&self, sim: &dyn Simulation, player: PlayerId) -> bool {
        let left = condition_value(sim, player, self.left);
        let right = match self.right {
            Operand::Literal(value) => value,
            Operand::Variable { player, var } => condition_value(sim, player, var),
        };
        self.op.compare(left, right)
    }
}

/// The gate a command or trigger is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Variantly)]
pub enum ConditionRef {
    /// Top level: no condition in force.
    Always,
    /// Body of a refused `IF`: never met.
    Never,
    Index(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConditionStatus {
    pub met: bool,
    pub ever_met: bool,
    /// Became met on the latest evaluation.
    pub just_met: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    condition: Condition,
    status: ConditionStatus,
}

/// Bounded condition table plus the `IF`/`ENDIF` nesting stack used while loading.
#[derive(Debug, Clone)]
pub struct ConditionTable {
    entries: Vec<Entry>,
    capacity: usize,
    stack: Vec<ConditionRef>,
}

impl ConditionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            stack: Vec::new(),
        }
    }

    /// Innermost condition in force.
    pub fn current(&self) -> ConditionRef {
        self.stack.last().copied().unwrap_or(ConditionRef::Always)
    }

    /// Add a condition under the current one and open it.
    ///
    /// # Errors
    /// [`CapacityError`] when the table is full; nothing is pushed.
    pub fn push(&mut self, mut condition: Condition) -> Result<usize, CapacityError> {
        if self.entries.len() >= self.capacity || self.stack.len() >= self.capacity {
            return Err(CapacityError {
                what: "conditions",
                limit: self.capacity,
            });
        }
        condition.parent = self.current();
        self.entries.push(Entry {
            condition,
            status: ConditionStatus::default(),
        });
        let index = self.entries.len() - 1;
        self.stack.push(ConditionRef::Index(index));
        Ok(index)
    }

    /// Open a block whose body never runs (the `IF` heading it was refused).
    pub fn push_never(&mut self) {
        self.stack.push(ConditionRef::Never);
    }

    /// Close the innermost block.
    pub fn pop(&mut self) -> Option<ConditionRef> {
        self.stack.pop()
    }

    /// Number of blocks still open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Condition> {
        self.entries.get(index).map(|e| &e.condition)
    }

    pub fn status(&self, index: usize) -> Option<ConditionStatus> {
        self.entries.get(index).map(|e| e.status)
    }

    pub fn is_met(&self, gate: ConditionRef) -> bool {
        match gate {
            ConditionRef::Always => true,
            ConditionRef::Never => false,
            ConditionRef::Index(index) => self.entries.get(index).is_some_and(|e| e.status.met),
        }
    }

    /// Players a gate applies to; top level covers everyone.
    pub fn players(&self, gate: ConditionRef) -> PlayerRange {
        match gate {
            ConditionRef::Index(index) => self.entries.get(index).map_or_else(PlayerRange::all, |e| e.condition.players),
            ConditionRef::Always | ConditionRef::Never => PlayerRange::all(),
        }
    }

    /// Recompute every status in table order. Returns how many conditions are met.
    pub fn evaluate_all(&mut self, sim: &dyn Simulation) -> usize {
        let mut met_count = 0;
        for index in 0..self.entries.len() {
            let condition = self.entries[index].condition;
            let met = self.is_met(condition.parent) && condition.players.iter().any(|p| condition.holds_for(sim, p));
            let status = &mut self.entries[index].status;
            status.just_met = met && !status.met;
            status.ever_met |= met;
            status.met = met;
            if met {
                met_count += 1;
            }
        }
        met_count
    }
}

/// Current value of a variable for one player.
///
/// Players without a dungeon read 0 for every per-dungeon kind, except
/// `DUNGEON_DESTROYED`, which reads 1.
pub fn condition_value(sim: &dyn Simulation, player: PlayerId, var: VariableRef) -> i64 {
    use VariableKind as V;
    let turn = sim.game_turn();
    match var.kind {
        V::GameTurn => turn,
        V::AllDungeonsDestroyed => i64::from(all_enemy_dungeons_destroyed(sim, player)),
        V::DoorNum => sim.doors(player, var.id),
        V::TrapNum => sim.traps(player, var.id),
        V::BonusTime => sim.bonus_turn().map_or(0, |bonus| bonus.saturating_sub(turn)),
        V::SlabOwner => sim.slab(var.id, var.aux).map_or(-1, |slab| i64::from(slab.owner.0)),
        V::SlabType => sim.slab(var.id, var.aux).map_or(0, |slab| i64::from(slab.kind)),
        V::ActionPointTriggered => i64::from(sim.action_point_triggered(var.id, player)),
        V::CampaignFlag => sim.variable(player, FlagStore::CampaignFlag, var.id),
        V::DungeonDestroyed => i64::from(!sim.has_dungeon(player) || sim.heart(player).is_none()),
        _ if !sim.has_dungeon(player) => 0,
        V::HeartHealth => sim.heart(player).map_or(0, |heart| heart.health),
        V::ManufacturedSold => sim.counter(player, V::TrapsSold).saturating_add(sim.counter(player, V::DoorsSold)),
        V::CreatureNum => sim.creatures(player, CreatureFilter::Kind(var.id), false),
        V::RoomSlabs => sim.room_slabs(player, var.id),
        V::Timer => sim.timer_start(player, var.id).map_or(0, |start| turn.saturating_sub(start)),
        V::Flag => sim.variable(player, FlagStore::Flag, var.id),
        V::BoxActivated => sim.variable(player, FlagStore::BoxActivated, var.id),
        V::Sacrificed => sim.variable(player, FlagStore::Sacrificed, var.id),
        V::Rewarded => sim.variable(player, FlagStore::Rewarded, var.id),
        V::AvailableCreature => sim.availability(player, AvailKind::Creature, var.id),
        V::AvailableRoom => sim.availability(player, AvailKind::Room, var.id),
        V::AvailableDoor => sim.availability(player, AvailKind::Door, var.id),
        V::AvailableTrap => sim.availability(player, AvailKind::Trap, var.id),
        V::ControlsCreature => sim.creatures(player, CreatureFilter::Kind(var.id), true),
        V::ControlsTotalCreatures => sim.creatures(player, CreatureFilter::All, true),
        V::ControlsTotalDiggers => sim.creatures(player, CreatureFilter::Diggers, true),
        V::ControlsGoodCreatures => sim.creatures(player, CreatureFilter::Good, true),
        V::ControlsEvilCreatures => sim.creatures(player, CreatureFilter::Evil, true),
        kind => sim.counter(player, kind),
    }
}

fn all_enemy_dungeons_destroyed(sim: &dyn Simulation, player: PlayerId) -> bool {
    (0..KEEPERS_COUNT)
        .map(PlayerId)
        .filter(|&other| other != player && sim.has_dungeon(other))
        .all(|other| sim.heart(other).is_none())
}

/// Resolve a readable variable name.
///
/// Names are tried in a fixed order: global variables, creature kinds, room
/// kinds, `TIMERn`, `FLAGn`, door kinds, trap kinds, `CAMPAIGN_FLAGn`,
/// `BOXn_ACTIVATED`, `SACRIFICED[..]`, `REWARDED[..]`.
pub fn parse_variable(name: &str, catalog: &SymbolCatalog) -> Option<VariableRef> {
    if let Some(kind) = lookup(GLOBAL_VARIABLES, name) {
        return Some(VariableRef::new(kind, 0));
    }
    if let Some(id) = catalog.creatures.id(name) {
        return Some(VariableRef::new(VariableKind::CreatureNum, id));
    }
    if let Some(id) = catalog.rooms.id(name) {
        return Some(VariableRef::new(VariableKind::RoomSlabs, id));
    }
    if let Some(id) = indexed_name("TIMER", name, TIMERS_COUNT) {
        return Some(VariableRef::new(VariableKind::Timer, id));
    }
    if let Some(id) = indexed_name("FLAG", name, FLAGS_COUNT) {
        return Some(VariableRef::new(VariableKind::Flag, id));
    }
    if let Some(id) = catalog.doors.id(name) {
        return Some(VariableRef::new(VariableKind::DoorNum, id));
    }
    if let Some(id) = catalog.traps.id(name) {
        return Some(VariableRef::new(VariableKind::TrapNum, id));
    }
    parse_settable(name, catalog)
        .filter(|(store, _)| *store != FlagStore::Flag)
        .map(|(store, index)| VariableRef::store(store, index))
}

/// Resolve the name of a script-settable variable.
pub fn parse_settable(name: &str, catalog: &SymbolCatalog) -> Option<(FlagStore, u16)> {
    if let Some(index) = indexed_name("FLAG", name, FLAGS_COUNT) {
        return Some((FlagStore::Flag, index));
    }
    if let Some(index) = indexed_name("CAMPAIGN_FLAG", name, CAMPAIGN_FLAGS_COUNT) {
        return Some((FlagStore::CampaignFlag, index));
    }
    if let Some(caps) = BOX_RE.captures(name) {
        let index: usize = caps[1].parse().ok()?;
        return (index < BOXES_COUNT)
            .then(|| u16::try_from(index).ok())
            .flatten()
            .map(|index| (FlagStore::BoxActivated, index));
    }
    if let Some(caps) = SACRIFICED_RE.captures(name) {
        return catalog.creatures.id(&caps[1]).map(|id| (FlagStore::Sacrificed, id));
    }
    if let Some(caps) = REWARDED_RE.captures(name) {
        return catalog.creatures.id(&caps[1]).map(|id| (FlagStore::Rewarded, id));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::KeeperWorld;
    use keeper_data::{CreatureDef, KindDef, LevelDef};

    fn catalog() -> SymbolCatalog {
        SymbolCatalog::from_level(&LevelDef {
            name: "conditions".into(),
            creatures: vec![CreatureDef {
                name: "TROLL".into(),
                evil: true,
                digger: false,
                spectator: false,
            }],
            rooms: vec![KindDef { name: "LIBRARY".into() }],
            doors: vec![KindDef { name: "WOOD".into() }],
            traps: vec![KindDef { name: "BOULDER".into() }],
            ..LevelDef::default()
        })
    }

    fn flag_condition(value: i64) -> Condition {
        Condition {
            players: PlayerRange::single(PlayerId(0)),
            op: Comparison::Equal,
            left: VariableRef::new(VariableKind::Flag, 0),
            right: Operand::Literal(value),
            parent: ConditionRef::Always,
        }
    }

    #[test]
    fn variable_names_resolve_in_order() {
        let catalog = catalog();
        let var = |name| parse_variable(name, &catalog).map(|v| (v.kind, v.id));
        assert_eq!(var("MONEY"), Some((VariableKind::Money, 0)));
        assert_eq!(var("troll"), Some((VariableKind::CreatureNum, 1)));
        assert_eq!(var("LIBRARY"), Some((VariableKind::RoomSlabs, 1)));
        assert_eq!(var("TIMER7"), Some((VariableKind::Timer, 7)));
        assert_eq!(var("FLAG2"), Some((VariableKind::Flag, 2)));
        assert_eq!(var("WOOD"), Some((VariableKind::DoorNum, 1)));
        assert_eq!(var("BOULDER"), Some((VariableKind::TrapNum, 1)));
        assert_eq!(var("CAMPAIGN_FLAG3"), Some((VariableKind::CampaignFlag, 3)));
        assert_eq!(var("BOX12_ACTIVATED"), Some((VariableKind::BoxActivated, 12)));
        assert_eq!(var("SACRIFICED[TROLL]"), Some((VariableKind::Sacrificed, 1)));
        assert_eq!(var("REWARDED[TROLL]"), Some((VariableKind::Rewarded, 1)));
        assert_eq!(var("SACRIFICED[DRAGON]"), None);
        assert_eq!(var("BOX64_ACTIVATED"), None);
        assert_eq!(var("GOLD"), None);
    }

    #[test]
    fn settable_names_exclude_read_only_kinds() {
        let catalog = catalog();
        assert_eq!(parse_settable("FLAG7", &catalog), Some((FlagStore::Flag, 7)));
        assert_eq!(parse_settable("MONEY", &catalog), None);
        assert_eq!(parse_settable("TIMER0", &catalog), None);
    }

    #[test]
    fn children_follow_their_parent() {
        let mut world = KeeperWorld::new_empty().with_keeper(PlayerId(0), Some((10, 10)));
        let mut table = ConditionTable::new(4);
        let outer = table.push(flag_condition(1)).unwrap();
        let inner = table.push(flag_condition(1)).unwrap();
        assert_eq!(table.get(inner).unwrap().parent, ConditionRef::Index(outer));

        table.evaluate_all(&world);
        assert!(!table.is_met(ConditionRef::Index(inner)));

        world.set_flag(PlayerId(0), 0, 1);
        assert_eq!(table.evaluate_all(&world), 2);
        let status = table.status(inner).unwrap();
        assert!(status.met && status.just_met && status.ever_met);

        table.evaluate_all(&world);
        assert!(!table.status(inner).unwrap().just_met);

        world.set_flag(PlayerId(0), 0, 2);
        table.evaluate_all(&world);
        let status = table.status(outer).unwrap();
        assert!(!status.met && status.ever_met);
    }

    #[test]
    fn capacity_is_enforced_and_never_blocks_stay_closed() {
        let mut table = ConditionTable::new(1);
        table.push(flag_condition(0)).unwrap();
        table.pop();
        let err = table.push(flag_condition(0)).unwrap_err();
        assert_eq!(err.limit, 1);
        table.push_never();
        assert!(table.current().is_never());
        assert!(!table.is_met(table.current()));
        assert_eq!(table.pop(), Some(ConditionRef::Never));
        assert!(table.current().is_always());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn missing_dungeon_reads_zero_and_destroyed() {
        let world = KeeperWorld::new_empty();
        let player = PlayerId(1);
        assert_eq!(condition_value(&world, player, VariableRef::new(VariableKind::Money, 0)), 0);
        assert_eq!(condition_value(&world, player, VariableRef::new(VariableKind::HeartHealth, 0)), 0);
        assert_eq!(
            condition_value(&world, player, VariableRef::new(VariableKind::DungeonDestroyed, 0)),
            1
        );
    }

    #[test]
    fn timers_and_bonus_time_count_from_turns() {
        let mut world = KeeperWorld::new_empty().with_keeper(PlayerId(0), Some((4, 4)));
        let timer = VariableRef::new(VariableKind::Timer, 2);
        assert_eq!(condition_value(&world, PlayerId(0), timer), 0);
        world.set_timer_start(PlayerId(0), 2, 0);
        world.set_turn(25);
        assert_eq!(condition_value(&world, PlayerId(0), timer), 25);
        world.set_bonus_turn(Some(40));
        assert_eq!(
            condition_value(&world, PlayerId(0), VariableRef::new(VariableKind::BonusTime, 0)),
            15
        );
    }

    #[test]
    fn extreme_timer_starts_saturate() {
        let mut world = KeeperWorld::new_empty().with_keeper(PlayerId(0), Some((4, 4)));
        world.set_turn(10);
        world.set_timer_start(PlayerId(0), 0, i64::MIN);
        world.set_bonus_turn(Some(i64::MAX));
        let value = |kind| condition_value(&world, PlayerId(0), VariableRef::new(kind, 0));
        assert_eq!(value(VariableKind::Timer), i64::MAX);
        assert_eq!(value(VariableKind::BonusTime), i64::MAX - 10);
        world.set_turn(-10);
        let value = |kind| condition_value(&world, PlayerId(0), VariableRef::new(kind, 0));
        assert_eq!(value(VariableKind::BonusTime), i64::MAX);
    }

    #[test]
    fn two_variable_mode_compares_players() {
        let mut world = KeeperWorld::new_empty()
            .with_keeper(PlayerId(0), Some((4, 4)))
            .with_keeper(PlayerId(1), Some((40, 40)));
        world.set_flag(PlayerId(0), 1, 3);
        world.set_flag(PlayerId(1), 1, 5);
        let condition = Condition {
            players: PlayerRange::single(PlayerId(0)),
            op: Comparison::Less,
            left: VariableRef::new(VariableKind::Flag, 1),
            right: Operand::Variable {
                player: PlayerId(1),
                var: VariableRef::new(VariableKind::Flag, 1),
            },
            parent: ConditionRef::Always,
        };
        assert!(condition.holds_for(&world, PlayerId(0)));
    }
}
