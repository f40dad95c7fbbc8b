//! A self-contained reference world.
//!
//! [`KeeperWorld`] implements [`Simulation`] with plain in-memory tables. It
//! has no creature AI, pathing or combat; it only keeps the state scripts
//! read and write, so a level script can be loaded and stepped from the
//! command line and from tests. Every applied operation is also kept in a log.

use std::collections::{BTreeMap, HashMap, HashSet};

use keeper_data::{
    CreatureDef, CreatureProperty, DoorProperty, FillKind, FlagStore, GameRule, LevelDef, MapDef, PLAYER_NEUTRAL,
    PLAYER_SLOTS, PlayerId, ResearchKind, SacrificeAction, SelectCriteria, TrapProperty, VariableKind,
};
use log::info;
use serde::Serialize;

use crate::condition::VariableRef;
use crate::diagnostic::ProcessError;
use crate::sim::{AvailKind, Channel, CreatureFilter, Heading, Heart, SlabState, Simulation, Speaker, WorldOp};

pub const DEFAULT_HEART_HEALTH: i64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Creature {
    pub kind: u16,
    pub level: u8,
    pub x: u16,
    pub y: u16,
    pub gold: i64,
    pub annoyance: i64,
    /// Set for tunnellers.
    pub heading: Option<Heading>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResearchEntry {
    pub kind: ResearchKind,
    pub id: u16,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShownMessage {
    pub channel: Channel,
    pub id: i64,
    pub text: Option<String>,
    pub speaker: Speaker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShownDisplay {
    pub player: PlayerId,
    pub variable: VariableRef,
    pub target: i64,
    pub countdown: bool,
}

#[derive(Debug, Clone, Default)]
struct PlayerState {
    dungeon: bool,
    heart: Option<Heart>,
    counters: HashMap<VariableKind, i64>,
    variables: HashMap<(FlagStore, u16), i64>,
    timers: HashMap<u16, i64>,
    availability: HashMap<(AvailKind, u16), (i64, i64)>,
    creatures: Vec<Creature>,
    /// Room slabs per room kind, in slab coordinates.
    rooms: HashMap<u16, Vec<(u16, u16)>>,
    doors: HashMap<u16, i64>,
    traps: HashMap<u16, i64>,
    max_creatures: Option<i64>,
    action_points: HashSet<u16>,
    research: Vec<ResearchEntry>,
    research_ordered: bool,
    allies: HashSet<PlayerId>,
    /// Level caps set per creature kind.
    max_levels: HashMap<u16, u8>,
    revealed: HashSet<(u16, u16)>,
    last_event: Option<(u16, u16)>,
    combat: Option<(u16, u16)>,
}

/// In-memory game state driven by script operations.
#[derive(Debug, Clone)]
pub struct KeeperWorld {
    turn: i64,
    bonus_turn: Option<i64>,
    map: MapDef,
    creature_defs: Vec<CreatureDef>,
    players: Vec<PlayerState>,
    slabs: HashMap<(u16, u16), SlabState>,
    action_points: BTreeMap<u16, (u16, u16)>,
    hero_gates: BTreeMap<u16, (u16, u16)>,
    rules: HashMap<GameRule, i64>,
    trap_config: HashMap<(u16, TrapProperty), (i64, i64)>,
    door_config: HashMap<(u16, DoorProperty), (i64, i64)>,
    creature_config: HashMap<(u16, CreatureProperty), (i64, i64)>,
    recipes: Vec<(Vec<u16>, SacrificeAction, i64)>,
    messages: Vec<ShownMessage>,
    effects: Vec<(i64, u16, u16)>,
    display: Option<ShownDisplay>,
    winner: Option<PlayerId>,
    loser: Option<PlayerId>,
    ops: Vec<WorldOp>,
}

impl KeeperWorld {
    /// A default-sized map with no dungeons on it.
    pub fn new_empty() -> Self {
        let world = Self {
            turn: 0,
            bonus_turn: None,
            map: MapDef::default(),
            creature_defs: Vec::new(),
            players: vec![PlayerState::default(); PLAYER_SLOTS],
            slabs: HashMap::new(),
            action_points: BTreeMap::new(),
            hero_gates: BTreeMap::new(),
            rules: HashMap::new(),
            trap_config: HashMap::new(),
            door_config: HashMap::new(),
            creature_config: HashMap::new(),
            recipes: Vec::new(),
            messages: Vec::new(),
            effects: Vec::new(),
            display: None,
            winner: None,
            loser: None,
            ops: Vec::new(),
        };
        info!("new, empty 'KeeperWorld' created");
        world
    }

    /// Starting state described by a level definition.
    pub fn from_level(level: &LevelDef) -> Self {
        let mut world = Self::new_empty();
        world.map = level.map;
        world.creature_defs.clone_from(&level.creatures);
        world.action_points = level.action_points.iter().map(|p| (p.id, (p.x, p.y))).collect();
        world.hero_gates = level.hero_gates.iter().map(|p| (p.id, (p.x, p.y))).collect();
        for def in &level.players {
            let player = PlayerId(def.player);
            world = world.with_keeper(player, def.heart);
            if let Some(state) = world.players.get_mut(player.index()) {
                state.counters.insert(VariableKind::Money, def.money);
                for (index, value) in def.campaign_flags.iter().enumerate() {
                    if let Ok(index) = u16::try_from(index) {
                        state.variables.insert((FlagStore::CampaignFlag, index), *value);
                    }
                }
            }
        }
        info!(
            "'KeeperWorld' built for level \"{}\": {} players, {} action points, {} hero gates",
            level.name,
            level.players.len(),
            world.action_points.len(),
            world.hero_gates.len()
        );
        world
    }

    /// Give `player` a dungeon, with a heart at `heart` if one is given.
    pub fn with_keeper(mut self, player: PlayerId, heart: Option<(u16, u16)>) -> Self {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.dungeon = true;
            state.heart = heart.map(|(x, y)| Heart {
                health: DEFAULT_HEART_HEALTH,
                x,
                y,
            });
        }
        self
    }

    pub fn with_map(mut self, map: MapDef) -> Self {
        self.map = map;
        self
    }

    fn state(&self, player: PlayerId) -> Option<&PlayerState> {
        self.players.get(player.index())
    }

    fn state_mut(&mut self, player: PlayerId) -> Result<&mut PlayerState, ProcessError> {
        self.players
            .get_mut(player.index())
            .ok_or_else(|| ProcessError::World(format!("no player slot {}", player.0)))
    }

    fn creature_def(&self, kind: u16) -> Option<&CreatureDef> {
        usize::from(kind).checked_sub(1).and_then(|i| self.creature_defs.get(i))
    }

    fn matches(&self, creature: &Creature, filter: CreatureFilter) -> bool {
        match filter {
            CreatureFilter::All => true,
            CreatureFilter::Kind(kind) => creature.kind == kind,
            CreatureFilter::Diggers => self.creature_def(creature.kind).is_some_and(|d| d.digger),
            CreatureFilter::Good => self.creature_def(creature.kind).is_some_and(|d| !d.evil),
            CreatureFilter::Evil => self.creature_def(creature.kind).is_some_and(|d| d.evil),
        }
    }

    fn check_subtile(&self, x: u16, y: u16) -> Result<(), ProcessError> {
        if self.map.contains_subtile(i64::from(x), i64::from(y)) {
            Ok(())
        } else {
            Err(ProcessError::World(format!("subtile ({x}, {y}) is off the map")))
        }
    }

    fn check_slab(&self, x: u16, y: u16) -> Result<(), ProcessError> {
        if self.map.contains_slab(i64::from(x), i64::from(y)) {
            Ok(())
        } else {
            Err(ProcessError::World(format!("slab ({x}, {y}) is off the map")))
        }
    }

    fn slab_state(&self, x: u16, y: u16) -> SlabState {
        self.slabs.get(&(x, y)).copied().unwrap_or(SlabState {
            owner: PLAYER_NEUTRAL,
            kind: 0,
        })
    }

    /// Slabs a change at `(x, y)` spreads to.
    ///
    /// Every fill mode other than `NONE` spreads through the four-connected
    /// slabs that look exactly like the starting one.
    fn fill_area(&self, x: u16, y: u16, fill: FillKind) -> Vec<(u16, u16)> {
        if fill == FillKind::NoFill {
            return vec![(x, y)];
        }
        let start = self.slab_state(x, y);
        let mut seen = HashSet::from([(x, y)]);
        let mut pending = vec![(x, y)];
        while let Some((cx, cy)) = pending.pop() {
            let neighbours = [
                (cx.checked_sub(1), Some(cy)),
                (cx.checked_add(1), Some(cy)),
                (Some(cx), cy.checked_sub(1)),
                (Some(cx), cy.checked_add(1)),
            ];
            for (nx, ny) in neighbours {
                let (Some(nx), Some(ny)) = (nx, ny) else {
                    continue;
                };
                if self.map.contains_slab(i64::from(nx), i64::from(ny))
                    && self.slab_state(nx, ny) == start
                    && seen.insert((nx, ny))
                {
                    pending.push((nx, ny));
                }
            }
        }
        let mut area: Vec<_> = seen.into_iter().collect();
        area.sort_unstable();
        area
    }

    fn reveal(&mut self, player: PlayerId, x0: i64, y0: i64, x1: i64, y1: i64, reveal: bool) -> Result<(), ProcessError> {
        let per = i64::from(MapDef::SUBTILES_PER_SLAB);
        let (max_x, max_y) = (i64::from(self.map.width) * per - 1, i64::from(self.map.height) * per - 1);
        let state = self.state_mut(player)?;
        for x in x0.max(0)..=x1.min(max_x) {
            for y in y0.max(0)..=y1.min(max_y) {
                let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
                    continue;
                };
                if reveal {
                    state.revealed.insert((x, y));
                } else {
                    state.revealed.remove(&(x, y));
                }
            }
        }
        Ok(())
    }

    fn spawn(
        &mut self,
        owner: PlayerId,
        kind: u16,
        (x, y): (u16, u16),
        level: u8,
        gold: i64,
        heading: Option<Heading>,
    ) -> Result<(), ProcessError> {
        self.check_subtile(x, y)?;
        if self.creature_def(kind).is_none() {
            return Err(ProcessError::World(format!("unknown creature kind {kind}")));
        }
        let state = self.state_mut(owner)?;
        state.creatures.push(Creature {
            kind,
            level,
            x,
            y,
            gold,
            annoyance: 0,
            heading,
        });
        state.last_event = Some((x, y));
        Ok(())
    }

    /// Index of the one creature a single-creature command acts on.
    fn select_one(
        &self,
        player: PlayerId,
        creature: Option<u16>,
        criteria: SelectCriteria,
    ) -> Result<usize, ProcessError> {
        self.select_victims(player, creature, criteria)
            .first()
            .copied()
            .ok_or_else(|| ProcessError::World(format!("{player} has no matching creature")))
    }

    fn select_victims(&self, player: PlayerId, creature: Option<u16>, criteria: SelectCriteria) -> Vec<usize> {
        let Some(state) = self.state(player) else {
            return Vec::new();
        };
        let mut picked: Vec<usize> = state
            .creatures
            .iter()
            .enumerate()
            .filter(|(_, c)| creature.is_none_or(|kind| c.kind == kind))
            .map(|(i, _)| i)
            .collect();
        let level = |i: &usize| state.creatures[*i].level;
        match criteria {
            SelectCriteria::MostExperienced
            | SelectCriteria::MostExpWandering
            | SelectCriteria::MostExpWorking
            | SelectCriteria::MostExpFighting => picked.sort_by_key(|i| std::cmp::Reverse(level(i))),
            SelectCriteria::LeastExperienced
            | SelectCriteria::LeastExpWandering
            | SelectCriteria::LeastExpWorking
            | SelectCriteria::LeastExpFighting => picked.sort_by_key(level),
            SelectCriteria::NearOwnHeart => {
                if let Some(heart) = state.heart {
                    picked.sort_by_key(|i| distance(&state.creatures[*i], heart.x, heart.y));
                }
            },
            _ => {},
        }
        picked
    }

    // Test and tooling setters.

    pub fn set_turn(&mut self, turn: i64) {
        self.turn = turn;
    }

    pub fn next_turn(&mut self) {
        self.turn += 1;
    }

    pub fn set_bonus_turn(&mut self, turn: Option<i64>) {
        self.bonus_turn = turn;
    }

    pub fn set_flag(&mut self, player: PlayerId, index: u16, value: i64) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.variables.insert((FlagStore::Flag, index), value);
        }
    }

    pub fn set_timer_start(&mut self, player: PlayerId, timer: u16, start: i64) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.timers.insert(timer, start);
        }
    }

    pub fn set_counter(&mut self, player: PlayerId, kind: VariableKind, value: i64) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.counters.insert(kind, value);
        }
    }

    pub fn add_creature(&mut self, player: PlayerId, kind: u16, level: u8, at: (u16, u16)) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.creatures.push(Creature {
                kind,
                level,
                x: at.0,
                y: at.1,
                gold: 0,
                annoyance: 0,
                heading: None,
            });
        }
    }

    pub fn add_room_slab(&mut self, player: PlayerId, room: u16, slab: (u16, u16)) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.rooms.entry(room).or_default().push(slab);
        }
    }

    pub fn trigger_action_point(&mut self, id: u16, player: PlayerId) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.action_points.insert(id);
        }
    }

    pub fn set_slab(&mut self, x: u16, y: u16, slab: SlabState) {
        self.slabs.insert((x, y), slab);
    }

    pub fn set_doors(&mut self, player: PlayerId, door: u16, count: i64) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.doors.insert(door, count);
        }
    }

    pub fn set_traps(&mut self, player: PlayerId, trap: u16, count: i64) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.traps.insert(trap, count);
        }
    }

    pub fn set_combat(&mut self, player: PlayerId, at: Option<(u16, u16)>) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.combat = at;
        }
    }

    pub fn destroy_heart(&mut self, player: PlayerId) {
        if let Some(state) = self.players.get_mut(player.index()) {
            state.heart = None;
        }
    }

    // Read-outs.

    pub fn ops(&self) -> &[WorldOp] {
        &self.ops
    }

    pub fn creature_list(&self, player: PlayerId) -> &[Creature] {
        self.state(player).map_or(&[], |s| s.creatures.as_slice())
    }

    pub fn messages(&self) -> &[ShownMessage] {
        &self.messages
    }

    pub fn display(&self) -> Option<ShownDisplay> {
        self.display
    }

    pub fn is_revealed(&self, player: PlayerId, x: u16, y: u16) -> bool {
        self.state(player).is_some_and(|s| s.revealed.contains(&(x, y)))
    }

    pub fn max_creatures(&self, player: PlayerId) -> Option<i64> {
        self.state(player).and_then(|s| s.max_creatures)
    }

    pub fn game_rule(&self, rule: GameRule) -> Option<i64> {
        self.rules.get(&rule).copied()
    }

    pub fn trap_config(&self, trap: u16, property: TrapProperty) -> Option<(i64, i64)> {
        self.trap_config.get(&(trap, property)).copied()
    }

    pub fn door_config(&self, door: u16, property: DoorProperty) -> Option<(i64, i64)> {
        self.door_config.get(&(door, property)).copied()
    }

    pub fn research(&self, player: PlayerId) -> &[ResearchEntry] {
        self.state(player).map_or(&[], |s| s.research.as_slice())
    }

    pub fn is_allied(&self, player: PlayerId, other: PlayerId) -> bool {
        self.state(player).is_some_and(|s| s.allies.contains(&other))
    }

    pub fn creature_max_level(&self, player: PlayerId, creature: u16) -> Option<u8> {
        self.state(player).and_then(|s| s.max_levels.get(&creature).copied())
    }

    pub fn creature_config(&self, creature: u16, property: CreatureProperty) -> Option<(i64, i64)> {
        self.creature_config.get(&(creature, property)).copied()
    }

    /// Reward of the recipe sacrificing exactly `victims` (in any order).
    pub fn recipe(&self, victims: &[u16]) -> Option<(SacrificeAction, i64)> {
        let key = sorted(victims);
        self.recipes.iter().find(|(v, _, _)| *v == key).map(|(_, action, reward)| (*action, *reward))
    }

    pub fn effects(&self) -> &[(i64, u16, u16)] {
        &self.effects
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn loser(&self) -> Option<PlayerId> {
        self.loser
    }

    fn apply_op(&mut self, op: &WorldOp) -> Result<(), ProcessError> {
        match *op {
            WorldOp::SetVariable {
                player,
                store,
                index,
                value,
            } => {
                self.state_mut(player)?.variables.insert((store, index), value);
            },
            WorldOp::SetTimerStart { player, timer, start } => {
                self.state_mut(player)?.timers.insert(timer, start);
            },
            WorldOp::SetBonusTurn { turn } => self.bonus_turn = Some(turn),
            WorldOp::SetMoney { player, amount } => {
                self.state_mut(player)?.counters.insert(VariableKind::Money, amount);
            },
            WorldOp::AddGold { player, amount } => {
                let money = self.state_mut(player)?.counters.entry(VariableKind::Money).or_insert(0);
                *money = money.saturating_add(amount).max(0);
            },
            WorldOp::SetMaxCreatures { player, count } => self.state_mut(player)?.max_creatures = Some(count),
            WorldOp::SetHeartHealth { player, health } => {
                let heart = self.state_mut(player)?.heart.as_mut();
                let heart = heart.ok_or_else(|| ProcessError::World(format!("{player} has no dungeon heart")))?;
                heart.health = health;
            },
            WorldOp::HeartAttacked { player } => {
                let heart = self.state(player).and_then(|s| s.heart);
                self.state_mut(player)?.last_event = heart.map(|h| (h.x, h.y));
            },
            WorldOp::SetAvailability {
                player,
                kind,
                id,
                can_be_available,
                available,
            } => {
                self.state_mut(player)?.availability.insert((kind, id), (can_be_available, available));
            },
            WorldOp::SpawnCreature {
                owner,
                creature,
                x,
                y,
                level,
                gold,
                ..
            } => self.spawn(owner, creature, (x, y), level, gold, None)?,
            WorldOp::SpawnTunneller {
                owner,
                creature,
                x,
                y,
                level,
                gold,
                heading,
            } => self.spawn(owner, creature, (x, y), level, gold, Some(heading))?,
            WorldOp::KillCreatures {
                player,
                creature,
                criteria,
                count,
            } => {
                let take = usize::try_from(count).unwrap_or(0);
                let mut victims: Vec<usize> =
                    self.select_victims(player, creature, criteria).into_iter().take(take).collect();
                victims.sort_unstable_by(|a, b| b.cmp(a));
                let state = self.state_mut(player)?;
                for index in victims {
                    state.creatures.remove(index);
                }
            },
            WorldOp::ChangeAnnoyance {
                player,
                creature,
                criteria,
                amount,
            } => {
                let victims = self.select_victims(player, creature, criteria);
                let state = self.state_mut(player)?;
                for index in victims {
                    let annoyance = &mut state.creatures[index].annoyance;
                    *annoyance = annoyance.saturating_add(amount);
                }
            },
            WorldOp::LevelUpCreature {
                player,
                creature,
                criteria,
                levels,
                max_level,
            } => {
                let index = self.select_one(player, creature, criteria)?;
                let state = self.state_mut(player)?;
                let target = &mut state.creatures[index];
                let cap = state.max_levels.get(&target.kind).map_or(max_level, |&own| own.min(max_level));
                target.level = target.level.saturating_add(levels).min(cap).max(target.level);
            },
            WorldOp::ChangeCreatureOwner {
                player,
                creature,
                criteria,
                new_owner,
            } => {
                self.state_mut(new_owner)?;
                let index = self.select_one(player, creature, criteria)?;
                let moved = self.state_mut(player)?.creatures.remove(index);
                self.state_mut(new_owner)?.creatures.push(moved);
            },
            WorldOp::SetCreatureMaxLevel { player, creature, level } => {
                self.state_mut(player)?.max_levels.insert(creature, level);
            },
            WorldOp::SetResearch {
                player,
                kind,
                id,
                amount,
            } => {
                let research = &mut self.state_mut(player)?.research;
                match research.iter_mut().find(|r| r.kind == kind && r.id == id) {
                    Some(entry) => entry.amount = amount,
                    None => research.push(ResearchEntry { kind, id, amount }),
                }
            },
            WorldOp::ClearResearch { player } => {
                let state = self.state_mut(player)?;
                state.research.clear();
                state.research_ordered = true;
            },
            WorldOp::SetAlliance { player, other, allied } => {
                self.state_mut(other)?;
                for (a, b) in [(player, other), (other, player)] {
                    let allies = &mut self.state_mut(a)?.allies;
                    if allied {
                        allies.insert(b);
                    } else {
                        allies.remove(&b);
                    }
                }
            },
            WorldOp::ResetActionPoint { id } => {
                if !self.action_points.contains_key(&id) {
                    return Err(ProcessError::World(format!("no action point {id}")));
                }
                for state in &mut self.players {
                    state.action_points.remove(&id);
                }
            },
            WorldOp::RevealArea { player, x, y, radius } => {
                let (x, y, r) = (i64::from(x), i64::from(y), i64::from(radius));
                self.reveal(player, x - r, y - r, x + r, y + r, true)?;
            },
            WorldOp::RevealRect {
                player,
                x,
                y,
                width,
                height,
            } => {
                let (x0, y0) = (i64::from(x) - i64::from(width) / 2, i64::from(y) - i64::from(height) / 2);
                self.reveal(player, x0, y0, x0 + i64::from(width) - 1, y0 + i64::from(height) - 1, true)?;
            },
            WorldOp::ConcealRect {
                player,
                x,
                y,
                width,
                height,
                ..
            } => {
                let (x0, y0) = (i64::from(x) - i64::from(width) / 2, i64::from(y) - i64::from(height) / 2);
                self.reveal(player, x0, y0, x0 + i64::from(width) - 1, y0 + i64::from(height) - 1, false)?;
            },
            WorldOp::SetSlabOwner { x, y, owner, fill } => {
                self.check_slab(x, y)?;
                for position in self.fill_area(x, y, fill) {
                    let kind = self.slab_state(position.0, position.1).kind;
                    self.slabs.insert(position, SlabState { owner, kind });
                }
            },
            WorldOp::SetSlabType { x, y, kind, fill } => {
                self.check_slab(x, y)?;
                for position in self.fill_area(x, y, fill) {
                    let owner = self.slab_state(position.0, position.1).owner;
                    self.slabs.insert(position, SlabState { owner, kind });
                }
            },
            WorldOp::CreateEffect { effect, x, y, .. } => {
                self.check_subtile(x, y)?;
                self.effects.push((effect, x, y));
            },
            WorldOp::ShowMessage {
                channel,
                id,
                ref text,
                speaker,
                ..
            } => self.messages.push(ShownMessage {
                channel,
                id,
                text: text.clone(),
                speaker,
            }),
            WorldOp::PlaySound { .. } => {},
            WorldOp::ShowDisplay {
                player,
                variable,
                target,
                countdown,
                ..
            } => {
                self.display = Some(ShownDisplay {
                    player,
                    variable,
                    target,
                    countdown,
                });
            },
            WorldOp::HideDisplay => self.display = None,
            WorldOp::SetGameRule { rule, value } => {
                self.rules.insert(rule, value);
            },
            WorldOp::SetTrapConfig {
                trap,
                property,
                value,
                extra,
            } => {
                self.trap_config.insert((trap, property), (value, extra));
            },
            WorldOp::SetDoorConfig {
                door,
                property,
                value,
                extra,
            } => {
                self.door_config.insert((door, property), (value, extra));
            },
            WorldOp::SetCreatureConfig {
                creature,
                property,
                value,
                extra,
            } => {
                self.creature_config.insert((creature, property), (value, extra));
            },
            WorldOp::SetSacrificeRecipe {
                action,
                reward,
                ref victims,
            } => {
                let key = sorted(victims);
                self.recipes.retain(|(v, _, _)| *v != key);
                self.recipes.push((key, action, reward));
            },
            WorldOp::RemoveSacrificeRecipe { ref victims } => {
                let key = sorted(victims);
                let before = self.recipes.len();
                self.recipes.retain(|(v, _, _)| *v != key);
                if self.recipes.len() == before {
                    return Err(ProcessError::World("no sacrifice recipe with these victims".to_string()));
                }
            },
            WorldOp::WinGame { player } => self.winner = Some(player),
            WorldOp::LoseGame { player } => self.loser = Some(player),
        }
        Ok(())
    }
}

impl Default for KeeperWorld {
    fn default() -> Self {
        Self::new_empty()
    }
}

fn sorted(victims: &[u16]) -> Vec<u16> {
    let mut key = victims.to_vec();
    key.sort_unstable();
    key
}

fn count_of(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn distance(creature: &Creature, x: u16, y: u16) -> u32 {
    u32::from(creature.x.abs_diff(x)) + u32::from(creature.y.abs_diff(y))
}

impl Simulation for KeeperWorld {
    fn game_turn(&self) -> i64 {
        self.turn
    }

    fn map(&self) -> MapDef {
        self.map
    }

    fn has_dungeon(&self, player: PlayerId) -> bool {
        self.state(player).is_some_and(|s| s.dungeon)
    }

    fn counter(&self, player: PlayerId, kind: VariableKind) -> i64 {
        let Some(state) = self.state(player) else {
            return 0;
        };
        let count = |filter| self.creatures(player, filter, false);
        match kind {
            VariableKind::TotalCreatures => count(CreatureFilter::All),
            VariableKind::TotalDiggers => count(CreatureFilter::Diggers),
            VariableKind::GoodCreatures => count(CreatureFilter::Good),
            VariableKind::EvilCreatures => count(CreatureFilter::Evil),
            VariableKind::TotalDoors => state.doors.values().sum(),
            VariableKind::TotalArea => state.rooms.values().map(|slabs| count_of(slabs.len())).sum(),
            kind => state.counters.get(&kind).copied().unwrap_or(0),
        }
    }

    /// Every creature here is under its owner's control.
    fn creatures(&self, player: PlayerId, filter: CreatureFilter, _controlled_only: bool) -> i64 {
        self.state(player)
            .map_or(0, |s| count_of(s.creatures.iter().filter(|c| self.matches(c, filter)).count()))
    }

    fn room_slabs(&self, player: PlayerId, room: u16) -> i64 {
        self.state(player)
            .and_then(|s| s.rooms.get(&room))
            .map_or(0, |slabs| count_of(slabs.len()))
    }

    fn doors(&self, player: PlayerId, door: u16) -> i64 {
        self.state(player).and_then(|s| s.doors.get(&door).copied()).unwrap_or(0)
    }

    fn traps(&self, player: PlayerId, trap: u16) -> i64 {
        self.state(player).and_then(|s| s.traps.get(&trap).copied()).unwrap_or(0)
    }

    fn availability(&self, player: PlayerId, kind: AvailKind, id: u16) -> i64 {
        self.state(player)
            .and_then(|s| s.availability.get(&(kind, id)))
            .map_or(0, |(_, available)| *available)
    }

    fn heart(&self, player: PlayerId) -> Option<Heart> {
        self.state(player).and_then(|s| s.heart)
    }

    fn variable(&self, player: PlayerId, store: FlagStore, index: u16) -> i64 {
        self.state(player)
            .and_then(|s| s.variables.get(&(store, index)).copied())
            .unwrap_or(0)
    }

    fn timer_start(&self, player: PlayerId, timer: u16) -> Option<i64> {
        self.state(player).and_then(|s| s.timers.get(&timer).copied())
    }

    fn bonus_turn(&self) -> Option<i64> {
        self.bonus_turn
    }

    fn research_ordered(&self, player: PlayerId) -> bool {
        self.state(player).is_some_and(|s| s.research_ordered)
    }

    fn slab(&self, x: u16, y: u16) -> Option<SlabState> {
        self.map
            .contains_slab(i64::from(x), i64::from(y))
            .then(|| self.slab_state(x, y))
    }

    fn action_point(&self, id: u16) -> Option<(u16, u16)> {
        self.action_points.get(&id).copied()
    }

    fn hero_gate(&self, id: u16) -> Option<(u16, u16)> {
        self.hero_gates.get(&id).copied()
    }

    fn action_point_triggered(&self, id: u16, player: PlayerId) -> bool {
        self.state(player).is_some_and(|s| s.action_points.contains(&id))
    }

    fn creature_position(&self, player: PlayerId, creature: u16) -> Option<(u16, u16)> {
        self.state(player)?
            .creatures
            .iter()
            .find(|c| c.kind == creature)
            .map(|c| (c.x, c.y))
    }

    fn room_position(&self, player: PlayerId, room: u16) -> Option<(u16, u16)> {
        let per = MapDef::SUBTILES_PER_SLAB;
        let &(x, y) = self.state(player)?.rooms.get(&room)?.first()?;
        Some((x.saturating_mul(per) + per / 2, y.saturating_mul(per) + per / 2))
    }

    fn last_event(&self, player: PlayerId) -> Option<(u16, u16)> {
        self.state(player).and_then(|s| s.last_event)
    }

    fn combat(&self, player: PlayerId) -> Option<(u16, u16)> {
        self.state(player).and_then(|s| s.combat)
    }

    fn apply(&mut self, op: WorldOp) -> Result<(), ProcessError> {
        self.apply_op(&op)?;
        self.ops.push(op);
        Ok(())
    }
}
