//! The boundary between the script engine and the game simulation.
//!
//! The engine never touches world data directly. It reads through the query
//! methods of [`Simulation`] and changes the world only by handing opaque
//! [`WorldOp`] primitives to [`Simulation::apply`].

use keeper_data::{
    CreatureProperty, DoorProperty, FillKind, FlagStore, GameRule, HeroObjective, MapDef, MessageKind, PlayerId,
    ResearchKind, SacrificeAction, SelectCriteria, TrapProperty, VariableKind,
};
use serde::{Deserialize, Serialize};

use crate::condition::VariableRef;
use crate::diagnostic::ProcessError;

/// Which availability table a query or update addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvailKind {
    Creature,
    Room,
    Door,
    Trap,
    Power,
}

/// Digging target of a tunneller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Heading {
    ActionPoint(u16),
    Dungeon(PlayerId),
    DungeonHeart(PlayerId),
    /// The tunneller picks the dungeon itself.
    AppropriateDungeon,
}

/// Subset of a player's creatures to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatureFilter {
    All,
    Kind(u16),
    Diggers,
    Good,
    Evil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heart {
    pub health: i64,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabState {
    pub owner: PlayerId,
    pub kind: u16,
}

/// Where a message is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Objective,
    Information,
    QuickObjective,
    QuickInformation,
    Message,
    QuickMessage,
}

/// Portrait shown next to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Speaker {
    #[default]
    None,
    Player(PlayerId),
    Creature(u16),
}

/// A single change requested by a script command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldOp {
    SetVariable {
        player: PlayerId,
        store: FlagStore,
        index: u16,
        value: i64,
    },
    SetTimerStart {
        player: PlayerId,
        timer: u16,
        start: i64,
    },
    SetBonusTurn {
        turn: i64,
    },
    SetMoney {
        player: PlayerId,
        amount: i64,
    },
    AddGold {
        player: PlayerId,
        amount: i64,
    },
    SetMaxCreatures {
        player: PlayerId,
        count: i64,
    },
    SetHeartHealth {
        player: PlayerId,
        health: i64,
    },
    HeartAttacked {
        player: PlayerId,
    },
    SetAvailability {
        player: PlayerId,
        kind: AvailKind,
        id: u16,
        can_be_available: i64,
        available: i64,
    },
    SpawnCreature {
        owner: PlayerId,
        creature: u16,
        x: u16,
        y: u16,
        level: u8,
        gold: i64,
        objective: Option<HeroObjective>,
    },
    /// A digger that tunnels towards `heading`, optionally followed by a party.
    SpawnTunneller {
        owner: PlayerId,
        creature: u16,
        x: u16,
        y: u16,
        level: u8,
        gold: i64,
        heading: Heading,
    },
    KillCreatures {
        player: PlayerId,
        creature: Option<u16>,
        criteria: SelectCriteria,
        count: i64,
    },
    ChangeAnnoyance {
        player: PlayerId,
        creature: Option<u16>,
        criteria: SelectCriteria,
        amount: i64,
    },
    /// Raise the first selected creature by `levels`, up to `max_level`.
    LevelUpCreature {
        player: PlayerId,
        creature: Option<u16>,
        criteria: SelectCriteria,
        levels: u8,
        max_level: u8,
    },
    ChangeCreatureOwner {
        player: PlayerId,
        creature: Option<u16>,
        criteria: SelectCriteria,
        new_owner: PlayerId,
    },
    SetCreatureMaxLevel {
        player: PlayerId,
        creature: u16,
        level: u8,
    },
    /// Update the amount of a research entry, adding it when missing.
    SetResearch {
        player: PlayerId,
        kind: ResearchKind,
        id: u16,
        amount: i64,
    },
    /// Drop the default research order before a scripted one is built.
    ClearResearch {
        player: PlayerId,
    },
    SetAlliance {
        player: PlayerId,
        other: PlayerId,
        allied: bool,
    },
    ResetActionPoint {
        id: u16,
    },
    RevealArea {
        player: PlayerId,
        x: u16,
        y: u16,
        radius: u16,
    },
    RevealRect {
        player: PlayerId,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },
    ConcealRect {
        player: PlayerId,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        all: bool,
    },
    SetSlabOwner {
        x: u16,
        y: u16,
        owner: PlayerId,
        fill: FillKind,
    },
    SetSlabType {
        x: u16,
        y: u16,
        kind: u16,
        fill: FillKind,
    },
    CreateEffect {
        effect: i64,
        x: u16,
        y: u16,
        height: i64,
    },
    ShowMessage {
        channel: Channel,
        id: i64,
        text: Option<String>,
        zoom: Option<(u16, u16)>,
        speaker: Speaker,
    },
    PlaySound {
        player: PlayerId,
        kind: MessageKind,
        id: i64,
    },
    ShowDisplay {
        player: PlayerId,
        variable: VariableRef,
        target: i64,
        countdown: bool,
        clock: bool,
    },
    HideDisplay,
    SetGameRule {
        rule: GameRule,
        value: i64,
    },
    SetTrapConfig {
        trap: u16,
        property: TrapProperty,
        value: i64,
        extra: i64,
    },
    SetDoorConfig {
        door: u16,
        property: DoorProperty,
        value: i64,
        extra: i64,
    },
    SetCreatureConfig {
        creature: u16,
        property: CreatureProperty,
        value: i64,
        extra: i64,
    },
    SetSacrificeRecipe {
        action: SacrificeAction,
        reward: i64,
        victims: Vec<u16>,
    },
    RemoveSacrificeRecipe {
        victims: Vec<u16>,
    },
    WinGame {
        player: PlayerId,
    },
    LoseGame {
        player: PlayerId,
    },
}

/// Read and write access the engine needs from a running game.
pub trait Simulation {
    fn game_turn(&self) -> i64;
    fn map(&self) -> MapDef;

    /// Whether the player slot holds a dungeon at all.
    fn has_dungeon(&self, player: PlayerId) -> bool;
    /// Plain per-dungeon statistic (money, battles won, ...).
    fn counter(&self, player: PlayerId, kind: VariableKind) -> i64;
    fn creatures(&self, player: PlayerId, filter: CreatureFilter, controlled_only: bool) -> i64;
    fn room_slabs(&self, player: PlayerId, room: u16) -> i64;
    fn doors(&self, player: PlayerId, door: u16) -> i64;
    fn traps(&self, player: PlayerId, trap: u16) -> i64;
    fn availability(&self, player: PlayerId, kind: AvailKind, id: u16) -> i64;
    fn heart(&self, player: PlayerId) -> Option<Heart>;

    /// Script-settable storage: flags, campaign flags, boxes, sacrifice counters.
    fn variable(&self, player: PlayerId, store: FlagStore, index: u16) -> i64;
    /// Turn a timer was started on; `None` while it is not running.
    fn timer_start(&self, player: PlayerId, timer: u16) -> Option<i64>;
    fn bonus_turn(&self) -> Option<i64>;
    /// Whether a script has already replaced the player's default research order.
    fn research_ordered(&self, player: PlayerId) -> bool;

    fn slab(&self, x: u16, y: u16) -> Option<SlabState>;
    fn action_point(&self, id: u16) -> Option<(u16, u16)>;
    fn hero_gate(&self, id: u16) -> Option<(u16, u16)>;
    fn action_point_triggered(&self, id: u16, player: PlayerId) -> bool;
    fn creature_position(&self, player: PlayerId, creature: u16) -> Option<(u16, u16)>;
    fn room_position(&self, player: PlayerId, room: u16) -> Option<(u16, u16)>;
    fn last_event(&self, player: PlayerId) -> Option<(u16, u16)>;
    fn combat(&self, player: PlayerId) -> Option<(u16, u16)>;

    /// Carry out a script-requested change.
    ///
    /// # Errors
    /// A [`ProcessError`] makes the requesting command invocation a no-op.
    fn apply(&mut self, op: WorldOp) -> Result<(), ProcessError>;
}
