//! Static symbol tables.
//!
//! Every table maps the names a level designer writes in a script to a small
//! typed id. Lookups are case-insensitive, matching how the game has always
//! treated script words.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declares a closed symbol table as a `Copy` enum with name lookup.
macro_rules! named_symbols {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            /// Every entry of the table, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The script word for this entry.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Case-insensitive lookup of a script word.
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|s| s.name().eq_ignore_ascii_case(name))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub const KEEPERS_COUNT: u8 = 4;
pub const PLAYER_GOOD: PlayerId = PlayerId(4);
pub const PLAYER_NEUTRAL: PlayerId = PlayerId(5);
/// Number of player slots a range may address (keepers, heroes, neutral).
pub const PLAYER_SLOTS: usize = 6;

pub const TIMERS_COUNT: usize = 8;
pub const FLAGS_COUNT: usize = 8;
pub const CAMPAIGN_FLAGS_COUNT: usize = 8;
pub const BOXES_COUNT: usize = 64;

/// Index of a single player slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn is_keeper(self) -> bool {
        self.0 < KEEPERS_COUNT
    }

    /// Script word naming this player.
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "PLAYER0",
            1 => "PLAYER1",
            2 => "PLAYER2",
            3 => "PLAYER3",
            4 => "PLAYER_GOOD",
            5 => "PLAYER_NEUTRAL",
            _ => "PLAYER_INVALID",
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A half-open range of player slots, `[start, end)`.
///
/// `ALL_PLAYERS` covers the keepers and the heroes; a named player covers only itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRange {
    pub start: u8,
    pub end: u8,
}

impl PlayerRange {
    pub const ALL_NAME: &'static str = "ALL_PLAYERS";

    pub fn all() -> Self {
        Self {
            start: 0,
            end: PLAYER_GOOD.0 + 1,
        }
    }

    pub fn single(player: PlayerId) -> Self {
        Self {
            start: player.0,
            end: player.0 + 1,
        }
    }

    /// Resolve a player word (`PLAYER0`..`PLAYER3`, `PLAYER_GOOD`, `PLAYER_NEUTRAL`, `ALL_PLAYERS`).
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case(Self::ALL_NAME) {
            return Some(Self::all());
        }
        (0..u8::try_from(PLAYER_SLOTS).unwrap_or(u8::MAX))
            .map(PlayerId)
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .map(Self::single)
    }

    pub fn is_all(self) -> bool {
        self == Self::all()
    }

    /// The only player in this range, or `None` for a collective range.
    pub fn single_player(self) -> Option<PlayerId> {
        (self.end == self.start + 1).then_some(PlayerId(self.start))
    }

    pub fn contains(self, player: PlayerId) -> bool {
        (self.start..self.end).contains(&player.0)
    }

    pub fn iter(self) -> impl Iterator<Item = PlayerId> {
        (self.start..self.end).map(PlayerId)
    }
}

impl Default for PlayerRange {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for PlayerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.single_player() {
            Some(player) => write!(f, "{player}"),
            None if self.is_all() => f.write_str(Self::ALL_NAME),
            None => write!(f, "players {}..{}", self.start, self.end),
        }
    }
}

named_symbols! {
    /// Comparison operators usable in `IF` conditions.
    pub enum Comparison {
        Equal => "==",
        NotEqual => "!=",
        Less => "<",
        Greater => ">",
        LessOrEqual => "<=",
        GreaterOrEqual => ">=",
    }
}

impl Comparison {
    /// Like `from_name`, but also accepts the single `=` some older scripts use.
    pub fn from_token(token: &str) -> Option<Self> {
        if token == "=" {
            return Some(Comparison::Equal);
        }
        Self::from_name(token)
    }

    pub fn compare(self, left: i64, right: i64) -> bool {
        match self {
            Comparison::Equal => left == right,
            Comparison::NotEqual => left != right,
            Comparison::Less => left < right,
            Comparison::Greater => left > right,
            Comparison::LessOrEqual => left <= right,
            Comparison::GreaterOrEqual => left >= right,
        }
    }
}

named_symbols! {
    /// Arithmetic applied by `COMPUTE_FLAG`.
    pub enum ScriptOperator {
        Set => "SET",
        Increase => "INCREASE",
        Decrease => "DECREASE",
        Multiply => "MULTIPLY",
    }
}

impl ScriptOperator {
    pub fn apply(self, current: i64, operand: i64) -> i64 {
        match self {
            ScriptOperator::Set => operand,
            ScriptOperator::Increase => current.saturating_add(operand),
            ScriptOperator::Decrease => current.saturating_sub(operand),
            ScriptOperator::Multiply => current.saturating_mul(operand),
        }
    }
}

named_symbols! {
    /// Orders given to hero party members.
    pub enum HeroObjective {
        StealGold => "STEAL_GOLD",
        StealSpells => "STEAL_SPELLS",
        AttackEnemies => "ATTACK_ENEMIES",
        AttackDungeonHeart => "ATTACK_DUNGEON_HEART",
        AttackRooms => "ATTACK_ROOMS",
        DefendParty => "DEFEND_PARTY",
        DefendLocation => "DEFEND_LOCATION",
        DefendHeart => "DEFEND_HEART",
        DefendRooms => "DEFEND_ROOMS",
    }
}

named_symbols! {
    pub enum MessageKind {
        Speech => "SPEECH",
        Sound => "SOUND",
    }
}

named_symbols! {
    /// How `KILL_CREATURE` and `CHANGE_CREATURES_ANNOYANCE` pick their victims.
    pub enum SelectCriteria {
        MostExperienced => "MOST_EXPERIENCED",
        MostExpWandering => "MOST_EXP_WANDERING",
        MostExpWorking => "MOST_EXP_WORKING",
        MostExpFighting => "MOST_EXP_FIGHTING",
        LeastExperienced => "LEAST_EXPERIENCED",
        LeastExpWandering => "LEAST_EXP_WANDERING",
        LeastExpWorking => "LEAST_EXP_WORKING",
        LeastExpFighting => "LEAST_EXP_FIGHTING",
        NearOwnHeart => "NEAR_OWN_HEART",
        NearEnemyHeart => "NEAR_ENEMY_HEART",
        OnEnemyGround => "ON_ENEMY_GROUND",
        OnFriendlyGround => "ON_FRIENDLY_GROUND",
        OnNeutralGround => "ON_NEUTRAL_GROUND",
        Anywhere => "ANYWHERE",
    }
}

named_symbols! {
    /// Neighbour fill applied when a slab changes owner or type.
    pub enum FillKind {
        NoFill => "NONE",
        Match => "MATCH",
        Floor => "FLOOR",
        Bridge => "BRIDGE",
    }
}

named_symbols! {
    /// Outcome of a sacrifice recipe.
    pub enum SacrificeAction {
        MakeCreature => "MKCREATURE",
        MakeGoodHero => "MKGOODHERO",
        NegativeSpellAll => "NEGSPELLALL",
        PositiveSpellAll => "POSSPELLALL",
        NegativeUniqueFunction => "NEGUNIQFUNC",
        PositiveUniqueFunction => "POSUNIQFUNC",
        CustomReward => "CUSTOMREWARD",
        CustomPunish => "CUSTOMPUNISH",
    }
}

named_symbols! {
    pub enum GameRule {
        BodiesForVampire => "BodiesForVampire",
        PrisonSkeletonChance => "PrisonSkeletonChance",
        GhostConvertChance => "GhostConvertChance",
        TortureConvertChance => "TortureConvertChance",
        TortureDeathChance => "TortureDeathChance",
        FoodGenerationSpeed => "FoodGenerationSpeed",
        StunEvilEnemyChance => "StunEvilEnemyChance",
        StunGoodEnemyChance => "StunGoodEnemyChance",
        BodyRemainsFor => "BodyRemainsFor",
        FightHateKillValue => "FightHateKillValue",
        PreserveClassicBugs => "PreserveClassicBugs",
        DungeonHeartHealHealth => "DungeonHeartHealHealth",
        ImpWorkExperience => "ImpWorkExperience",
        GemEffectiveness => "GemEffectiveness",
        RoomSellGoldBackPercent => "RoomSellGoldBackPercent",
        DoorSellValuePercent => "DoorSellValuePercent",
        TrapSellValuePercent => "TrapSellValuePercent",
        PayDayGap => "PayDayGap",
        PayDaySpeed => "PayDaySpeed",
        PayDayProgress => "PayDayProgress",
        PlaceTrapsOnSubtiles => "PlaceTrapsOnSubtiles",
        DiseaseHpTemplePercentage => "DiseaseHPTemplePercentage",
        DungeonHeartHealth => "DungeonHeartHealth",
    }
}

named_symbols! {
    pub enum TrapProperty {
        NameTextId => "NameTextID",
        TooltipTextId => "TooltipTextID",
        SymbolSprites => "SymbolSprites",
        PointerSprites => "PointerSprites",
        PanelTabIndex => "PanelTabIndex",
        Crate => "Crate",
        ManufactureLevel => "ManufactureLevel",
        ManufactureRequired => "ManufactureRequired",
        Shots => "Shots",
        TimeBetweenShots => "TimeBetweenShots",
        SellingValue => "SellingValue",
        Model => "Model",
        ModelSize => "ModelSize",
        AnimationSpeed => "AnimationSpeed",
        TriggerType => "TriggerType",
        ActivationType => "ActivationType",
        EffectType => "EffectType",
        Hidden => "Hidden",
        TriggerAlarm => "TriggerAlarm",
        Slappable => "Slappable",
        Unanimated => "Unanimated",
    }
}

named_symbols! {
    pub enum CreatureProperty {
        Health => "Health",
        HealRequirement => "HealRequirement",
        HealThreshold => "HealThreshold",
        Strength => "Strength",
        Armour => "Armour",
        Dexterity => "Dexterity",
        FearWounded => "FearWounded",
        FearStronger => "FearStronger",
        Defence => "Defence",
        Luck => "Luck",
        Recovery => "Recovery",
        HungerRate => "HungerRate",
        HungerFill => "HungerFill",
        LairSize => "LairSize",
        HurtByLava => "HurtByLava",
        BaseSpeed => "BaseSpeed",
        GoldHold => "GoldHold",
        Size => "Size",
        AttackPreference => "AttackPreference",
        Pay => "Pay",
        SlapsToKill => "SlapsToKill",
        Loyalty => "Loyalty",
    }
}

named_symbols! {
    pub enum DoorProperty {
        ManufactureLevel => "ManufactureLevel",
        ManufactureRequired => "ManufactureRequired",
        Health => "Health",
        SellingValue => "SellingValue",
        NameTextId => "NametextId",
        TooltipTextId => "TooltipTextId",
        Crate => "Crate",
        SymbolSprites => "SymbolSprites",
        PointerSprites => "PointerSprites",
        PanelTabIndex => "PanelTabIndex",
    }
}

named_symbols! {
    /// Research list a `RESEARCH` or `RESEARCH_ORDER` entry belongs to.
    pub enum ResearchKind {
        Power => "MAGIC",
        Room => "ROOM",
        Creature => "CREATURE",
    }
}

named_symbols! {
    /// Where a tunneller digs towards. The spelling of the last entry is the one
    /// scripts have always used.
    pub enum HeadFor {
        ActionPoint => "ACTION_POINT",
        Dungeon => "DUNGEON",
        DungeonHeart => "DUNGEON_HEART",
        AppropriateDungeon => "APPROPIATE_DUNGEON",
    }
}

/// Which value a condition or display command addresses.
///
/// Global kinds are named directly in scripts; the rest are produced by the
/// variable parser from indexed names (`FLAG3`, `SACRIFICED[TROLL]`) or by the
/// specialised `IF_*` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    Money,
    GameTurn,
    BreakIn,
    TotalDiggers,
    TotalCreatures,
    TotalResearch,
    TotalDoors,
    TotalArea,
    TotalCreaturesLeft,
    CreaturesAnnoyed,
    BattlesLost,
    BattlesWon,
    RoomsDestroyed,
    SpellsStolen,
    TimesBrokenInto,
    GoldPotsStolen,
    HeartHealth,
    GhostsRaised,
    SkeletonsRaised,
    VampiresRaised,
    CreaturesConverted,
    EvilCreaturesConverted,
    GoodCreaturesConverted,
    TimesAnnoyedCreature,
    TimesTorturedCreature,
    TotalDoorsManufactured,
    TotalTrapsManufactured,
    TotalManufactured,
    TotalTrapsUsed,
    TotalDoorsUsed,
    KeepersDestroyed,
    CreaturesSacrificed,
    CreaturesFromSacrifice,
    TimesLevelupCreature,
    TotalSalary,
    CurrentSalary,
    DungeonDestroyed,
    TotalGoldMined,
    DoorsDestroyed,
    CreaturesScavengedLost,
    CreaturesScavengedGained,
    AllDungeonsDestroyed,
    GoodCreatures,
    EvilCreatures,
    TrapsSold,
    DoorsSold,
    ManufacturedSold,
    ManufactureGold,
    TotalScore,
    BonusTime,
    CreatureNum,
    RoomSlabs,
    Timer,
    Flag,
    DoorNum,
    TrapNum,
    CampaignFlag,
    BoxActivated,
    Sacrificed,
    Rewarded,
    AvailableCreature,
    AvailableRoom,
    AvailableDoor,
    AvailableTrap,
    ControlsCreature,
    ControlsTotalCreatures,
    ControlsTotalDiggers,
    ControlsGoodCreatures,
    ControlsEvilCreatures,
    SlabOwner,
    SlabType,
    ActionPointTriggered,
}

/// Variables a script may name directly in `IF` and `DISPLAY_VARIABLE`.
pub const GLOBAL_VARIABLES: &[(&str, VariableKind)] = &[
    ("MONEY", VariableKind::Money),
    ("GAME_TURN", VariableKind::GameTurn),
    ("BREAK_IN", VariableKind::BreakIn),
    ("TOTAL_DIGGERS", VariableKind::TotalDiggers),
    ("TOTAL_CREATURES", VariableKind::TotalCreatures),
    ("TOTAL_RESEARCH", VariableKind::TotalResearch),
    ("TOTAL_DOORS", VariableKind::TotalDoors),
    ("TOTAL_AREA", VariableKind::TotalArea),
    ("TOTAL_CREATURES_LEFT", VariableKind::TotalCreaturesLeft),
    ("CREATURES_ANNOYED", VariableKind::CreaturesAnnoyed),
    ("BATTLES_LOST", VariableKind::BattlesLost),
    ("BATTLES_WON", VariableKind::BattlesWon),
    ("ROOMS_DESTROYED", VariableKind::RoomsDestroyed),
    ("SPELLS_STOLEN", VariableKind::SpellsStolen),
    ("TIMES_BROKEN_INTO", VariableKind::TimesBrokenInto),
    ("GOLD_POTS_STOLEN", VariableKind::GoldPotsStolen),
    ("HEART_HEALTH", VariableKind::HeartHealth),
    ("GHOSTS_RAISED", VariableKind::GhostsRaised),
    ("SKELETONS_RAISED", VariableKind::SkeletonsRaised),
    ("VAMPIRES_RAISED", VariableKind::VampiresRaised),
    ("CREATURES_CONVERTED", VariableKind::CreaturesConverted),
    ("EVIL_CREATURES_CONVERTED", VariableKind::EvilCreaturesConverted),
    ("GOOD_CREATURES_CONVERTED", VariableKind::GoodCreaturesConverted),
    ("TIMES_ANNOYED_CREATURE", VariableKind::TimesAnnoyedCreature),
    ("TIMES_TORTURED_CREATURE", VariableKind::TimesTorturedCreature),
    ("TOTAL_DOORS_MANUFACTURED", VariableKind::TotalDoorsManufactured),
    ("TOTAL_TRAPS_MANUFACTURED", VariableKind::TotalTrapsManufactured),
    ("TOTAL_MANUFACTURED", VariableKind::TotalManufactured),
    ("TOTAL_TRAPS_USED", VariableKind::TotalTrapsUsed),
    ("TOTAL_DOORS_USED", VariableKind::TotalDoorsUsed),
    ("KEEPERS_DESTROYED", VariableKind::KeepersDestroyed),
    ("CREATURES_SACRIFICED", VariableKind::CreaturesSacrificed),
    ("CREATURES_FROM_SACRIFICE", VariableKind::CreaturesFromSacrifice),
    ("TIMES_LEVELUP_CREATURE", VariableKind::TimesLevelupCreature),
    ("TOTAL_SALARY", VariableKind::TotalSalary),
    ("CURRENT_SALARY", VariableKind::CurrentSalary),
    ("DUNGEON_DESTROYED", VariableKind::DungeonDestroyed),
    ("TOTAL_GOLD_MINED", VariableKind::TotalGoldMined),
    ("DOORS_DESTROYED", VariableKind::DoorsDestroyed),
    ("CREATURES_SCAVENGED_LOST", VariableKind::CreaturesScavengedLost),
    ("CREATURES_SCAVENGED_GAINED", VariableKind::CreaturesScavengedGained),
    ("ALL_DUNGEONS_DESTROYED", VariableKind::AllDungeonsDestroyed),
    ("GOOD_CREATURES", VariableKind::GoodCreatures),
    ("EVIL_CREATURES", VariableKind::EvilCreatures),
    ("TRAPS_SOLD", VariableKind::TrapsSold),
    ("DOORS_SOLD", VariableKind::DoorsSold),
    ("MANUFACTURED_SOLD", VariableKind::ManufacturedSold),
    ("MANUFACTURE_GOLD", VariableKind::ManufactureGold),
    ("TOTAL_SCORE", VariableKind::TotalScore),
    ("BONUS_TIME", VariableKind::BonusTime),
];

/// Names accepted by `IF_CONTROLS` besides creature names.
pub const CONTROLS_VARIABLES: &[(&str, VariableKind)] = &[
    ("TOTAL_DIGGERS", VariableKind::ControlsTotalDiggers),
    ("TOTAL_CREATURES", VariableKind::ControlsTotalCreatures),
    ("TOTAL_DOORS", VariableKind::TotalDoors),
    ("TOTAL_AREA", VariableKind::TotalArea),
    ("GOOD_CREATURES", VariableKind::ControlsGoodCreatures),
    ("EVIL_CREATURES", VariableKind::ControlsEvilCreatures),
];

/// Look a name up in a `(name, value)` table, ignoring ASCII case.
pub fn lookup<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    table
        .iter()
        .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
        .map(|(_, value)| *value)
}

impl VariableKind {
    /// Script name for kinds that have one.
    pub fn global_name(self) -> Option<&'static str> {
        GLOBAL_VARIABLES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(name, _)| *name)
    }

    /// Whether reading this kind for a player needs that player's dungeon.
    pub fn requires_dungeon(self) -> bool {
        !matches!(
            self,
            VariableKind::GameTurn
                | VariableKind::AllDungeonsDestroyed
                | VariableKind::DoorNum
                | VariableKind::TrapNum
                | VariableKind::BonusTime
                | VariableKind::SlabOwner
                | VariableKind::SlabType
                | VariableKind::ActionPointTriggered
                | VariableKind::CampaignFlag
        )
    }

    /// Kinds whose value is a plain per-dungeon counter kept by the simulation.
    pub fn is_dungeon_counter(self) -> bool {
        use VariableKind as V;
        !matches!(
            self,
            V::GameTurn
                | V::HeartHealth
                | V::DungeonDestroyed
                | V::AllDungeonsDestroyed
                | V::BonusTime
                | V::ManufacturedSold
                | V::CreatureNum
                | V::RoomSlabs
                | V::Timer
                | V::Flag
                | V::DoorNum
                | V::TrapNum
                | V::CampaignFlag
                | V::BoxActivated
                | V::Sacrificed
                | V::Rewarded
                | V::AvailableCreature
                | V::AvailableRoom
                | V::AvailableDoor
                | V::AvailableTrap
                | V::ControlsCreature
                | V::ControlsTotalCreatures
                | V::ControlsTotalDiggers
                | V::ControlsGoodCreatures
                | V::ControlsEvilCreatures
                | V::SlabOwner
                | V::SlabType
                | V::ActionPointTriggered
        )
    }
}

/// Storage a settable script variable lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagStore {
    Flag,
    CampaignFlag,
    BoxActivated,
    Sacrificed,
    Rewarded,
}

impl FlagStore {
    /// The variable kind a condition uses to read this store back.
    pub fn variable_kind(self) -> VariableKind {
        match self {
            FlagStore::Flag => VariableKind::Flag,
            FlagStore::CampaignFlag => VariableKind::CampaignFlag,
            FlagStore::BoxActivated => VariableKind::BoxActivated,
            FlagStore::Sacrificed => VariableKind::Sacrificed,
            FlagStore::Rewarded => VariableKind::Rewarded,
        }
    }
}

/// Parse `PREFIXn` where `n < count`, e.g. `TIMER3` or `CAMPAIGN_FLAG7`.
pub fn indexed_name(prefix: &str, name: &str, count: usize) -> Option<u16> {
    if name.len() <= prefix.len() || !name.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, digits) = name.split_at(prefix.len());
    if !head.eq_ignore_ascii_case(prefix) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: usize = digits.parse().ok()?;
    if index < count { u16::try_from(index).ok() } else { None }
}

/// Words accepted for boolean arguments.
pub fn parse_boolean(word: &str) -> Option<bool> {
    const WORDS: &[(&str, bool)] = &[
        ("TRUE", true),
        ("FALSE", false),
        ("ON", true),
        ("OFF", false),
        ("YES", true),
        ("NO", false),
    ];
    lookup(WORDS, word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_names_resolve_to_ranges() {
        assert_eq!(PlayerRange::from_name("player0"), Some(PlayerRange::single(PlayerId(0))));
        assert_eq!(PlayerRange::from_name("PLAYER_GOOD"), Some(PlayerRange::single(PLAYER_GOOD)));
        let all = PlayerRange::from_name("ALL_PLAYERS").expect("all players");
        assert!(all.is_all());
        assert_eq!(all.iter().count(), 5);
        assert!(all.single_player().is_none());
        assert_eq!(PlayerRange::from_name("PLAYER9"), None);
    }

    #[test]
    fn comparison_accepts_single_equals() {
        assert_eq!(Comparison::from_token("="), Some(Comparison::Equal));
        assert_eq!(Comparison::from_token(">="), Some(Comparison::GreaterOrEqual));
        assert!(Comparison::LessOrEqual.compare(-3, -3));
        assert!(!Comparison::Greater.compare(-3, 2));
    }

    #[test]
    fn indexed_names_respect_bounds() {
        assert_eq!(indexed_name("FLAG", "FLAG7", FLAGS_COUNT), Some(7));
        assert_eq!(indexed_name("FLAG", "flag0", FLAGS_COUNT), Some(0));
        assert_eq!(indexed_name("FLAG", "FLAG8", FLAGS_COUNT), None);
        assert_eq!(indexed_name("FLAG", "FLAG", FLAGS_COUNT), None);
        assert_eq!(indexed_name("TIMER", "TIMERX", TIMERS_COUNT), None);
    }

    #[test]
    fn symbol_tables_ignore_case() {
        assert_eq!(HeroObjective::from_name("steal_gold"), Some(HeroObjective::StealGold));
        assert_eq!(GameRule::from_name("PAYDAYGAP"), Some(GameRule::PayDayGap));
        assert_eq!(DoorProperty::from_name("nametextid"), Some(DoorProperty::NameTextId));
        assert_eq!(ResearchKind::from_name("magic"), Some(ResearchKind::Power));
        assert_eq!(HeadFor::from_name("APPROPIATE_DUNGEON"), Some(HeadFor::AppropriateDungeon));
        assert_eq!(lookup(GLOBAL_VARIABLES, "money"), Some(VariableKind::Money));
        assert_eq!(VariableKind::HeartHealth.global_name(), Some("HEART_HEALTH"));
        assert_eq!(VariableKind::Flag.global_name(), None);
    }

    #[test]
    fn operator_arithmetic_saturates() {
        assert_eq!(ScriptOperator::Increase.apply(i64::MAX, 1), i64::MAX);
        assert_eq!(ScriptOperator::Multiply.apply(6, 7), 42);
        assert_eq!(ScriptOperator::Set.apply(6, 7), 7);
    }
}
