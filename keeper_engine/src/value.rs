//! Encoded command values.
//!
//! A check function turns one script line into a single [`EncodedValue`],
//! which is either run at once or stored in a trigger. Each command owns
//! exactly one payload shape; process functions ask for theirs through
//! [`Payload::view`], so decoding under the wrong shape yields `None`
//! instead of misreading the fields.

use keeper_data::{
    CreatureProperty, DoorProperty, FillKind, FlagStore, GameRule, MessageKind, PlayerId, PlayerRange, ResearchKind,
    SacrificeAction, ScriptOperator, SelectCriteria, TrapProperty,
};

use crate::codec::CreatureSel;
use crate::condition::VariableRef;
use crate::diagnostic::{CapacityError, ProcessError};
use crate::location::MapLocation;
use crate::party::PartyMember;
use crate::sim::{AvailKind, Channel, Heading, Speaker};
use crate::strings::StrHandle;

/// A payload type that can live inside an [`EncodedValue`].
pub trait Payload: Copy {
    /// Name of the shape, used in mismatch reports.
    const SHAPE: &'static str;

    fn wrap(self) -> EncodedValue;
    fn view(value: &EncodedValue) -> Option<&Self>;

    /// Borrow the payload or report a shape mismatch.
    ///
    /// # Errors
    /// [`ProcessError::Shape`] when `value` holds another shape.
    fn expect_in(value: &EncodedValue) -> Result<&Self, ProcessError> {
        Self::view(value).ok_or(ProcessError::Shape {
            expected: Self::SHAPE,
            found: value.shape(),
        })
    }
}

macro_rules! encoded_values {
    ($($variant:ident($payload:ty)),+ $(,)?) => {
        /// Validated arguments of one command instance.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum EncodedValue {
            $($variant($payload)),+
        }

        impl EncodedValue {
            pub fn shape(&self) -> &'static str {
                match self {
                    $(EncodedValue::$variant(_) => <$payload as Payload>::SHAPE),+
                }
            }
        }

        $(
            impl Payload for $payload {
                const SHAPE: &'static str = stringify!($variant);

                fn wrap(self) -> EncodedValue {
                    EncodedValue::$variant(self)
                }

                fn view(value: &EncodedValue) -> Option<&Self> {
                    match value {
                        EncodedValue::$variant(payload) => Some(payload),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }
        )+
    };
}

encoded_values! {
    Flag(FlagValue),
    Compute(ComputeValue),
    Export(ExportValue),
    Timer(TimerValue),
    Display(DisplayValue),
    Hide(HideValue),
    Amount(AmountValue),
    Availability(AvailabilityValue),
    Research(ResearchValue),
    Ally(AllyValue),
    PartyMember(PartyMemberValue),
    SpawnParty(SpawnPartyValue),
    SpawnCreature(SpawnCreatureValue),
    Tunneller(TunnellerValue),
    Select(SelectValue),
    OwnerChange(OwnerChangeValue),
    CreatureLevel(CreatureLevelValue),
    Reveal(RevealValue),
    Rect(RectValue),
    Slab(SlabValue),
    Effect(EffectValue),
    Message(MessageValue),
    Sound(SoundValue),
    Rule(RuleValue),
    TrapConfig(TrapConfigValue),
    DoorConfig(DoorConfigValue),
    CreatureConfig(CreatureConfigValue),
    Recipe(RecipeValue),
    RecipeRemove(RecipeRemoveValue),
}

impl EncodedValue {
    /// Arena string referenced by this value, if any.
    pub fn string_handle(&self) -> Option<StrHandle> {
        match self {
            EncodedValue::Message(message) => message.text,
            _ => None,
        }
    }
}

/// Fixed-capacity inline list for repeating parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmallList<T: Copy + Default, const N: usize> {
    len: u8,
    items: [T; N],
}

impl<T: Copy + Default, const N: usize> Default for SmallList<T, N> {
    fn default() -> Self {
        Self {
            len: 0,
            items: [T::default(); N],
        }
    }
}

impl<T: Copy + Default, const N: usize> SmallList<T, N> {
    /// # Errors
    /// [`CapacityError`] once `N` items are stored.
    pub fn push(&mut self, item: T) -> Result<(), CapacityError> {
        let len = usize::from(self.len);
        if len >= N {
            return Err(CapacityError {
                what: "list items",
                limit: N,
            });
        }
        self.items[len] = item;
        self.len += 1;
        Ok(())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items[..usize::from(self.len)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Most victims a sacrifice recipe names.
pub const MAX_VICTIMS: usize = 6;

/// `SET_FLAG`, `ADD_TO_FLAG`, `RANDOMISE_FLAG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagValue {
    pub store: FlagStore,
    pub index: u16,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeValue {
    pub store: FlagStore,
    pub index: u16,
    pub op: ScriptOperator,
    pub source_players: PlayerRange,
    pub source: VariableRef,
}

/// `EXPORT_VARIABLE`: copy a readable variable into a campaign flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportValue {
    pub source: VariableRef,
    pub flag: u16,
}

/// `SET_TIMER` (amount unused) and `ADD_TO_TIMER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerValue {
    pub timer: u16,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayValue {
    pub variable: VariableRef,
    pub target: i64,
    pub countdown: bool,
    pub clock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HideValue;

/// Single-number commands. `flag` carries a command-specific switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountValue {
    pub amount: i64,
    pub flag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityValue {
    pub kind: AvailKind,
    pub id: u16,
    pub can_be_available: i64,
    pub available: i64,
}

/// `RESEARCH`, `RESEARCH_ORDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchValue {
    pub kind: ResearchKind,
    pub id: u16,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllyValue {
    pub other: PlayerId,
    pub allied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartyMemberValue {
    pub party: u8,
    pub member: PartyMember,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPartyValue {
    pub party: u8,
    pub location: MapLocation,
    pub copies: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnCreatureValue {
    pub creature: u16,
    pub location: MapLocation,
    pub level: u8,
    pub copies: u16,
    pub gold: i64,
}

/// `ADD_TUNNELLER_TO_LEVEL`, and with a party `ADD_TUNNELLER_PARTY_TO_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnellerValue {
    pub party: Option<u8>,
    pub creature: u16,
    pub location: MapLocation,
    pub heading: Heading,
    pub level: u8,
    pub gold: i64,
}

/// `KILL_CREATURE`, `CHANGE_CREATURES_ANNOYANCE`, `LEVEL_UP_CREATURE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectValue {
    pub creature: CreatureSel,
    pub criteria: SelectCriteria,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerChangeValue {
    pub creature: CreatureSel,
    pub criteria: SelectCriteria,
    pub new_owner: PlayerId,
}

/// `SET_CREATURE_MAX_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatureLevelValue {
    pub creature: u16,
    pub level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealValue {
    pub location: MapLocation,
    pub radius: u16,
}

/// `REVEAL_MAP_RECT`, `CONCEAL_MAP_RECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectValue {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlabTarget {
    Owner(PlayerId),
    Kind(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabValue {
    pub x: u16,
    pub y: u16,
    pub target: SlabTarget,
    pub fill: FillKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectAt {
    Location(MapLocation),
    Position(u16, u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectValue {
    pub effect: i64,
    pub at: EffectAt,
    pub height: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageValue {
    pub channel: Channel,
    pub id: i64,
    pub text: Option<StrHandle>,
    pub zoom: MapLocation,
    pub speaker: Speaker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundValue {
    pub kind: MessageKind,
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleValue {
    pub rule: GameRule,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapConfigValue {
    pub trap: u16,
    pub property: TrapProperty,
    pub value: i64,
    pub extra: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorConfigValue {
    pub door: u16,
    pub property: DoorProperty,
    pub value: i64,
    pub extra: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatureConfigValue {
    pub creature: u16,
    pub property: CreatureProperty,
    pub value: i64,
    pub extra: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeValue {
    pub action: SacrificeAction,
    pub reward: i64,
    pub victims: SmallList<u16, MAX_VICTIMS>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeRemoveValue {
    pub victims: SmallList<u16, MAX_VICTIMS>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fmt::Debug;

    use keeper_data::{HeroObjective, VariableKind};

    use super::*;
    use crate::strings::StringArena;

    /// Wrap `payload`, read it back and return the shape it was stored under.
    fn round_trip<P: Payload + PartialEq + Debug>(payload: P) -> &'static str {
        let value = payload.wrap();
        assert_eq!(P::view(&value), Some(&payload));
        assert_eq!(P::expect_in(&value), Ok(&payload));
        value.shape()
    }

    #[test]
    fn views_only_match_their_own_shape() {
        let value = FlagValue {
            store: FlagStore::Flag,
            index: 0,
            value: 5,
        }
        .wrap();
        assert_eq!(value.shape(), "Flag");
        assert_eq!(FlagValue::view(&value).map(|f| f.value), Some(5));
        assert!(TimerValue::view(&value).is_none());
        let err = TimerValue::expect_in(&value).unwrap_err();
        assert_eq!(err, ProcessError::Shape {
            expected: "Timer",
            found: "Flag",
        });
    }

    #[test]
    fn small_list_is_bounded() {
        let mut list: SmallList<u16, 2> = SmallList::default();
        list.push(3).unwrap();
        list.push(4).unwrap();
        assert!(list.push(5).is_err());
        assert_eq!(list.as_slice(), &[3, 4]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn every_payload_reads_back_under_its_own_shape() {
        let victims = {
            let mut list = SmallList::default();
            list.push(2).unwrap();
            list.push(3).unwrap();
            list
        };
        let shapes = [
            round_trip(FlagValue {
                store: FlagStore::CampaignFlag,
                index: 4,
                value: -9,
            }),
            round_trip(ComputeValue {
                store: FlagStore::Flag,
                index: 1,
                op: ScriptOperator::Multiply,
                source_players: PlayerRange::all(),
                source: VariableRef::new(VariableKind::Money, 0),
            }),
            round_trip(ExportValue {
                source: VariableRef::new(VariableKind::TotalGoldMined, 0),
                flag: 3,
            }),
            round_trip(TimerValue { timer: 7, amount: 300 }),
            round_trip(DisplayValue {
                variable: VariableRef::new(VariableKind::Timer, 2),
                target: 120,
                countdown: true,
                clock: false,
            }),
            round_trip(HideValue),
            round_trip(AmountValue {
                amount: i64::MIN,
                flag: true,
            }),
            round_trip(AvailabilityValue {
                kind: AvailKind::Trap,
                id: 2,
                can_be_available: 1,
                available: 0,
            }),
            round_trip(ResearchValue {
                kind: ResearchKind::Power,
                id: 5,
                amount: 12_000,
            }),
            round_trip(AllyValue {
                other: PlayerId(2),
                allied: false,
            }),
            round_trip(PartyMemberValue {
                party: 3,
                member: PartyMember {
                    creature: 4,
                    level: 10,
                    gold: 500,
                    objective: HeroObjective::StealGold,
                    countdown: 0,
                },
            }),
            round_trip(SpawnPartyValue {
                party: 1,
                location: MapLocation::HeroGate(1),
                copies: 2,
            }),
            round_trip(SpawnCreatureValue {
                creature: 1,
                location: MapLocation::PlayerHeart(PlayerId(0)),
                level: 3,
                copies: 5,
                gold: 0,
            }),
            round_trip(TunnellerValue {
                party: Some(0),
                creature: 5,
                location: MapLocation::ActionPoint(1),
                heading: Heading::DungeonHeart(PlayerId(0)),
                level: 4,
                gold: 150,
            }),
            round_trip(SelectValue {
                creature: CreatureSel::Any,
                criteria: SelectCriteria::MostExperienced,
                amount: 2,
            }),
            round_trip(OwnerChangeValue {
                creature: CreatureSel::Kind(2),
                criteria: SelectCriteria::NearOwnHeart,
                new_owner: PlayerId(1),
            }),
            round_trip(CreatureLevelValue { creature: 3, level: 6 }),
            round_trip(RevealValue {
                location: MapLocation::ActionPoint(4),
                radius: 9,
            }),
            round_trip(RectValue {
                x: 30,
                y: 31,
                width: 5,
                height: 6,
                all: true,
            }),
            round_trip(SlabValue {
                x: 8,
                y: 9,
                target: SlabTarget::Owner(PlayerId(1)),
                fill: FillKind::Match,
            }),
            round_trip(EffectValue {
                effect: -3,
                at: EffectAt::Position(12, 13),
                height: 256,
            }),
            round_trip(MessageValue {
                channel: Channel::QuickObjective,
                id: 0,
                text: None,
                zoom: MapLocation::LastEvent,
                speaker: Speaker::Creature(2),
            }),
            round_trip(SoundValue {
                kind: MessageKind::Speech,
                id: 88,
            }),
            round_trip(RuleValue {
                rule: GameRule::BodiesForVampire,
                value: 6,
            }),
            round_trip(TrapConfigValue {
                trap: 1,
                property: TrapProperty::NameTextId,
                value: 901,
                extra: 0,
            }),
            round_trip(DoorConfigValue {
                door: 2,
                property: DoorProperty::Health,
                value: 900,
                extra: 0,
            }),
            round_trip(CreatureConfigValue {
                creature: 2,
                property: CreatureProperty::Health,
                value: 700,
                extra: 0,
            }),
            round_trip(RecipeValue {
                action: SacrificeAction::MakeCreature,
                reward: 4,
                victims,
            }),
            round_trip(RecipeRemoveValue { victims }),
        ];
        let distinct: HashSet<_> = shapes.iter().collect();
        assert_eq!(distinct.len(), shapes.len());
    }

    #[test]
    fn message_text_survives_the_arena() {
        let mut strings = StringArena::new(64);
        let text = strings.intern("The heroes are coming").unwrap();
        let value = MessageValue {
            channel: Channel::Objective,
            id: 0,
            text: Some(text),
            zoom: MapLocation::None,
            speaker: Speaker::None,
        }
        .wrap();
        assert_eq!(value.string_handle(), Some(text));
        let handle = MessageValue::view(&value).and_then(|m| m.text).unwrap();
        assert_eq!(strings.get(handle), Ok("The heroes are coming"));
    }

    #[test]
    fn only_messages_hold_strings() {
        assert_eq!(HideValue.wrap().string_handle(), None);
    }
}
