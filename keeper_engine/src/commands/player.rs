//! Player economy, heart, availability, research and alliance commands.

use keeper_data::ResearchKind;

use super::{creature_kind, creature_level, kind_id};
use crate::codec::ArgList;
use crate::context::{CheckContext, ExecutionContext};
use crate::diagnostic::{ProcessError, ScriptError};
use crate::registry::CommandRegistry;
use crate::sim::{AvailKind, WorldOp};
use crate::value::{AllyValue, AmountValue, AvailabilityValue, CreatureLevelValue, ResearchValue};

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.value("START_MONEY", "PN", check_amount, process_start_money);
    registry.value("ADD_GOLD_TO_PLAYER", "PN", check_amount, process_add_gold);
    registry.value("MAX_CREATURES", "PN", check_max_creatures, process_max_creatures);
    registry.value("SET_HEART_HEALTH", "PN", check_set_heart_health, process_set_heart_health);
    registry.value("ADD_HEART_HEALTH", "PNn", check_add_heart_health, process_add_heart_health);
    registry.value("ROOM_AVAILABLE", "PRNN", check_room_available, process_availability);
    registry.value("CREATURE_AVAILABLE", "PCNN", check_creature_available, process_availability);
    registry.value("DOOR_AVAILABLE", "PANN", check_door_available, process_availability);
    registry.value("TRAP_AVAILABLE", "PANN", check_trap_available, process_availability);
    registry.value("MAGIC_AVAILABLE", "PANN", check_magic_available, process_availability);
    registry.value("RESEARCH", "PAAN", check_research, process_research);
    registry.value("RESEARCH_ORDER", "PAAN", check_research, process_research_order);
    registry.value("SET_CREATURE_MAX_LEVEL", "PCN", check_creature_max_level, process_creature_max_level);
    registry.value("ALLY_PLAYERS", "PPN", check_ally_players, process_ally_players);
}

fn check_amount(args: &ArgList, _: &mut CheckContext<'_>) -> Result<AmountValue, ScriptError> {
    Ok(AmountValue {
        amount: args.number(1)?,
        flag: false,
    })
}

fn process_start_money(value: &AmountValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        cx.apply(WorldOp::SetMoney {
            player,
            amount: value.amount,
        })
    });
    Ok(())
}

fn process_add_gold(value: &AmountValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        cx.apply(WorldOp::AddGold {
            player,
            amount: value.amount,
        })
    });
    Ok(())
}

fn check_max_creatures(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<AmountValue, ScriptError> {
    let count = cx.clamp("creature limit", args.number(1)?, 0, i64::from(u16::MAX));
    Ok(AmountValue {
        amount: count,
        flag: false,
    })
}

fn process_max_creatures(value: &AmountValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        cx.apply(WorldOp::SetMaxCreatures {
            player,
            count: value.amount,
        })
    });
    Ok(())
}

fn check_set_heart_health(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<AmountValue, ScriptError> {
    let max = cx.config.heart_max_health;
    let health = cx.clamp("heart health", args.number(1)?, 0, max);
    Ok(AmountValue {
        amount: health,
        flag: false,
    })
}

fn process_set_heart_health(value: &AmountValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        if cx.sim.heart(player).is_some() {
            cx.apply(WorldOp::SetHeartHealth {
                player,
                health: value.amount,
            })?;
        }
        Ok(())
    });
    Ok(())
}

/// The optional flag asks for the "heart under attack" warning on damage.
fn check_add_heart_health(args: &ArgList, _: &mut CheckContext<'_>) -> Result<AmountValue, ScriptError> {
    Ok(AmountValue {
        amount: args.number(1)?,
        flag: args.number(2)? != 0,
    })
}

fn process_add_heart_health(value: &AmountValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let max = cx.config.heart_max_health;
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        let Some(heart) = cx.sim.heart(player) else {
            return Ok(());
        };
        let health = heart.health.saturating_add(value.amount).clamp(0, max);
        cx.apply(WorldOp::SetHeartHealth { player, health })?;
        if value.flag && value.amount < 0 {
            cx.apply(WorldOp::HeartAttacked { player })?;
        }
        Ok(())
    });
    Ok(())
}

/// The last two parameters of every `*_AVAILABLE` command.
fn availability(
    args: &ArgList,
    cx: &mut CheckContext<'_>,
    kind: AvailKind,
    id: u16,
) -> Result<AvailabilityValue, ScriptError> {
    let can_be_available = cx.clamp("availability", args.number(2)?, 0, 1);
    let available = args.number(3)?;
    let available = if matches!(kind, AvailKind::Room | AvailKind::Creature | AvailKind::Power) {
        cx.clamp("availability", available, 0, 1)
    } else {
        cx.clamp("stock", available, 0, i64::from(u16::MAX))
    };
    Ok(AvailabilityValue {
        kind,
        id,
        can_be_available,
        available,
    })
}

fn check_room_available(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<AvailabilityValue, ScriptError> {
    let room = args.room(1)?;
    availability(args, cx, AvailKind::Room, room)
}

fn check_creature_available(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<AvailabilityValue, ScriptError> {
    let creature = creature_kind(args, 1)?;
    availability(args, cx, AvailKind::Creature, creature)
}

fn check_door_available(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<AvailabilityValue, ScriptError> {
    let door = kind_id(&cx.catalog.doors, "door", args.text(1)?)?;
    availability(args, cx, AvailKind::Door, door)
}

fn check_trap_available(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<AvailabilityValue, ScriptError> {
    let trap = kind_id(&cx.catalog.traps, "trap", args.text(1)?)?;
    availability(args, cx, AvailKind::Trap, trap)
}

fn check_magic_available(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<AvailabilityValue, ScriptError> {
    let power = kind_id(&cx.catalog.powers, "power", args.text(1)?)?;
    availability(args, cx, AvailKind::Power, power)
}

fn process_availability(value: &AvailabilityValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        cx.apply(WorldOp::SetAvailability {
            player,
            kind: value.kind,
            id: value.id,
            can_be_available: value.can_be_available,
            available: value.available,
        })
    });
    Ok(())
}

/// Research entry named by a list word and an item of that list.
fn check_research(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<ResearchValue, ScriptError> {
    let list = args.text(1)?;
    let kind = ResearchKind::from_name(list).ok_or_else(|| ScriptError::UnknownName {
        kind: "research type",
        name: list.to_string(),
    })?;
    let item = args.text(2)?;
    let id = match kind {
        ResearchKind::Power => kind_id(&cx.catalog.powers, "power", item)?,
        ResearchKind::Room => kind_id(&cx.catalog.rooms, "room", item)?,
        ResearchKind::Creature => kind_id(&cx.catalog.creatures, "creature", item)?,
    };
    let amount = cx.clamp("research amount", args.number(3)?, 0, i64::from(i32::MAX));
    Ok(ResearchValue { kind, id, amount })
}

fn process_research(value: &ResearchValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        cx.apply(WorldOp::SetResearch {
            player,
            kind: value.kind,
            id: value.id,
            amount: value.amount,
        })
    });
    Ok(())
}

/// The first entry ordered for a player replaces the default order.
fn process_research_order(value: &ResearchValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        if !cx.sim.research_ordered(player) {
            cx.apply(WorldOp::ClearResearch { player })?;
        }
        cx.apply(WorldOp::SetResearch {
            player,
            kind: value.kind,
            id: value.id,
            amount: value.amount,
        })
    });
    Ok(())
}

fn check_creature_max_level(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<CreatureLevelValue, ScriptError> {
    let creature = creature_kind(args, 1)?;
    let level = creature_level(args.number(2)?, cx)?;
    Ok(CreatureLevelValue { creature, level })
}

fn process_creature_max_level(value: &CreatureLevelValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        cx.apply(WorldOp::SetCreatureMaxLevel {
            player,
            creature: value.creature,
            level: value.level,
        })
    });
    Ok(())
}

fn check_ally_players(args: &ArgList, _: &mut CheckContext<'_>) -> Result<AllyValue, ScriptError> {
    Ok(AllyValue {
        other: args.single_player(1)?,
        allied: args.number(2)? != 0,
    })
}

fn process_ally_players(value: &AllyValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let others: Vec<_> = cx.dungeon_players().into_iter().filter(|p| *p != value.other).collect();
    cx.for_each_player(others, |cx, player| {
        cx.apply(WorldOp::SetAlliance {
            player,
            other: value.other,
            allied: value.allied,
        })
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::value::Payload;
    use keeper_data::PlayerId;

    #[test]
    fn heart_health_is_clamped_with_a_warning() {
        let mut h = Harness::new();
        let value = h.check("SET_HEART_HEALTH(PLAYER0, 99999)").unwrap().unwrap();
        assert_eq!(AmountValue::view(&value).map(|v| v.amount), Some(30_000));
        assert_eq!(h.diagnostics.warnings().count(), 1);
    }

    #[test]
    fn availability_resolves_each_kind() {
        let mut h = Harness::new();
        let room = h.check("ROOM_AVAILABLE(PLAYER0, LIBRARY, 1, 0)").unwrap().unwrap();
        assert_eq!(AvailabilityValue::view(&room).map(|v| (v.kind, v.id)), Some((AvailKind::Room, 3)));
        let door = h.check("DOOR_AVAILABLE(ALL_PLAYERS, BRACED, 1, 4)").unwrap().unwrap();
        assert_eq!(AvailabilityValue::view(&door).map(|v| (v.id, v.available)), Some((2, 4)));
        assert!(matches!(
            h.check("TRAP_AVAILABLE(PLAYER0, LAVA, 1, 1)"),
            Err(ScriptError::UnknownName { kind: "trap", .. })
        ));
        assert!(h.check("CREATURE_AVAILABLE(PLAYER0, DRAGON, 1, 1)").is_err());
    }

    #[test]
    fn availability_flags_are_clamped() {
        let mut h = Harness::new();
        let value = h.check("CREATURE_AVAILABLE(PLAYER0, TROLL, 3, 1)").unwrap().unwrap();
        assert_eq!(AvailabilityValue::view(&value).map(|v| v.can_be_available), Some(1));
        assert_eq!(h.diagnostics.warnings().count(), 1);
    }

    #[test]
    fn powers_come_from_the_level_catalog() {
        let mut h = Harness::new();
        let value = h.check("MAGIC_AVAILABLE(PLAYER0, POWER_SIGHT, 1, 2)").unwrap().unwrap();
        assert_eq!(
            AvailabilityValue::view(&value).map(|v| (v.kind, v.id, v.available)),
            Some((AvailKind::Power, 3, 1))
        );
        assert_eq!(h.diagnostics.warnings().count(), 1);
        assert!(matches!(
            h.check("MAGIC_AVAILABLE(PLAYER0, POWER_ARMAGEDDON, 1, 1)"),
            Err(ScriptError::UnknownName { kind: "power", .. })
        ));
    }

    #[test]
    fn research_names_resolve_against_their_list() {
        let mut h = Harness::new();
        let value = h.check("RESEARCH(PLAYER0, MAGIC, POWER_SLAP, 2500)").unwrap().unwrap();
        assert_eq!(ResearchValue::view(&value), Some(&ResearchValue {
            kind: ResearchKind::Power,
            id: 2,
            amount: 2500,
        }));
        let value = h.check("RESEARCH_ORDER(ALL_PLAYERS, ROOM, LIBRARY, 900)").unwrap().unwrap();
        assert_eq!(ResearchValue::view(&value).map(|r| (r.kind, r.id)), Some((ResearchKind::Room, 3)));
        assert!(matches!(
            h.check("RESEARCH(PLAYER0, ROOM, POWER_SLAP, 10)"),
            Err(ScriptError::UnknownName { kind: "room", .. })
        ));
        assert!(matches!(
            h.check("RESEARCH(PLAYER0, SPELL, POWER_SLAP, 10)"),
            Err(ScriptError::UnknownName { kind: "research type", .. })
        ));
    }

    #[test]
    fn creature_max_level_needs_a_kind_and_a_level() {
        let mut h = Harness::new();
        let value = h.check("SET_CREATURE_MAX_LEVEL(PLAYER0, TROLL, 6)").unwrap().unwrap();
        assert_eq!(CreatureLevelValue::view(&value), Some(&CreatureLevelValue { creature: 2, level: 6 }));
        assert!(h.check("SET_CREATURE_MAX_LEVEL(PLAYER0, ANY_CREATURE, 6)").is_err());
        assert!(matches!(
            h.check("SET_CREATURE_MAX_LEVEL(PLAYER0, TROLL, 0)"),
            Err(ScriptError::OutOfRange { .. })
        ));
    }

    #[test]
    fn alliances_name_one_partner() {
        let mut h = Harness::new();
        let value = h.check("ALLY_PLAYERS(PLAYER0, PLAYER1, 1)").unwrap().unwrap();
        assert_eq!(AllyValue::view(&value), Some(&AllyValue {
            other: PlayerId(1),
            allied: true,
        }));
        assert!(h.check("ALLY_PLAYERS(PLAYER0, ALL_PLAYERS, 1)").is_err());
    }
}
