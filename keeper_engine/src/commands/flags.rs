//! Flags, campaign flags, timers and on-screen displays.

use keeper_data::{CAMPAIGN_FLAGS_COUNT, FlagStore, ScriptOperator, TIMERS_COUNT, VariableKind, indexed_name};
use rand::Rng;

use super::{in_range, settable};
use crate::codec::ArgList;
use crate::condition::{VariableRef, condition_value, parse_variable};
use crate::context::{CheckContext, ExecutionContext};
use crate::diagnostic::{ProcessError, ScriptError};
use crate::registry::CommandRegistry;
use crate::sim::WorldOp;
use crate::value::{AmountValue, ComputeValue, DisplayValue, ExportValue, FlagValue, HideValue, TimerValue};

/// Range `COMPUTE_FLAG` results are kept in.
const COMPUTED_MAX: i64 = 255;
/// Turn offsets accepted by timer and bonus-time adjustments.
const TURNS_MAX: i64 = 0x7fff_ffff;
const TURNS_MIN: i64 = -TURNS_MAX;
/// Campaign flags are carried between levels as 32-bit values.
const CAMPAIGN_MAX: i64 = 0x7fff_ffff;
const CAMPAIGN_MIN: i64 = -CAMPAIGN_MAX - 1;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.value("SET_FLAG", "PAN", check_flag, process_set_flag);
    registry.value("ADD_TO_FLAG", "PAN", check_flag, process_add_to_flag);
    registry.value("RANDOMISE_FLAG", "PAN", check_randomise_flag, process_randomise_flag);
    registry.value("COMPUTE_FLAG", "PAAPAN", check_compute_flag, process_compute_flag);
    registry.value("SET_TIMER", "PA", check_timer, process_set_timer);
    registry.value("ADD_TO_TIMER", "PAN", check_add_to_timer, process_add_to_timer);
    registry.value("DISPLAY_TIMER", "PAn", check_display_timer, process_display);
    registry.value("DISPLAY_COUNTDOWN", "PANn", check_display_countdown, process_display);
    registry.value("DISPLAY_VARIABLE", "PAnn", check_display_variable, process_display);
    registry.value("HIDE_TIMER", "", check_hide, process_hide);
    registry.value("HIDE_VARIABLE", "", check_hide, process_hide);
    registry.value("ADD_BONUS_TIME", "N", check_bonus_time, process_bonus_time);
    registry.value("SET_CAMPAIGN_FLAG", "PAN", check_campaign_flag, process_set_flag);
    registry.value("ADD_TO_CAMPAIGN_FLAG", "PAN", check_campaign_flag, process_add_to_campaign_flag);
    registry.value("EXPORT_VARIABLE", "PAA", check_export_variable, process_export_variable);
}

fn timer(args: &ArgList, index: usize) -> Result<u16, ScriptError> {
    let name = args.text(index)?;
    indexed_name("TIMER", name, TIMERS_COUNT).ok_or_else(|| ScriptError::UnknownName {
        kind: "timer",
        name: name.to_string(),
    })
}

fn check_flag(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<FlagValue, ScriptError> {
    let (store, index) = settable(args, 1, cx.catalog)?;
    Ok(FlagValue {
        store,
        index,
        value: args.number(2)?,
    })
}

fn process_set_flag(value: &FlagValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.players.iter(), |cx, player| {
        cx.apply(WorldOp::SetVariable {
            player,
            store: value.store,
            index: value.index,
            value: value.value,
        })
    });
    Ok(())
}

fn process_add_to_flag(value: &FlagValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.players.iter(), |cx, player| {
        let current = cx.sim.variable(player, value.store, value.index);
        cx.apply(WorldOp::SetVariable {
            player,
            store: value.store,
            index: value.index,
            value: current.saturating_add(value.value),
        })
    });
    Ok(())
}

fn check_randomise_flag(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<FlagValue, ScriptError> {
    let flag = check_flag(args, cx)?;
    in_range("random upper bound", flag.value, 1, i64::MAX)?;
    Ok(flag)
}

fn process_randomise_flag(value: &FlagValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.players.iter(), |cx, player| {
        let drawn = cx.rng.random_range(1..=value.value);
        cx.apply(WorldOp::SetVariable {
            player,
            store: value.store,
            index: value.index,
            value: drawn,
        })
    });
    Ok(())
}

/// Source kinds read as "controlled" or "available" when the last parameter is set.
fn alternative_kind(kind: VariableKind) -> VariableKind {
    use VariableKind as V;
    match kind {
        V::CreatureNum => V::ControlsCreature,
        V::TotalCreatures => V::ControlsTotalCreatures,
        V::TotalDiggers => V::ControlsTotalDiggers,
        V::GoodCreatures => V::ControlsGoodCreatures,
        V::EvilCreatures => V::ControlsEvilCreatures,
        V::RoomSlabs => V::AvailableRoom,
        V::DoorNum => V::AvailableDoor,
        V::TrapNum => V::AvailableTrap,
        other => other,
    }
}

fn check_compute_flag(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<ComputeValue, ScriptError> {
    let (store, index) = settable(args, 1, cx.catalog)?;
    let op_name = args.text(2)?;
    let op = ScriptOperator::from_name(op_name).ok_or_else(|| ScriptError::UnknownName {
        kind: "operation",
        name: op_name.to_string(),
    })?;
    let source_players = args.player(3)?;
    let source_name = args.text(4)?;
    let mut source = parse_variable(source_name, cx.catalog).ok_or_else(|| ScriptError::UnknownName {
        kind: "variable",
        name: source_name.to_string(),
    })?;
    if args.number(5)? != 0 {
        source.kind = alternative_kind(source.kind);
    }
    Ok(ComputeValue {
        store,
        index,
        op,
        source_players,
        source,
    })
}

fn process_compute_flag(value: &ComputeValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let operand: i64 = value
        .source_players
        .iter()
        .map(|p| condition_value(&*cx.sim, p, value.source))
        .fold(0, i64::saturating_add);
    cx.for_each_player(cx.players.iter(), |cx, player| {
        let current = cx.sim.variable(player, value.store, value.index);
        let result = value.op.apply(current, operand).clamp(0, COMPUTED_MAX);
        cx.apply(WorldOp::SetVariable {
            player,
            store: value.store,
            index: value.index,
            value: result,
        })
    });
    Ok(())
}

fn check_timer(args: &ArgList, _: &mut CheckContext<'_>) -> Result<TimerValue, ScriptError> {
    Ok(TimerValue {
        timer: timer(args, 1)?,
        amount: 0,
    })
}

fn process_set_timer(value: &TimerValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let turn = cx.sim.game_turn();
    cx.for_each_player(cx.players.iter(), |cx, player| {
        cx.apply(WorldOp::SetTimerStart {
            player,
            timer: value.timer,
            start: turn,
        })
    });
    Ok(())
}

fn check_add_to_timer(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<TimerValue, ScriptError> {
    Ok(TimerValue {
        timer: timer(args, 1)?,
        amount: cx.clamp("timer turns", args.number(2)?, TURNS_MIN, TURNS_MAX),
    })
}

/// Adding to a timer moves its start back; a stopped timer starts as if it had run that long.
fn process_add_to_timer(value: &TimerValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let turn = cx.sim.game_turn();
    cx.for_each_player(cx.players.iter(), |cx, player| {
        let start = cx.sim.timer_start(player, value.timer).unwrap_or(turn);
        cx.apply(WorldOp::SetTimerStart {
            player,
            timer: value.timer,
            start: start.saturating_sub(value.amount),
        })
    });
    Ok(())
}

fn check_display_timer(args: &ArgList, _: &mut CheckContext<'_>) -> Result<DisplayValue, ScriptError> {
    Ok(DisplayValue {
        variable: VariableRef::new(VariableKind::Timer, timer(args, 1)?),
        target: 0,
        countdown: false,
        clock: args.number(2)? != 0,
    })
}

fn check_display_countdown(args: &ArgList, _: &mut CheckContext<'_>) -> Result<DisplayValue, ScriptError> {
    let timer = timer(args, 1)?;
    let target = in_range("countdown turns", args.number(2)?, 1, i64::MAX)?;
    Ok(DisplayValue {
        variable: VariableRef::new(VariableKind::Timer, timer),
        target,
        countdown: true,
        clock: args.number(3)? != 0,
    })
}

fn check_display_variable(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<DisplayValue, ScriptError> {
    let name = args.text(1)?;
    let variable = parse_variable(name, cx.catalog).ok_or_else(|| ScriptError::UnknownName {
        kind: "variable",
        name: name.to_string(),
    })?;
    Ok(DisplayValue {
        variable,
        target: args.number(2)?,
        countdown: args.number(3)? != 0,
        clock: false,
    })
}

fn process_display(value: &DisplayValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let player = cx.player();
    if value.countdown && value.variable.kind == VariableKind::Timer {
        cx.countdowns.start(player, value.target);
    }
    cx.apply(WorldOp::ShowDisplay {
        player,
        variable: value.variable,
        target: value.target,
        countdown: value.countdown,
        clock: value.clock,
    })
}

fn check_hide(_: &ArgList, _: &mut CheckContext<'_>) -> Result<HideValue, ScriptError> {
    Ok(HideValue)
}

fn process_hide(_: &HideValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.countdowns.clear();
    cx.apply(WorldOp::HideDisplay)
}

fn check_bonus_time(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<AmountValue, ScriptError> {
    Ok(AmountValue {
        amount: cx.clamp("bonus turns", args.number(0)?, TURNS_MIN, TURNS_MAX),
        flag: false,
    })
}

fn process_bonus_time(value: &AmountValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let base = cx.sim.bonus_turn().unwrap_or_else(|| cx.sim.game_turn());
    cx.apply(WorldOp::SetBonusTurn {
        turn: base.saturating_add(value.amount),
    })
}

fn campaign_flag(args: &ArgList, index: usize) -> Result<u16, ScriptError> {
    let name = args.text(index)?;
    indexed_name("CAMPAIGN_FLAG", name, CAMPAIGN_FLAGS_COUNT).ok_or_else(|| ScriptError::UnknownName {
        kind: "campaign flag",
        name: name.to_string(),
    })
}

fn check_campaign_flag(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<FlagValue, ScriptError> {
    Ok(FlagValue {
        store: FlagStore::CampaignFlag,
        index: campaign_flag(args, 1)?,
        value: cx.clamp("campaign flag value", args.number(2)?, CAMPAIGN_MIN, CAMPAIGN_MAX),
    })
}

fn process_add_to_campaign_flag(value: &FlagValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.players.iter(), |cx, player| {
        let current = cx.sim.variable(player, FlagStore::CampaignFlag, value.index);
        cx.apply(WorldOp::SetVariable {
            player,
            store: FlagStore::CampaignFlag,
            index: value.index,
            value: current.saturating_add(value.value).clamp(CAMPAIGN_MIN, CAMPAIGN_MAX),
        })
    });
    Ok(())
}

fn check_export_variable(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<ExportValue, ScriptError> {
    let name = args.text(1)?;
    let source = parse_variable(name, cx.catalog).ok_or_else(|| ScriptError::UnknownName {
        kind: "variable",
        name: name.to_string(),
    })?;
    Ok(ExportValue {
        source,
        flag: campaign_flag(args, 2)?,
    })
}

/// Copy the current value of a variable into the player's campaign flag.
fn process_export_variable(value: &ExportValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.players.iter(), |cx, player| {
        let current = condition_value(&*cx.sim, player, value.source);
        cx.apply(WorldOp::SetVariable {
            player,
            store: FlagStore::CampaignFlag,
            index: value.flag,
            value: current.clamp(CAMPAIGN_MIN, CAMPAIGN_MAX),
        })
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::value::Payload;

    #[test]
    fn set_flag_accepts_every_settable_store() {
        let mut h = Harness::new();
        let value = h.check("SET_FLAG(PLAYER0, FLAG3, 5)").unwrap().unwrap();
        assert_eq!(FlagValue::view(&value), Some(&FlagValue {
            store: FlagStore::Flag,
            index: 3,
            value: 5,
        }));
        let value = h.check("SET_FLAG(PLAYER0, SACRIFICED[TROLL], 1)").unwrap().unwrap();
        assert_eq!(FlagValue::view(&value).map(|f| (f.store, f.index)), Some((FlagStore::Sacrificed, 2)));
        assert!(h.check("SET_FLAG(PLAYER0, MONEY, 5)").is_err());
    }

    #[test]
    fn randomise_needs_a_positive_bound() {
        let mut h = Harness::new();
        assert!(h.check("RANDOMISE_FLAG(PLAYER0, FLAG0, 6)").is_ok());
        assert!(matches!(
            h.check("RANDOMISE_FLAG(PLAYER0, FLAG0, 0)"),
            Err(ScriptError::OutOfRange { .. })
        ));
    }

    #[test]
    fn compute_flag_switches_to_controlled_counts() {
        let mut h = Harness::new();
        let value = h.check("COMPUTE_FLAG(PLAYER0, FLAG1, INCREASE, PLAYER0, TROLL, 1)").unwrap().unwrap();
        let compute = ComputeValue::view(&value).unwrap();
        assert_eq!(compute.op, ScriptOperator::Increase);
        assert_eq!(compute.source, VariableRef::new(VariableKind::ControlsCreature, 2));
        assert!(h.check("COMPUTE_FLAG(PLAYER0, FLAG1, DIVIDE, PLAYER0, TROLL, 0)").is_err());
    }

    #[test]
    fn countdown_turns_must_be_positive() {
        let mut h = Harness::new();
        let value = h.check("DISPLAY_COUNTDOWN(PLAYER0, TIMER1, 100)").unwrap().unwrap();
        let display = DisplayValue::view(&value).unwrap();
        assert!(display.countdown && !display.clock);
        assert_eq!(display.target, 100);
        assert!(h.check("DISPLAY_COUNTDOWN(PLAYER0, TIMER1, 0)").is_err());
        assert!(h.check("DISPLAY_TIMER(PLAYER0, TIMER8)").is_err());
    }

    #[test]
    fn timer_shifts_are_clamped_with_a_warning() {
        let mut h = Harness::new();
        let value = h.check("ADD_TO_TIMER(PLAYER0, TIMER0, 9223372036854775807)").unwrap().unwrap();
        assert_eq!(TimerValue::view(&value).map(|t| t.amount), Some(TURNS_MAX));
        let value = h.check("ADD_BONUS_TIME(-9223372036854775808)").unwrap().unwrap();
        assert_eq!(AmountValue::view(&value).map(|a| a.amount), Some(TURNS_MIN));
        assert_eq!(h.diagnostics.warnings().count(), 2);
    }

    #[test]
    fn campaign_flags_hold_32_bit_values() {
        let mut h = Harness::new();
        let value = h.check("SET_CAMPAIGN_FLAG(PLAYER0, CAMPAIGN_FLAG5, 5000000000)").unwrap().unwrap();
        assert_eq!(FlagValue::view(&value), Some(&FlagValue {
            store: FlagStore::CampaignFlag,
            index: 5,
            value: CAMPAIGN_MAX,
        }));
        assert_eq!(h.diagnostics.warnings().count(), 1);
        assert!(matches!(
            h.check("ADD_TO_CAMPAIGN_FLAG(PLAYER0, FLAG1, 1)"),
            Err(ScriptError::UnknownName { kind: "campaign flag", .. })
        ));
        assert!(h.check("SET_CAMPAIGN_FLAG(PLAYER0, CAMPAIGN_FLAG8, 1)").is_err());
    }

    #[test]
    fn export_reads_any_variable() {
        let mut h = Harness::new();
        let value = h.check("EXPORT_VARIABLE(PLAYER0, TOTAL_GOLD_MINED, CAMPAIGN_FLAG2)").unwrap().unwrap();
        assert_eq!(ExportValue::view(&value), Some(&ExportValue {
            source: VariableRef::new(VariableKind::TotalGoldMined, 0),
            flag: 2,
        }));
        let value = h.check("EXPORT_VARIABLE(PLAYER0, TROLL, CAMPAIGN_FLAG0)").unwrap().unwrap();
        assert_eq!(ExportValue::view(&value).map(|e| e.source), Some(VariableRef::new(VariableKind::CreatureNum, 2)));
        assert!(h.check("EXPORT_VARIABLE(PLAYER0, MONEY, FLAG2)").is_err());
        assert!(h.check("EXPORT_VARIABLE(PLAYER0, WEALTH, CAMPAIGN_FLAG2)").is_err());
    }
}
