//! Map reveal, slab changes, effects and action points.

use keeper_data::{FillKind, MapDef};

use super::{clamp_u16, kind_id, location, position_of, slab_position, subtile_position};
use crate::codec::ArgList;
use crate::context::{CheckContext, ExecutionContext};
use crate::diagnostic::{ProcessError, ScriptError};
use crate::registry::CommandRegistry;
use crate::sim::WorldOp;
use crate::value::{AmountValue, EffectAt, EffectValue, RectValue, RevealValue, SlabTarget, SlabValue};

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.value("REVEAL_MAP_LOCATION", "PLN", check_reveal_location, process_reveal_location);
    registry.value("REVEAL_MAP_RECT", "PNNNN", check_reveal_rect, process_reveal_rect);
    registry.value("CONCEAL_MAP_RECT", "PNNNNa", check_conceal_rect, process_conceal_rect);
    registry.value("CHANGE_SLAB_OWNER", "NNPa", check_slab_owner, process_slab);
    registry.value("CHANGE_SLAB_TYPE", "NNSa", check_slab_type, process_slab);
    registry.value("CREATE_EFFECT", "AAn", check_effect, process_effect);
    registry.value("CREATE_EFFECT_AT_POS", "ANNn", check_effect_at_pos, process_effect);
    registry.value("RESET_ACTION_POINT", "N", check_reset_action_point, process_reset_action_point);
}

fn check_reveal_location(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<RevealValue, ScriptError> {
    let location = location(args, 1, cx)?;
    let radius = clamp_u16(cx, "reveal radius", args.number(2)?, 0);
    Ok(RevealValue { location, radius })
}

fn process_reveal_location(value: &RevealValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.players.iter(), |cx, player| {
        let (x, y) = position_of(cx, value.location, player)?;
        cx.apply(WorldOp::RevealArea {
            player,
            x,
            y,
            radius: value.radius,
        })
    });
    Ok(())
}

/// Rectangle centred on a subtile, trimmed so it stays on the map.
fn rect(args: &ArgList, cx: &mut CheckContext<'_>, all: bool) -> Result<RectValue, ScriptError> {
    let (x, y) = subtile_position(args, 1, cx)?;
    let map = cx.sim.map();
    let per = MapDef::SUBTILES_PER_SLAB;
    let width = cx.clamp("width", args.number(3)?, 1, i64::from(map.width.saturating_mul(per)));
    let height = cx.clamp("height", args.number(4)?, 1, i64::from(map.height.saturating_mul(per)));
    Ok(RectValue {
        x,
        y,
        width: u16::try_from(width).unwrap_or(u16::MAX),
        height: u16::try_from(height).unwrap_or(u16::MAX),
        all,
    })
}

fn check_reveal_rect(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<RectValue, ScriptError> {
    rect(args, cx, false)
}

fn process_reveal_rect(value: &RectValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.players.iter(), |cx, player| {
        cx.apply(WorldOp::RevealRect {
            player,
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
        })
    });
    Ok(())
}

fn check_conceal_rect(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<RectValue, ScriptError> {
    let all = match args.text(5)? {
        "" => false,
        word if word.eq_ignore_ascii_case("ALL") => true,
        word => {
            return Err(ScriptError::InvalidArgument {
                index: 6,
                kind: "conceal mode",
                value: word.to_string(),
            });
        },
    };
    rect(args, cx, all)
}

fn process_conceal_rect(value: &RectValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.players.iter(), |cx, player| {
        cx.apply(WorldOp::ConcealRect {
            player,
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
            all: value.all,
        })
    });
    Ok(())
}

fn fill(args: &ArgList, index: usize) -> Result<FillKind, ScriptError> {
    match args.text(index)? {
        "" => Ok(FillKind::NoFill),
        word => FillKind::from_name(word).ok_or_else(|| ScriptError::UnknownName {
            kind: "fill type",
            name: word.to_string(),
        }),
    }
}

fn check_slab_owner(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<SlabValue, ScriptError> {
    let (x, y) = slab_position(args, 0, cx)?;
    Ok(SlabValue {
        x,
        y,
        target: SlabTarget::Owner(args.single_player(2)?),
        fill: fill(args, 3)?,
    })
}

fn check_slab_type(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<SlabValue, ScriptError> {
    let (x, y) = slab_position(args, 0, cx)?;
    Ok(SlabValue {
        x,
        y,
        target: SlabTarget::Kind(args.slab(2)?),
        fill: fill(args, 3)?,
    })
}

fn process_slab(value: &SlabValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let op = match value.target {
        SlabTarget::Owner(owner) => WorldOp::SetSlabOwner {
            x: value.x,
            y: value.y,
            owner,
            fill: value.fill,
        },
        SlabTarget::Kind(kind) => WorldOp::SetSlabType {
            x: value.x,
            y: value.y,
            kind,
            fill: value.fill,
        },
    };
    cx.apply(op)
}

/// Effect kind by name or raw number; negative numbers address effect elements.
fn effect_kind(args: &ArgList, cx: &CheckContext<'_>) -> Result<i64, ScriptError> {
    let name = args.text(0)?;
    match name.parse::<i64>() {
        Ok(0) => Err(ScriptError::Invalid("effect 0 does not exist".to_string())),
        Ok(number) => Ok(number),
        Err(_) => kind_id(&cx.catalog.effects, "effect", name).map(i64::from),
    }
}

fn check_effect(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<EffectValue, ScriptError> {
    let effect = effect_kind(args, cx)?;
    let location = location(args, 1, cx)?;
    Ok(EffectValue {
        effect,
        at: EffectAt::Location(location),
        height: args.number(2)?,
    })
}

fn check_effect_at_pos(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<EffectValue, ScriptError> {
    let effect = effect_kind(args, cx)?;
    let (x, y) = subtile_position(args, 1, cx)?;
    Ok(EffectValue {
        effect,
        at: EffectAt::Position(x, y),
        height: args.number(3)?,
    })
}

fn process_effect(value: &EffectValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let (x, y) = match value.at {
        EffectAt::Position(x, y) => (x, y),
        EffectAt::Location(location) => position_of(cx, location, cx.player())?,
    };
    cx.apply(WorldOp::CreateEffect {
        effect: value.effect,
        x,
        y,
        height: value.height,
    })
}

fn check_reset_action_point(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<AmountValue, ScriptError> {
    let number = args.number(0)?;
    let id = u16::try_from(number)
        .ok()
        .filter(|&id| id > 0 && cx.sim.action_point(id).is_some())
        .ok_or_else(|| ScriptError::UnknownName {
            kind: "action point",
            name: number.to_string(),
        })?;
    Ok(AmountValue {
        amount: i64::from(id),
        flag: false,
    })
}

/// Every player may trigger the action point again.
fn process_reset_action_point(value: &AmountValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let id = u16::try_from(value.amount)
        .map_err(|_| ProcessError::Unresolved(format!("action point {}", value.amount)))?;
    cx.apply(WorldOp::ResetActionPoint { id })
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::location::MapLocation;
    use crate::value::Payload;
    use keeper_data::PlayerId;

    #[test]
    fn rectangles_are_checked_against_the_map() {
        let mut h = Harness::new();
        let value = h.check("REVEAL_MAP_RECT(PLAYER0, 40, 40, 0, 9)").unwrap().unwrap();
        let rect = RectValue::view(&value).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (40, 40, 1, 9));
        assert_eq!(h.diagnostics.warnings().count(), 1);
        assert!(h.check("REVEAL_MAP_RECT(PLAYER0, 255, 0, 5, 5)").is_err());
        let value = h.check("CONCEAL_MAP_RECT(PLAYER0, 10, 10, 5, 5, ALL)").unwrap().unwrap();
        assert!(RectValue::view(&value).unwrap().all);
        assert!(h.check("CONCEAL_MAP_RECT(PLAYER0, 10, 10, 5, 5, SOME)").is_err());
    }

    #[test]
    fn slab_changes_take_fill_modes() {
        let mut h = Harness::new();
        let value = h.check("CHANGE_SLAB_OWNER(5, 6, PLAYER1, MATCH)").unwrap().unwrap();
        assert_eq!(SlabValue::view(&value), Some(&SlabValue {
            x: 5,
            y: 6,
            target: SlabTarget::Owner(PlayerId(1)),
            fill: FillKind::Match,
        }));
        let value = h.check("CHANGE_SLAB_TYPE(5, 6, PATH)").unwrap().unwrap();
        assert_eq!(SlabValue::view(&value).map(|s| s.fill), Some(FillKind::NoFill));
        assert!(h.check("CHANGE_SLAB_TYPE(5, 6, PATH, SPLASH)").is_err());
    }

    #[test]
    fn effects_by_name_or_number() {
        let mut h = Harness::new();
        let value = h.check("CREATE_EFFECT(EFFECT_EXPLOSION_1, 1)").unwrap().unwrap();
        let effect = EffectValue::view(&value).unwrap();
        assert_eq!(effect.effect, 1);
        assert_eq!(effect.at, EffectAt::Location(MapLocation::ActionPoint(1)));
        let value = h.check("CREATE_EFFECT_AT_POS(-7, 12, 13, 256)").unwrap().unwrap();
        assert_eq!(EffectValue::view(&value).map(|e| (e.effect, e.height)), Some((-7, 256)));
        assert!(h.check("CREATE_EFFECT(0, 1)").is_err());
    }

    #[test]
    fn only_existing_action_points_reset() {
        let mut h = Harness::new();
        let value = h.check("RESET_ACTION_POINT(1)").unwrap().unwrap();
        assert_eq!(AmountValue::view(&value).map(|a| a.amount), Some(1));
        assert!(matches!(
            h.check("RESET_ACTION_POINT(2)"),
            Err(ScriptError::UnknownName { kind: "action point", .. })
        ));
        assert!(h.check("RESET_ACTION_POINT(-1)").is_err());
    }
}
