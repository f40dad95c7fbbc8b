//! Conditions, blocks and loader switches.
//!
//! None of these commands reach the world; they shape how the lines after
//! them are compiled.

use keeper_data::{CONTROLS_VARIABLES, Comparison, PlayerId, PlayerRange, VariableKind, lookup};

use super::{in_range, kind_id, slab_position};
use crate::codec::ArgList;
use crate::condition::{Condition, ConditionRef, Operand, VariableRef, parse_variable};
use crate::context::CheckContext;
use crate::diagnostic::{CapacityError, ScriptError};
use crate::registry::CommandRegistry;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.condition("IF", "PAOAa", check_if);
    registry.condition("IF_AVAILABLE", "PAON", check_if_available);
    registry.condition("IF_CONTROLS", "PAON", check_if_controls);
    registry.condition("IF_ACTION_POINT", "NP", check_if_action_point);
    registry.condition("IF_SLAB_OWNER", "NNP", check_if_slab_owner);
    registry.condition("IF_SLAB_TYPE", "NNS", check_if_slab_type);
    registry.control("ENDIF", "", check_endif);
    registry.control("NEXT_COMMAND_REUSABLE", "", check_next_command_reusable);
    registry.control("LEVEL_VERSION", "N", check_level_version);
    registry.control("CREATE_PARTY", "A", check_create_party);
    registry.control("WIN_GAME", "", check_win_game);
    registry.control("LOSE_GAME", "", check_lose_game);
    registry.control("RUN_AFTER_VICTORY", "B", check_run_after_victory);
}

/// Push a condition and open its block.
fn open(
    cx: &mut CheckContext<'_>,
    players: PlayerRange,
    left: VariableRef,
    op: Comparison,
    right: Operand,
) -> Result<(), ScriptError> {
    if let Some(player) = players.single_player()
        && left.kind.requires_dungeon()
        && !cx.sim.has_dungeon(player)
    {
        cx.warn(format!("{player} has no dungeon; its {:?} reads as 0", left.kind));
    }
    cx.conditions.push(Condition {
        players,
        op,
        left,
        right,
        parent: ConditionRef::Always,
    })?;
    Ok(())
}

fn variable(name: &str, cx: &CheckContext<'_>) -> Result<VariableRef, ScriptError> {
    parse_variable(name, cx.catalog).ok_or_else(|| ScriptError::UnknownName {
        kind: "variable",
        name: name.to_string(),
    })
}

fn literal(text: &str) -> Result<i64, ScriptError> {
    text.parse().map_err(|_| ScriptError::InvalidArgument {
        index: 4,
        kind: "number",
        value: text.to_string(),
    })
}

fn check_if(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    let players = args.player(0)?;
    let left = variable(args.text(1)?, cx)?;
    let op = args.operator(2)?;
    let fourth = args.text(3)?;
    let right = match PlayerRange::from_name(fourth) {
        Some(range) if args.is_supplied(4) => {
            let player = range.single_player().ok_or_else(|| ScriptError::InvalidArgument {
                index: 4,
                kind: "single player",
                value: fourth.to_string(),
            })?;
            Operand::Variable {
                player,
                var: variable(args.text(4)?, cx)?,
            }
        },
        _ => {
            if args.is_supplied(4) {
                cx.warn("parameter 5 ignored when comparing against a number");
            }
            Operand::Literal(literal(fourth)?)
        },
    };
    open(cx, players, left, op, right)
}

fn check_if_available(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    let players = args.player(0)?;
    let name = args.text(1)?;
    let catalog = cx.catalog;
    let left = [
        (VariableKind::AvailableCreature, &catalog.creatures),
        (VariableKind::AvailableRoom, &catalog.rooms),
        (VariableKind::AvailableDoor, &catalog.doors),
        (VariableKind::AvailableTrap, &catalog.traps),
    ]
    .into_iter()
    .find_map(|(kind, table)| table.id(name).map(|id| VariableRef::new(kind, id)))
    .ok_or_else(|| ScriptError::UnknownName {
        kind: "creature, room, door or trap",
        name: name.to_string(),
    })?;
    let op = args.operator(2)?;
    let value = args.number(3)?;
    open(cx, players, left, op, Operand::Literal(value))
}

fn check_if_controls(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    let players = args.player(0)?;
    let name = args.text(1)?;
    let left = match lookup(CONTROLS_VARIABLES, name) {
        Some(kind) => VariableRef::new(kind, 0),
        None => VariableRef::new(VariableKind::ControlsCreature, kind_id(&cx.catalog.creatures, "creature", name)?),
    };
    let op = args.operator(2)?;
    let value = args.number(3)?;
    open(cx, players, left, op, Operand::Literal(value))
}

fn check_if_action_point(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    let point = in_range("action point", args.number(0)?, 1, i64::from(u16::MAX))?;
    let point = u16::try_from(point).unwrap_or(u16::MAX);
    if cx.sim.action_point(point).is_none() {
        return Err(ScriptError::UnknownName {
            kind: "action point",
            name: point.to_string(),
        });
    }
    let players = args.player(1)?;
    let left = VariableRef::new(VariableKind::ActionPointTriggered, point);
    open(cx, players, left, Comparison::Equal, Operand::Literal(1))
}

fn slab_ref(kind: VariableKind, (x, y): (u16, u16)) -> VariableRef {
    VariableRef { kind, id: x, aux: y }
}

fn check_if_slab_owner(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    let position = slab_position(args, 0, cx)?;
    let owner = args.single_player(2)?;
    let left = slab_ref(VariableKind::SlabOwner, position);
    open(cx, PlayerRange::single(PlayerId(0)), left, Comparison::Equal, Operand::Literal(i64::from(owner.0)))
}

fn check_if_slab_type(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    let position = slab_position(args, 0, cx)?;
    let kind = args.slab(2)?;
    let left = slab_ref(VariableKind::SlabType, position);
    open(cx, PlayerRange::single(PlayerId(0)), left, Comparison::Equal, Operand::Literal(i64::from(kind)))
}

fn check_endif(_: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    cx.conditions
        .pop()
        .map(|_| ())
        .ok_or(ScriptError::Misplaced("ENDIF without a matching IF"))
}

fn check_next_command_reusable(_: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    cx.load.next_command_reusable = 2;
    Ok(())
}

fn check_level_version(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    cx.load.level_version = args.number(0)?;
    Ok(())
}

fn check_create_party(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    if cx.in_condition() {
        cx.warn("parties are created at load time; the enclosing condition is ignored");
    }
    let name = args.text(0)?.to_string();
    cx.parties.create(&name)?;
    Ok(())
}

fn record_outcome(cx: &mut CheckContext<'_>, lose: bool) -> Result<(), ScriptError> {
    if !cx.in_condition() {
        return Err(ScriptError::Misplaced(if lose {
            "LOSE_GAME must be inside a condition"
        } else {
            "WIN_GAME must be inside a condition"
        }));
    }
    let limit = cx.config.max_win_conditions;
    let gate = cx.conditions.current();
    let list = if lose {
        &mut cx.load.lose_conditions
    } else {
        &mut cx.load.win_conditions
    };
    if list.len() >= limit {
        return Err(CapacityError {
            what: if lose { "lose conditions" } else { "win conditions" },
            limit,
        }
        .into());
    }
    list.push(gate);
    Ok(())
}

fn check_win_game(_: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    record_outcome(cx, false)
}

fn check_lose_game(_: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    record_outcome(cx, true)
}

fn check_run_after_victory(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<(), ScriptError> {
    cx.load.run_after_victory = args.boolean(0)? != 0;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;

    #[test]
    fn if_pushes_literal_and_two_variable_conditions() {
        let mut h = Harness::new();
        h.check("IF(PLAYER0, MONEY >= 1000)").unwrap();
        let first = h.conditions.get(0).unwrap();
        assert_eq!(first.left.kind, VariableKind::Money);
        assert_eq!(first.right, Operand::Literal(1000));

        h.check("IF(PLAYER0, FLAG1 < PLAYER_GOOD, FLAG2)").unwrap();
        let second = h.conditions.get(1).unwrap();
        assert_eq!(second.parent, ConditionRef::Index(0));
        assert_eq!(second.right, Operand::Variable {
            player: PlayerId(4),
            var: VariableRef::new(VariableKind::Flag, 2),
        });
        assert_eq!(h.conditions.depth(), 2);
    }

    #[test]
    fn if_on_a_player_without_dungeon_warns() {
        let mut h = Harness::new();
        h.check("IF(PLAYER2, MONEY > 0)").unwrap();
        assert_eq!(h.diagnostics.warnings().count(), 1);
        h.check("IF(PLAYER2, GAME_TURN > 0)").unwrap();
        assert_eq!(h.diagnostics.warnings().count(), 1);
    }

    #[test]
    fn unknown_variable_is_refused() {
        let mut h = Harness::new();
        let err = h.check("IF(PLAYER0, GOLD > 0)").unwrap_err();
        assert_eq!(err, ScriptError::UnknownName {
            kind: "variable",
            name: "GOLD".into(),
        });
        assert!(h.conditions.is_empty());
    }

    #[test]
    fn specialised_ifs_pick_their_variable_kinds() {
        let mut h = Harness::new();
        h.check("IF_AVAILABLE(PLAYER0, LIBRARY == 1)").unwrap();
        assert_eq!(h.conditions.get(0).unwrap().left, VariableRef::new(VariableKind::AvailableRoom, 3));
        h.check("IF_CONTROLS(PLAYER0, TROLL > 2)").unwrap();
        assert_eq!(h.conditions.get(1).unwrap().left, VariableRef::new(VariableKind::ControlsCreature, 2));
        h.check("IF_CONTROLS(PLAYER0, TOTAL_DIGGERS > 2)").unwrap();
        assert_eq!(h.conditions.get(2).unwrap().left.kind, VariableKind::ControlsTotalDiggers);
        h.check("IF_ACTION_POINT(1, PLAYER0)").unwrap();
        assert_eq!(h.conditions.get(3).unwrap().left.kind, VariableKind::ActionPointTriggered);
        assert!(h.check("IF_ACTION_POINT(9, PLAYER0)").is_err());
        h.check("IF_SLAB_TYPE(3, 4, GOLD)").unwrap();
        let slab = h.conditions.get(4).unwrap();
        assert_eq!((slab.left.id, slab.left.aux), (3, 4));
        assert_eq!(slab.right, Operand::Literal(2));
        assert!(h.check("IF_SLAB_OWNER(85, 0, PLAYER1)").is_err());
    }

    #[test]
    fn endif_without_if_is_an_error() {
        let mut h = Harness::new();
        assert!(matches!(h.check("ENDIF"), Err(ScriptError::Misplaced(_))));
        h.check("IF(PLAYER0, FLAG0 == 1)").unwrap();
        h.check("ENDIF").unwrap();
        assert_eq!(h.conditions.depth(), 0);
    }

    #[test]
    fn win_game_needs_a_condition_and_respects_the_limit() {
        let mut h = Harness::new();
        assert!(h.check("WIN_GAME").is_err());
        h.check("IF(PLAYER0, FLAG0 == 1)").unwrap();
        for _ in 0..4 {
            h.check("WIN_GAME").unwrap();
        }
        assert!(matches!(h.check("WIN_GAME"), Err(ScriptError::Capacity(_))));
        h.check("LOSE_GAME").unwrap();
        assert_eq!(h.load.win_conditions.len(), 4);
        assert_eq!(h.load.lose_conditions, vec![ConditionRef::Index(0)]);
    }

    #[test]
    fn loader_switches() {
        let mut h = Harness::new();
        h.check("LEVEL_VERSION(1)").unwrap();
        h.check("NEXT_COMMAND_REUSABLE").unwrap();
        h.check("RUN_AFTER_VICTORY(1)").unwrap();
        assert_eq!(h.load.level_version, 1);
        assert_eq!(h.load.next_command_reusable, 2);
        assert!(h.load.run_after_victory);
    }

    #[test]
    fn create_party_inside_a_condition_warns() {
        let mut h = Harness::new();
        h.check("IF(PLAYER0, FLAG0 == 1)").unwrap();
        h.check("CREATE_PARTY(LANDLORD)").unwrap();
        assert_eq!(h.parties.find("LANDLORD"), Some(0));
        assert_eq!(h.diagnostics.warnings().count(), 1);
        assert!(h.check("CREATE_PARTY(LANDLORD)").is_err());
    }
}
