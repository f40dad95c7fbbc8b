//! Hero parties, creature spawning and changes to single creatures.

use keeper_data::{HeadFor, HeroObjective, KEEPERS_COUNT, PlayerId, SelectCriteria};

use super::{clamp_u16, creature_kind, creature_level, in_range, location, position_of};
use crate::codec::ArgList;
use crate::context::{CheckContext, ExecutionContext};
use crate::diagnostic::{ProcessError, ScriptError};
use crate::party::PartyMember;
use crate::registry::CommandRegistry;
use crate::sim::{Heading, WorldOp};
use crate::value::{
    OwnerChangeValue, PartyMemberValue, SelectValue, SpawnCreatureValue, SpawnPartyValue, TunnellerValue,
};

/// Most copies one spawn command may request.
const MAX_COPIES: i64 = 255;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.value("ADD_TO_PARTY", "ACNNAN", check_add_to_party, process_add_to_party);
    registry.value("DELETE_FROM_PARTY", "ACN", check_delete_from_party, process_delete_from_party);
    registry.value("ADD_PARTY_TO_LEVEL", "PAAN", check_add_party_to_level, process_add_party_to_level);
    registry.value("ADD_CREATURE_TO_LEVEL", "PCANNN", check_add_creature_to_level, process_add_creature_to_level);
    registry.value("KILL_CREATURE", "PC!AN", check_select, process_kill_creature);
    registry.value("CHANGE_CREATURES_ANNOYANCE", "PC!AN", check_select, process_change_annoyance);
    registry.value("LEVEL_UP_CREATURE", "PC!AN", check_level_up, process_level_up);
    registry.value("CHANGE_CREATURE_OWNER", "PC!AP", check_change_owner, process_change_owner);
    registry.value("ADD_TUNNELLER_TO_LEVEL", "PAANNN", check_add_tunneller, process_add_tunneller);
    registry.value("ADD_TUNNELLER_PARTY_TO_LEVEL", "PAAANNN", check_add_tunneller_party, process_add_tunneller);
}

fn party(args: &ArgList, cx: &CheckContext<'_>) -> Result<u8, ScriptError> {
    let name = args.text(0)?;
    cx.parties.find(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "party",
        name: name.to_string(),
    })
}

fn copies(value: i64) -> Result<u16, ScriptError> {
    let copies = in_range("copies", value, 1, MAX_COPIES)?;
    Ok(u16::try_from(copies).unwrap_or(u16::MAX))
}

fn check_add_to_party(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<PartyMemberValue, ScriptError> {
    let party = party(args, cx)?;
    let creature = creature_kind(args, 1)?;
    let level = creature_level(args.number(2)?, cx)?;
    let gold = cx.clamp("carried gold", args.number(3)?, 0, i64::from(i32::MAX));
    let objective_name = args.text(4)?;
    let objective = HeroObjective::from_name(objective_name).ok_or_else(|| ScriptError::UnknownName {
        kind: "objective",
        name: objective_name.to_string(),
    })?;
    let countdown = cx.clamp("countdown", args.number(5)?, 0, i64::from(i32::MAX));
    Ok(PartyMemberValue {
        party,
        member: PartyMember {
            creature,
            level,
            gold,
            objective,
            countdown,
        },
    })
}

fn process_add_to_party(value: &PartyMemberValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.parties.add_member(value.party, value.member)
}

fn check_delete_from_party(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<PartyMemberValue, ScriptError> {
    let party = party(args, cx)?;
    let creature = creature_kind(args, 1)?;
    let level = creature_level(args.number(2)?, cx)?;
    Ok(PartyMemberValue {
        party,
        member: PartyMember {
            creature,
            level,
            gold: 0,
            objective: HeroObjective::AttackEnemies,
            countdown: 0,
        },
    })
}

fn process_delete_from_party(value: &PartyMemberValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let member = value.member;
    if cx.parties.remove_member(value.party, member.creature, member.level) {
        Ok(())
    } else {
        Err(ProcessError::Unresolved(format!(
            "party member of kind {} at level {}",
            member.creature, member.level
        )))
    }
}

fn check_add_party_to_level(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<SpawnPartyValue, ScriptError> {
    args.single_player(0)?;
    let name = args.text(1)?;
    let party = cx.parties.find(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "party",
        name: name.to_string(),
    })?;
    let location = location(args, 2, cx)?;
    let copies = copies(args.number(3)?)?;
    Ok(SpawnPartyValue {
        party,
        location,
        copies,
    })
}

/// Spawns the members the party holds right now.
fn process_add_party_to_level(value: &SpawnPartyValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let owner = cx.player();
    let members = match cx.parties.get(value.party) {
        Some(party) if !party.members.is_empty() => party.members.clone(),
        Some(party) => return Err(ProcessError::Unresolved(format!("members of empty party '{}'", party.name))),
        None => return Err(ProcessError::Unresolved(format!("party #{}", value.party))),
    };
    let (x, y) = position_of(cx, value.location, owner)?;
    for _ in 0..value.copies {
        for member in &members {
            cx.apply(WorldOp::SpawnCreature {
                owner,
                creature: member.creature,
                x,
                y,
                level: member.level,
                gold: member.gold,
                objective: Some(member.objective),
            })?;
        }
    }
    Ok(())
}

fn check_add_creature_to_level(
    args: &ArgList,
    cx: &mut CheckContext<'_>,
) -> Result<SpawnCreatureValue, ScriptError> {
    args.single_player(0)?;
    let creature = creature_kind(args, 1)?;
    let location = location(args, 2, cx)?;
    let level = creature_level(args.number(3)?, cx)?;
    let copies = copies(args.number(4)?)?;
    let gold = cx.clamp("carried gold", args.number(5)?, 0, i64::from(i32::MAX));
    Ok(SpawnCreatureValue {
        creature,
        location,
        level,
        copies,
        gold,
    })
}

fn process_add_creature_to_level(
    value: &SpawnCreatureValue,
    cx: &mut ExecutionContext<'_>,
) -> Result<(), ProcessError> {
    let owner = cx.player();
    let (x, y) = position_of(cx, value.location, owner)?;
    for _ in 0..value.copies {
        cx.apply(WorldOp::SpawnCreature {
            owner,
            creature: value.creature,
            x,
            y,
            level: value.level,
            gold: value.gold,
            objective: None,
        })?;
    }
    Ok(())
}

fn criteria(args: &ArgList, index: usize) -> Result<SelectCriteria, ScriptError> {
    let name = args.text(index)?;
    SelectCriteria::from_name(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "selection criteria",
        name: name.to_string(),
    })
}

fn check_select(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<SelectValue, ScriptError> {
    let creature = args.creature(1)?;
    let criteria = criteria(args, 2)?;
    let amount = i64::from(clamp_u16(cx, "amount", args.number(3)?, 0));
    Ok(SelectValue {
        creature,
        criteria,
        amount,
    })
}

fn process_kill_creature(value: &SelectValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        cx.apply(WorldOp::KillCreatures {
            player,
            creature: value.creature.id(),
            criteria: value.criteria,
            count: value.amount,
        })
    });
    Ok(())
}

fn process_change_annoyance(value: &SelectValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        cx.apply(WorldOp::ChangeAnnoyance {
            player,
            creature: value.creature.id(),
            criteria: value.criteria,
            amount: value.amount,
        })
    });
    Ok(())
}

/// The level count is capped one short of the top level.
fn check_level_up(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<SelectValue, ScriptError> {
    let creature = args.creature(1)?;
    let criteria = criteria(args, 2)?;
    let levels = in_range("level count", args.number(3)?, 1, i64::MAX)?;
    let cap = i64::from(cx.config.max_creature_level.saturating_sub(1).max(1));
    Ok(SelectValue {
        creature,
        criteria,
        amount: cx.clamp("level count", levels, 1, cap),
    })
}

fn process_level_up(value: &SelectValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let levels = u8::try_from(value.amount).unwrap_or(u8::MAX);
    let max_level = cx.config.max_creature_level;
    cx.for_each_player(cx.dungeon_players(), |cx, player| {
        cx.apply(WorldOp::LevelUpCreature {
            player,
            creature: value.creature.id(),
            criteria: value.criteria,
            levels,
            max_level,
        })
    });
    Ok(())
}

fn check_change_owner(args: &ArgList, _: &mut CheckContext<'_>) -> Result<OwnerChangeValue, ScriptError> {
    Ok(OwnerChangeValue {
        creature: args.creature(1)?,
        criteria: criteria(args, 2)?,
        new_owner: args.single_player(3)?,
    })
}

fn process_change_owner(value: &OwnerChangeValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let owners: Vec<_> = cx.dungeon_players().into_iter().filter(|p| *p != value.new_owner).collect();
    cx.for_each_player(owners, |cx, player| {
        cx.apply(WorldOp::ChangeCreatureOwner {
            player,
            creature: value.creature.id(),
            criteria: value.criteria,
            new_owner: value.new_owner,
        })
    });
    Ok(())
}

/// Digging target from a heading word and its numeric target.
fn heading(args: &ArgList, index: usize, cx: &mut CheckContext<'_>) -> Result<Heading, ScriptError> {
    let name = args.text(index)?;
    let head_for = HeadFor::from_name(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "heading",
        name: name.to_string(),
    })?;
    let target = args.number(index + 1)?;
    match head_for {
        HeadFor::ActionPoint => u16::try_from(target)
            .ok()
            .filter(|&id| cx.sim.action_point(id).is_some())
            .map(Heading::ActionPoint)
            .ok_or_else(|| ScriptError::UnknownName {
                kind: "action point",
                name: target.to_string(),
            }),
        HeadFor::Dungeon | HeadFor::DungeonHeart => {
            let keeper = in_range("target player", target, 0, i64::from(KEEPERS_COUNT) - 1)?;
            let player = PlayerId(u8::try_from(keeper).unwrap_or_default());
            if head_for == HeadFor::Dungeon {
                Ok(Heading::Dungeon(player))
            } else {
                if cx.sim.heart(player).is_none() {
                    cx.warn(format!("tunneller heads for the heart of {player}, which has none"));
                }
                Ok(Heading::DungeonHeart(player))
            }
        },
        HeadFor::AppropriateDungeon => Ok(Heading::AppropriateDungeon),
    }
}

/// Shared tail of both tunneller commands, starting at the location argument.
fn tunneller(
    args: &ArgList,
    first: usize,
    party: Option<u8>,
    cx: &mut CheckContext<'_>,
) -> Result<TunnellerValue, ScriptError> {
    args.single_player(0)?;
    let creature = cx
        .catalog
        .hero_digger()
        .ok_or_else(|| ScriptError::Invalid("the level defines no hero digger".to_string()))?;
    let location = location(args, first, cx)?;
    let heading = heading(args, first + 1, cx)?;
    let level = creature_level(args.number(first + 3)?, cx)?;
    let gold = cx.clamp("carried gold", args.number(first + 4)?, 0, i64::from(i32::MAX));
    Ok(TunnellerValue {
        party,
        creature,
        location,
        heading,
        level,
        gold,
    })
}

fn check_add_tunneller(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<TunnellerValue, ScriptError> {
    tunneller(args, 1, None, cx)
}

fn check_add_tunneller_party(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<TunnellerValue, ScriptError> {
    let name = args.text(1)?;
    let party = cx.parties.find(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "party",
        name: name.to_string(),
    })?;
    tunneller(args, 2, Some(party), cx)
}

/// Spawns the tunneller, then the members its party holds right now.
fn process_add_tunneller(value: &TunnellerValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    let owner = cx.player();
    let members = match value.party {
        Some(index) => match cx.parties.get(index) {
            Some(party) => party.members.clone(),
            None => return Err(ProcessError::Unresolved(format!("party #{index}"))),
        },
        None => Vec::new(),
    };
    let (x, y) = position_of(cx, value.location, owner)?;
    cx.apply(WorldOp::SpawnTunneller {
        owner,
        creature: value.creature,
        x,
        y,
        level: value.level,
        gold: value.gold,
        heading: value.heading,
    })?;
    for member in &members {
        cx.apply(WorldOp::SpawnCreature {
            owner,
            creature: member.creature,
            x,
            y,
            level: member.level,
            gold: member.gold,
            objective: Some(member.objective),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::codec::CreatureSel;
    use crate::location::MapLocation;
    use crate::value::Payload;

    #[test]
    fn add_to_party_validates_each_field() {
        let mut h = Harness::new();
        assert!(matches!(
            h.check("ADD_TO_PARTY(RAIDERS, KNIGHT, 3, 100, ATTACK_DUNGEON_HEART, 0)"),
            Err(ScriptError::UnknownName { kind: "party", .. })
        ));
        h.check("CREATE_PARTY(RAIDERS)").unwrap();
        let value = h
            .check("ADD_TO_PARTY(RAIDERS, KNIGHT, 3, 100, ATTACK_DUNGEON_HEART, 0)")
            .unwrap()
            .unwrap();
        let member = PartyMemberValue::view(&value).unwrap().member;
        assert_eq!((member.creature, member.level), (3, 3));
        assert_eq!(member.objective, HeroObjective::AttackDungeonHeart);
        assert!(matches!(
            h.check("ADD_TO_PARTY(RAIDERS, KNIGHT, 11, 100, ATTACK_DUNGEON_HEART, 0)"),
            Err(ScriptError::OutOfRange { .. })
        ));
        assert!(h.check("ADD_TO_PARTY(RAIDERS, KNIGHT, 2, 100, DANCE, 0)").is_err());
        assert!(h.check("ADD_TO_PARTY(RAIDERS, DRAGON, 2, 100, STEAL_GOLD, 0)").is_err());
    }

    #[test]
    fn spawned_creatures_keep_their_location() {
        let mut h = Harness::new();
        let value = h.check("ADD_CREATURE_TO_LEVEL(PLAYER_GOOD, WIZARD, -1, 2, 1, 0)").unwrap().unwrap();
        let spawn = SpawnCreatureValue::view(&value).unwrap();
        assert_eq!(spawn.location, MapLocation::HeroGate(1));
        assert!(matches!(
            h.check("ADD_CREATURE_TO_LEVEL(PLAYER_GOOD, WIZARD, -1, 2, 0, 0)"),
            Err(ScriptError::OutOfRange { what: "copies", .. })
        ));
        assert!(h.check("ADD_CREATURE_TO_LEVEL(ALL_PLAYERS, WIZARD, 1, 2, 1, 0)").is_err());
    }

    #[test]
    fn kill_creature_accepts_any_creature() {
        let mut h = Harness::new();
        let value = h.check("KILL_CREATURE(PLAYER0, ANY_CREATURE, MOST_EXPERIENCED, 2)").unwrap().unwrap();
        let select = SelectValue::view(&value).unwrap();
        assert_eq!(select.creature, CreatureSel::Any);
        assert_eq!(select.amount, 2);
        assert!(h.check("KILL_CREATURE(PLAYER0, IMP, BIGGEST, 2)").is_err());
    }

    #[test]
    fn level_up_count_is_bounded() {
        let mut h = Harness::new();
        let value = h.check("LEVEL_UP_CREATURE(PLAYER0, TROLL, MOST_EXPERIENCED, 20)").unwrap().unwrap();
        assert_eq!(SelectValue::view(&value).map(|s| s.amount), Some(9));
        assert_eq!(h.diagnostics.warnings().count(), 1);
        assert!(matches!(
            h.check("LEVEL_UP_CREATURE(PLAYER0, TROLL, MOST_EXPERIENCED, 0)"),
            Err(ScriptError::OutOfRange { what: "level count", .. })
        ));
    }

    #[test]
    fn new_owner_must_be_one_player() {
        let mut h = Harness::new();
        let value = h.check("CHANGE_CREATURE_OWNER(PLAYER_GOOD, KNIGHT, LEAST_EXPERIENCED, PLAYER0)").unwrap().unwrap();
        assert_eq!(OwnerChangeValue::view(&value), Some(&OwnerChangeValue {
            creature: CreatureSel::Kind(3),
            criteria: SelectCriteria::LeastExperienced,
            new_owner: PlayerId(0),
        }));
        assert!(h.check("CHANGE_CREATURE_OWNER(PLAYER_GOOD, KNIGHT, ANYWHERE, ALL_PLAYERS)").is_err());
    }

    #[test]
    fn tunnellers_check_their_heading() {
        let mut h = Harness::new();
        let value = h.check("ADD_TUNNELLER_TO_LEVEL(PLAYER_GOOD, -1, DUNGEON_HEART, 0, 3, 200)").unwrap().unwrap();
        let tunneller = TunnellerValue::view(&value).unwrap();
        assert_eq!(tunneller.creature, 5);
        assert_eq!(tunneller.heading, Heading::DungeonHeart(PlayerId(0)));
        assert_eq!(tunneller.party, None);
        assert!(h.diagnostics.is_empty());

        h.check("ADD_TUNNELLER_TO_LEVEL(PLAYER_GOOD, -1, DUNGEON_HEART, 3, 3, 200)").unwrap();
        assert_eq!(h.diagnostics.warnings().count(), 1);
        assert!(matches!(
            h.check("ADD_TUNNELLER_TO_LEVEL(PLAYER_GOOD, -1, ACTION_POINT, 7, 3, 200)"),
            Err(ScriptError::UnknownName { kind: "action point", .. })
        ));
        assert!(h.check("ADD_TUNNELLER_TO_LEVEL(PLAYER_GOOD, -1, DUNGEON, 4, 3, 200)").is_err());
        assert!(h.check("ADD_TUNNELLER_TO_LEVEL(PLAYER_GOOD, -1, NORTH, 0, 3, 200)").is_err());
    }

    #[test]
    fn tunneller_parties_need_a_known_party() {
        let mut h = Harness::new();
        let line = "ADD_TUNNELLER_PARTY_TO_LEVEL(PLAYER_GOOD, DIGGERS, -1, APPROPIATE_DUNGEON, 0, 2, 0)";
        assert!(h.check(line).is_err());
        h.check("CREATE_PARTY(DIGGERS)").unwrap();
        let value = h
            .check("ADD_TUNNELLER_PARTY_TO_LEVEL(PLAYER_GOOD, DIGGERS, 1, APPROPIATE_DUNGEON, 0, 2, 0)")
            .unwrap()
            .unwrap();
        let tunneller = TunnellerValue::view(&value).unwrap();
        assert_eq!(tunneller.party, Some(0));
        assert_eq!(tunneller.location, MapLocation::ActionPoint(1));
        assert_eq!(tunneller.heading, Heading::AppropriateDungeon);
    }
}
