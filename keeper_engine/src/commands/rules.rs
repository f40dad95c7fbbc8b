//! Game rules, trap, door and creature configuration, sacrifice recipes.

use keeper_data::{CreatureProperty, DoorProperty, GameRule, SacrificeAction, TrapProperty, parse_boolean};

use super::{creature_kind, kind_id};
use crate::codec::ArgList;
use crate::context::{CheckContext, ExecutionContext};
use crate::diagnostic::{ProcessError, ScriptError};
use crate::registry::CommandRegistry;
use crate::sim::WorldOp;
use crate::value::{
    CreatureConfigValue, DoorConfigValue, MAX_VICTIMS, RecipeRemoveValue, RecipeValue, RuleValue, SmallList,
    TrapConfigValue,
};

/// Upper bound of trap and door property values.
const CONFIG_VALUE_MAX: i64 = 0xFFFF;

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.value("SET_GAME_RULE", "AN", check_game_rule, process_game_rule);
    registry.value("SET_TRAP_CONFIGURATION", "AANn", check_trap_configuration, process_trap_configuration);
    registry.value("SET_DOOR_CONFIGURATION", "AANn", check_door_configuration, process_door_configuration);
    registry.value(
        "SET_CREATURE_CONFIGURATION",
        "CAAn",
        check_creature_configuration,
        process_creature_configuration,
    );
    registry.value("SET_SACRIFICE_RECIPE", "AAA+", check_sacrifice_recipe, process_sacrifice_recipe);
    registry.value("REMOVE_SACRIFICE_RECIPE", "A+", check_remove_recipe, process_remove_recipe);
}

fn check_game_rule(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<RuleValue, ScriptError> {
    let name = args.text(0)?;
    let rule = GameRule::from_name(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "game rule",
        name: name.to_string(),
    })?;
    let max_health = cx.config.heart_max_health;
    let value = match rule {
        GameRule::PreserveClassicBugs => args.number(1)?,
        GameRule::DungeonHeartHealth => cx.clamp("heart health", args.number(1)?, 1, max_health),
        _ => cx.clamp(rule.name(), args.number(1)?, 0, i64::from(i32::MAX)),
    };
    Ok(RuleValue { rule, value })
}

fn process_game_rule(value: &RuleValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.apply(WorldOp::SetGameRule {
        rule: value.rule,
        value: value.value,
    })
}

fn check_trap_configuration(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<TrapConfigValue, ScriptError> {
    let trap = kind_id(&cx.catalog.traps, "trap", args.text(0)?)?;
    let name = args.text(1)?;
    let property = TrapProperty::from_name(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "trap property",
        name: name.to_string(),
    })?;
    let value = cx.clamp(property.name(), args.number(2)?, 0, CONFIG_VALUE_MAX);
    Ok(TrapConfigValue {
        trap,
        property,
        value,
        extra: args.number(3)?,
    })
}

fn process_trap_configuration(value: &TrapConfigValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.apply(WorldOp::SetTrapConfig {
        trap: value.trap,
        property: value.property,
        value: value.value,
        extra: value.extra,
    })
}

fn check_door_configuration(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<DoorConfigValue, ScriptError> {
    let door = kind_id(&cx.catalog.doors, "door", args.text(0)?)?;
    let name = args.text(1)?;
    let property = DoorProperty::from_name(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "door property",
        name: name.to_string(),
    })?;
    let value = cx.clamp(property.name(), args.number(2)?, 0, CONFIG_VALUE_MAX);
    Ok(DoorConfigValue {
        door,
        property,
        value,
        extra: args.number(3)?,
    })
}

fn process_door_configuration(value: &DoorConfigValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.apply(WorldOp::SetDoorConfig {
        door: value.door,
        property: value.property,
        value: value.value,
        extra: value.extra,
    })
}

/// Creature property values are numbers, or words for the few named settings.
fn property_value(property: CreatureProperty, text: &str) -> Option<i64> {
    if let Ok(number) = text.parse() {
        return Some(number);
    }
    match property {
        CreatureProperty::AttackPreference => match text.to_ascii_uppercase().as_str() {
            "MELEE" => Some(1),
            "RANGED" => Some(2),
            _ => None,
        },
        _ => parse_boolean(text).map(i64::from),
    }
}

fn check_creature_configuration(
    args: &ArgList,
    _: &mut CheckContext<'_>,
) -> Result<CreatureConfigValue, ScriptError> {
    let creature = creature_kind(args, 0)?;
    let name = args.text(1)?;
    let property = CreatureProperty::from_name(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "creature property",
        name: name.to_string(),
    })?;
    let text = args.text(2)?;
    let value = property_value(property, text).ok_or_else(|| ScriptError::InvalidArgument {
        index: 3,
        kind: "property value",
        value: text.to_string(),
    })?;
    Ok(CreatureConfigValue {
        creature,
        property,
        value,
        extra: args.number(3)?,
    })
}

fn process_creature_configuration(
    value: &CreatureConfigValue,
    cx: &mut ExecutionContext<'_>,
) -> Result<(), ProcessError> {
    cx.apply(WorldOp::SetCreatureConfig {
        creature: value.creature,
        property: value.property,
        value: value.value,
        extra: value.extra,
    })
}

fn victims(args: &ArgList, start: usize, cx: &CheckContext<'_>) -> Result<SmallList<u16, MAX_VICTIMS>, ScriptError> {
    let mut list = SmallList::default();
    for name in args.texts_from(start) {
        list.push(kind_id(&cx.catalog.creatures, "creature", name)?)?;
    }
    Ok(list)
}

fn check_sacrifice_recipe(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<RecipeValue, ScriptError> {
    let name = args.text(0)?;
    let action = SacrificeAction::from_name(name).ok_or_else(|| ScriptError::UnknownName {
        kind: "sacrifice action",
        name: name.to_string(),
    })?;
    let reward_text = args.text(1)?;
    let reward = match action {
        SacrificeAction::MakeCreature | SacrificeAction::MakeGoodHero => {
            i64::from(kind_id(&cx.catalog.creatures, "creature", reward_text)?)
        },
        _ => reward_text.parse().map_err(|_| ScriptError::InvalidArgument {
            index: 2,
            kind: "reward",
            value: reward_text.to_string(),
        })?,
    };
    Ok(RecipeValue {
        action,
        reward,
        victims: victims(args, 2, cx)?,
    })
}

fn process_sacrifice_recipe(value: &RecipeValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.apply(WorldOp::SetSacrificeRecipe {
        action: value.action,
        reward: value.reward,
        victims: value.victims.as_slice().to_vec(),
    })
}

fn check_remove_recipe(args: &ArgList, cx: &mut CheckContext<'_>) -> Result<RecipeRemoveValue, ScriptError> {
    Ok(RecipeRemoveValue {
        victims: victims(args, 0, cx)?,
    })
}

fn process_remove_recipe(value: &RecipeRemoveValue, cx: &mut ExecutionContext<'_>) -> Result<(), ProcessError> {
    cx.apply(WorldOp::RemoveSacrificeRecipe {
        victims: value.victims.as_slice().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::value::Payload;

    #[test]
    fn trap_values_are_clamped() {
        let mut h = Harness::new();
        let value = h.check("SET_TRAP_CONFIGURATION(BOULDER, Shots, 70000)").unwrap().unwrap();
        let config = TrapConfigValue::view(&value).unwrap();
        assert_eq!((config.trap, config.property, config.value), (1, TrapProperty::Shots, 0xFFFF));
        assert_eq!(h.diagnostics.warnings().count(), 1);
        assert!(h.check("SET_TRAP_CONFIGURATION(BOULDER, Colour, 1)").is_err());
    }

    #[test]
    fn door_configuration_names_door_and_property() {
        let mut h = Harness::new();
        let value = h.check("SET_DOOR_CONFIGURATION(BRACED, Health, 950)").unwrap().unwrap();
        assert_eq!(DoorConfigValue::view(&value), Some(&DoorConfigValue {
            door: 2,
            property: DoorProperty::Health,
            value: 950,
            extra: 0,
        }));
        h.check("SET_DOOR_CONFIGURATION(WOOD, SellingValue, -5)").unwrap();
        assert_eq!(h.diagnostics.warnings().count(), 1);
        assert!(matches!(
            h.check("SET_DOOR_CONFIGURATION(WOOD, Shots, 1)"),
            Err(ScriptError::UnknownName { kind: "door property", .. })
        ));
        assert!(h.check("SET_DOOR_CONFIGURATION(PORTCULLIS, Health, 1)").is_err());
    }

    #[test]
    fn creature_properties_take_words() {
        let mut h = Harness::new();
        let value = h.check("SET_CREATURE_CONFIGURATION(TROLL, AttackPreference, RANGED)").unwrap().unwrap();
        assert_eq!(CreatureConfigValue::view(&value).map(|c| c.value), Some(2));
        let value = h.check("SET_CREATURE_CONFIGURATION(TROLL, HurtByLava, 40)").unwrap().unwrap();
        assert_eq!(CreatureConfigValue::view(&value).map(|c| c.value), Some(40));
    }

    #[test]
    fn recipes_list_their_victims() {
        let mut h = Harness::new();
        let value = h.check("SET_SACRIFICE_RECIPE(MKCREATURE, WIZARD, TROLL, IMP)").unwrap().unwrap();
        let recipe = RecipeValue::view(&value).unwrap();
        assert_eq!(recipe.reward, 4);
        assert_eq!(recipe.victims.as_slice(), &[2, 1]);
        assert!(h.check("SET_SACRIFICE_RECIPE(MKCREATURE, WIZARD, TROLL, IMP, IMP, IMP, IMP, IMP, IMP)").is_err());
        let value = h.check("REMOVE_SACRIFICE_RECIPE(TROLL, IMP)").unwrap().unwrap();
        assert_eq!(RecipeRemoveValue::view(&value).map(|r| r.victims.len()), Some(2));
    }

    #[test]
    fn game_rules_are_named() {
        let mut h = Harness::new();
        let value = h.check("SET_GAME_RULE(GemEffectiveness, 17)").unwrap().unwrap();
        assert_eq!(RuleValue::view(&value), Some(&RuleValue {
            rule: GameRule::GemEffectiveness,
            value: 17,
        }));
        assert!(h.check("SET_GAME_RULE(Gravity, 1)").is_err());
    }
}
