use std::collections::HashSet;
use std::fmt;

use crate::defs::{LevelDef, MapDef, PointDef};
use crate::symbols::{CAMPAIGN_FLAGS_COUNT, PLAYER_SLOTS};

/// Validation error for malformed or inconsistent data in a `LevelDef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateName { kind: &'static str, name: String },
    DuplicatePoint { kind: &'static str, id: u16 },
    OutOfBounds { kind: &'static str, id: String, x: u16, y: u16 },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateName { kind, name } => {
                write!(f, "duplicate {kind} name '{name}'")
            },
            ValidationError::DuplicatePoint { kind, id } => {
                write!(f, "duplicate {kind} number {id}")
            },
            ValidationError::OutOfBounds { kind, id, x, y } => {
                write!(f, "{kind} {id} at ({x}, {y}) lies outside the map")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate names, map points and player slots in a `LevelDef`.
///
/// ```
/// use keeper_data::{KindDef, LevelDef, validate_level};
///
/// let level = LevelDef {
///     name: "Demo".into(),
///     rooms: vec![KindDef { name: "TREASURE".into() }, KindDef { name: "LAIR".into() }],
///     ..LevelDef::default()
/// };
/// assert!(validate_level(&level).is_empty());
/// ```
pub fn validate_level(level: &LevelDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if level.name.trim().is_empty() {
        errors.push(ValidationError::InvalidValue {
            context: "level name missing".to_string(),
        });
    }
    if level.map.width == 0 || level.map.height == 0 {
        errors.push(ValidationError::InvalidValue {
            context: format!("map size {}x{}", level.map.width, level.map.height),
        });
    }

    track_names("creature", level.creatures.iter().map(|c| c.name.as_str()), &mut errors);
    track_names("room", level.rooms.iter().map(|r| r.name.as_str()), &mut errors);
    track_names("door", level.doors.iter().map(|d| d.name.as_str()), &mut errors);
    track_names("trap", level.traps.iter().map(|t| t.name.as_str()), &mut errors);
    track_names("slab", level.slabs.iter().map(|s| s.name.as_str()), &mut errors);
    track_names("effect", level.effects.iter().map(|e| e.name.as_str()), &mut errors);
    track_names("power", level.powers.iter().map(|p| p.name.as_str()), &mut errors);

    check_points("action point", &level.action_points, &level.map, &mut errors);
    check_points("hero gate", &level.hero_gates, &level.map, &mut errors);

    let mut seen_players = HashSet::new();
    for player in &level.players {
        if usize::from(player.player) >= PLAYER_SLOTS {
            errors.push(ValidationError::InvalidValue {
                context: format!("player slot {} out of range", player.player),
            });
            continue;
        }
        if !seen_players.insert(player.player) {
            errors.push(ValidationError::InvalidValue {
                context: format!("player slot {} defined twice", player.player),
            });
        }
        if let Some((x, y)) = player.heart
            && !level.map.contains_subtile(i64::from(x), i64::from(y))
        {
            errors.push(ValidationError::OutOfBounds {
                kind: "heart",
                id: format!("of player {}", player.player),
                x,
                y,
            });
        }
        if player.campaign_flags.len() > CAMPAIGN_FLAGS_COUNT {
            errors.push(ValidationError::InvalidValue {
                context: format!(
                    "player {} has {} campaign flags (max {CAMPAIGN_FLAGS_COUNT})",
                    player.player,
                    player.campaign_flags.len()
                ),
            });
        }
    }

    errors
}

fn track_names<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("empty {kind} name"),
            });
            continue;
        }
        if !seen.insert(name.to_ascii_uppercase()) {
            errors.push(ValidationError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
}

fn check_points(kind: &'static str, points: &[PointDef], map: &MapDef, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for point in points {
        if point.id == 0 {
            errors.push(ValidationError::InvalidValue {
                context: format!("{kind} numbered 0"),
            });
        }
        if !seen.insert(point.id) {
            errors.push(ValidationError::DuplicatePoint { kind, id: point.id });
        }
        if !map.contains_subtile(i64::from(point.x), i64::from(point.y)) {
            errors.push(ValidationError::OutOfBounds {
                kind,
                id: point.id.to_string(),
                x: point.x,
                y: point.y,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{KindDef, PlayerDef};

    fn minimal_level() -> LevelDef {
        LevelDef {
            name: "Test".into(),
            ..LevelDef::default()
        }
    }

    #[test]
    fn minimal_level_is_valid() {
        assert!(validate_level(&minimal_level()).is_empty());
    }

    #[test]
    fn duplicate_names_are_case_insensitive() {
        let mut level = minimal_level();
        level.traps = vec![KindDef { name: "BOULDER".into() }, KindDef { name: "boulder".into() }];
        let errors = validate_level(&level);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateName {
                kind: "trap",
                name: "boulder".into()
            }]
        );
    }

    #[test]
    fn power_names_are_tracked_too() {
        let mut level = minimal_level();
        level.powers = vec![KindDef { name: "POWER_SIGHT".into() }, KindDef { name: " ".into() }];
        assert_eq!(validate_level(&level), vec![ValidationError::InvalidValue {
            context: "empty power name".into()
        }]);
    }

    #[test]
    fn points_must_be_unique_and_on_map() {
        let mut level = minimal_level();
        level.action_points = vec![
            PointDef { id: 1, x: 10, y: 10 },
            PointDef { id: 1, x: 12, y: 12 },
            PointDef { id: 2, x: 900, y: 4 },
        ];
        let errors = validate_level(&level);
        assert!(errors.contains(&ValidationError::DuplicatePoint {
            kind: "action point",
            id: 1
        }));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::OutOfBounds { x: 900, .. })));
    }

    #[test]
    fn player_slots_are_checked() {
        let mut level = minimal_level();
        level.players = vec![
            PlayerDef {
                player: 0,
                heart: Some((40, 40)),
                ..PlayerDef::default()
            },
            PlayerDef {
                player: 0,
                ..PlayerDef::default()
            },
            PlayerDef {
                player: 9,
                ..PlayerDef::default()
            },
        ];
        let errors = validate_level(&level);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("defined twice"));
        assert!(errors[1].to_string().contains("out of range"));
    }
}
