use keeper_data::{Comparison, CreatureDef, KindDef, LevelDef, PlayerDef, PlayerId, PlayerRange, SymbolCatalog};
use keeper_engine::codec::{ArgList, CreatureSel, Signature, encode};
use keeper_engine::condition::ConditionTable;
use keeper_engine::context::{CheckContext, LoadState};
use keeper_engine::diagnostic::{Diagnostics, ScriptError};
use keeper_engine::party::PartyTable;
use keeper_engine::strings::StringArena;
use keeper_engine::{EngineConfig, KeeperWorld};
use keeper_script::parse_line;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn test_level() -> LevelDef {
    LevelDef {
        name: "codec".into(),
        creatures: vec![
            CreatureDef {
                name: "IMP".into(),
                evil: true,
                digger: true,
                spectator: false,
            },
            CreatureDef {
                name: "TROLL".into(),
                evil: true,
                digger: false,
                spectator: false,
            },
        ],
        rooms: vec![KindDef { name: "TREASURE".into() }, KindDef { name: "LAIR".into() }],
        slabs: vec![KindDef { name: "ROCK".into() }, KindDef { name: "GOLD".into() }],
        players: vec![PlayerDef {
            player: 0,
            heart: Some((10, 10)),
            money: 0,
            campaign_flags: vec![0, 12],
        }],
        ..LevelDef::default()
    }
}

/// Encode the arguments of `line` against `signature`.
fn encode_line(signature: &'static str, line: &str, diagnostics: &mut Diagnostics) -> Result<ArgList, ScriptError> {
    let level = test_level();
    let config = EngineConfig::default();
    let catalog = SymbolCatalog::from_level(&level);
    let world = KeeperWorld::from_level(&level);
    let mut conditions = ConditionTable::new(config.max_conditions);
    let mut parties = PartyTable::new(config.max_parties, config.max_party_members);
    let mut strings = StringArena::new(config.string_pool_bytes);
    let mut rng = StdRng::seed_from_u64(7);
    let mut load = LoadState::default();
    let parsed = parse_line(line, 1).unwrap().unwrap();
    let mut cx = CheckContext {
        line: 1,
        command: "TEST",
        allow_ranges: false,
        config: &config,
        catalog: &catalog,
        sim: &world,
        conditions: &mut conditions,
        parties: &mut parties,
        strings: &mut strings,
        rng: &mut rng,
        load: &mut load,
        diagnostics,
    };
    encode(&Signature::parse(signature).unwrap(), &parsed.args, &mut cx)
}

#[test]
fn every_kind_decodes_to_what_was_written() {
    let mut diagnostics = Diagnostics::default();
    let args = encode_line("PCRSLOBA", "TEST(PLAYER0, TROLL, LAIR, GOLD, PLAYER0, >=, ON, STEAL_GOLD)", &mut diagnostics)
        .unwrap();
    assert_eq!(args.player(0), Ok(PlayerRange::single(PlayerId(0))));
    assert_eq!(args.creature(1), Ok(CreatureSel::Kind(2)));
    assert_eq!(args.room(2), Ok(2));
    assert_eq!(args.slab(3), Ok(2));
    assert_eq!(args.text(4), Ok("PLAYER0"));
    assert_eq!(args.operator(5), Ok(Comparison::GreaterOrEqual));
    assert_eq!(args.boolean(6), Ok(1));
    assert_eq!(args.text(7), Ok("STEAL_GOLD"));

    let args = encode_line("NNA", "TEST(-12, 0x1F, \"quoted text\")", &mut diagnostics).unwrap();
    assert_eq!(args.number(0), Ok(-12));
    assert_eq!(args.number(1), Ok(31));
    assert_eq!(args.text(2), Ok("quoted text"));
    assert!(diagnostics.is_empty());
}

#[test]
fn signatures_stop_at_eight_parameters() {
    let mut diagnostics = Diagnostics::default();
    assert!(Signature::parse("NNNNNNNN").is_ok());
    assert!(Signature::parse("PCRSLOBAN").is_err());
    let args = encode_line("NN", "TEST(1, 2, 3)", &mut diagnostics).unwrap();
    assert_eq!(args.number(1), Ok(2));
    assert_eq!(diagnostics.warnings().count(), 1);
}

#[test]
fn numeric_ids_stand_in_for_names() {
    let mut diagnostics = Diagnostics::default();
    let args = encode_line("CRS", "TEST(1, 2, 1)", &mut diagnostics).unwrap();
    assert_eq!(args.creature(0), Ok(CreatureSel::Kind(1)));
    assert_eq!(args.room(1), Ok(2));
    assert_eq!(args.slab(2), Ok(1));
}

#[test]
fn optional_arguments_take_their_defaults() {
    let mut diagnostics = Diagnostics::default();
    let args = encode_line("Npcob", "TEST(3)", &mut diagnostics).unwrap();
    assert_eq!(args.number(0), Ok(3));
    assert_eq!(args.player(1), Ok(PlayerRange::all()));
    assert_eq!(args.creature(2), Ok(CreatureSel::Any));
    assert_eq!(args.operator(3), Ok(Comparison::Equal));
    assert_eq!(args.boolean(4), Ok(0));
    assert!(args.is_supplied(0));
    assert!(!args.is_supplied(1));
}

#[test]
fn subfunctions_resolve_before_the_kind() {
    let mut diagnostics = Diagnostics::default();
    let args = encode_line("NC", "TEST(IMPORT(PLAYER0, CAMPAIGN_FLAG1), DRAWFROM(IMP, TROLL))", &mut diagnostics).unwrap();
    assert_eq!(args.number(0), Ok(12));
    assert!(matches!(args.creature(1), Ok(CreatureSel::Kind(1 | 2))));

    let err = encode_line("N", "TEST(RANDOM(1, 5))", &mut diagnostics).unwrap_err();
    assert_eq!(err, ScriptError::Unsupported("RANDOM"));
}

#[test]
fn bad_tokens_are_refused() {
    let mut diagnostics = Diagnostics::default();
    assert!(encode_line("C", "TEST(DRAGON)", &mut diagnostics).is_err());
    assert!(encode_line("P", "TEST(PLAYER9)", &mut diagnostics).is_err());
    assert!(encode_line("NN", "TEST(1)", &mut diagnostics).is_err());
    assert!(encode_line("A", "TEST(DRAWFROM(1~4))", &mut diagnostics).is_err());
}
