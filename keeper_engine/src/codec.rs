//! Argument codec.
//!
//! A command's signature is a short string with one character per argument
//! kind, e.g. `"PC!AN"`. Upper case marks a required argument, lower case an
//! optional one; `!` after a kind marks it extended and `+` makes it repeat
//! over the remaining slots. [`encode`] checks the raw tokens of a line
//! against the signature and resolves them to typed [`Arg`]s, expanding the
//! `DRAWFROM` and `IMPORT` subfunctions on the way.

use keeper_data::{
    CAMPAIGN_FLAGS_COUNT, Comparison, FlagStore, PLAYER_SLOTS, PlayerId, PlayerRange, indexed_name, parse_boolean,
};
use keeper_script::{ArgToken, DrawItem, Scalar, SubCall, SubFunction};
use log::debug;
use rand::Rng;
use variantly::Variantly;

use crate::context::CheckContext;
use crate::diagnostic::ScriptError;

/// Most arguments a command line may carry.
pub const MAX_ARGS: usize = keeper_script::MAX_ARGS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Number,
    Player,
    Creature,
    Room,
    Slab,
    Location,
    Operator,
    Boolean,
    Atom,
    Property,
}

impl ArgKind {
    fn from_char(c: char) -> Option<Self> {
        Some(match c.to_ascii_uppercase() {
            'N' => ArgKind::Number,
            'P' => ArgKind::Player,
            'C' => ArgKind::Creature,
            'R' => ArgKind::Room,
            'S' => ArgKind::Slab,
            'L' => ArgKind::Location,
            'O' => ArgKind::Operator,
            'B' => ArgKind::Boolean,
            'A' => ArgKind::Atom,
            'X' => ArgKind::Property,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ArgKind::Number => "number",
            ArgKind::Player => "player",
            ArgKind::Creature => "creature",
            ArgKind::Room => "room",
            ArgKind::Slab => "slab",
            ArgKind::Location => "location",
            ArgKind::Operator => "operator",
            ArgKind::Boolean => "boolean",
            ArgKind::Atom => "text",
            ArgKind::Property => "property",
        }
    }

    fn is_text(self) -> bool {
        matches!(self, ArgKind::Location | ArgKind::Atom | ArgKind::Property)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub kind: ArgKind,
    pub optional: bool,
    pub extended: bool,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("unknown argument kind '{0}'")]
    UnknownKind(char),
    #[error("modifier '{0}' without an argument kind")]
    DanglingModifier(char),
    #[error("only the last argument may repeat")]
    VariadicNotLast,
    #[error("{0} arguments exceed the limit of {MAX_ARGS}")]
    TooLong(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    text: &'static str,
    specs: Vec<ArgSpec>,
}

impl Signature {
    /// Parse a signature string; spaces are ignored.
    ///
    /// # Errors
    /// Unknown kind letters, misplaced `!`/`+`, more than [`MAX_ARGS`] kinds.
    pub fn parse(text: &'static str) -> Result<Self, SignatureError> {
        let mut specs: Vec<ArgSpec> = Vec::new();
        for c in text.chars() {
            match c {
                ' ' => {},
                '!' | '+' => {
                    let last = specs.last_mut().ok_or(SignatureError::DanglingModifier(c))?;
                    if c == '!' {
                        last.extended = true;
                    } else {
                        last.variadic = true;
                    }
                },
                _ => {
                    if specs.last().is_some_and(|s| s.variadic) {
                        return Err(SignatureError::VariadicNotLast);
                    }
                    let kind = ArgKind::from_char(c).ok_or(SignatureError::UnknownKind(c))?;
                    specs.push(ArgSpec {
                        kind,
                        optional: c.is_ascii_lowercase(),
                        extended: false,
                        variadic: false,
                    });
                },
            }
        }
        if specs.len() > MAX_ARGS {
            return Err(SignatureError::TooLong(specs.len()));
        }
        Ok(Self { text, specs })
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn is_variadic(&self) -> bool {
        self.specs.last().is_some_and(|s| s.variadic)
    }

    /// Most arguments a line may give.
    pub fn max_args(&self) -> usize {
        if self.is_variadic() { MAX_ARGS } else { self.specs.len() }
    }

    /// [`ArgSpec`] governing argument slot `index`; the repeating one covers every slot past the end.
    pub fn spec_at(&self, index: usize) -> Option<ArgSpec> {
        match self.specs.get(index) {
            Some(spec) => Some(*spec),
            None if index < self.max_args() => self.specs.last().copied(),
            None => None,
        }
    }
}

/// Creature argument: a kind, or any creature for extended parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Variantly)]
pub enum CreatureSel {
    Any,
    Kind(u16),
}

impl CreatureSel {
    pub fn id(self) -> Option<u16> {
        match self {
            CreatureSel::Any => None,
            CreatureSel::Kind(id) => Some(id),
        }
    }
}

/// A resolved argument.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum Arg {
    Number(i64),
    Player(PlayerRange),
    Creature(CreatureSel),
    Room(u16),
    Slab(u16),
    /// Location, atom and property words, kept as written.
    Text(String),
    Operator(Comparison),
    Boolean(i64),
}

impl Arg {
    fn default_for(kind: ArgKind) -> Self {
        match kind {
            ArgKind::Number => Arg::Number(0),
            ArgKind::Player => Arg::Player(PlayerRange::all()),
            ArgKind::Creature => Arg::Creature(CreatureSel::Any),
            ArgKind::Room => Arg::Room(0),
            ArgKind::Slab => Arg::Slab(0),
            ArgKind::Location | ArgKind::Atom | ArgKind::Property => Arg::Text(String::new()),
            ArgKind::Operator => Arg::Operator(Comparison::Equal),
            ArgKind::Boolean => Arg::Boolean(0),
        }
    }
}

/// Encoded arguments of one line, defaults filled in for absent optionals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    args: Vec<Arg>,
    supplied: usize,
}

impl ArgList {
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Whether the script wrote argument `index` (0-based) rather than taking its default.
    pub fn is_supplied(&self, index: usize) -> bool {
        index < self.supplied
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    fn shape(index: usize, kind: &'static str) -> ScriptError {
        ScriptError::Invalid(format!("parameter {} is not a {kind}", index + 1))
    }

    /// # Errors
    /// The slot does not hold a number.
    pub fn number(&self, index: usize) -> Result<i64, ScriptError> {
        match self.args.get(index) {
            Some(Arg::Number(n)) => Ok(*n),
            _ => Err(Self::shape(index, "number")),
        }
    }

    /// # Errors
    /// The slot does not hold a player.
    pub fn player(&self, index: usize) -> Result<PlayerRange, ScriptError> {
        match self.args.get(index) {
            Some(Arg::Player(range)) => Ok(*range),
            _ => Err(Self::shape(index, "player")),
        }
    }

    /// A player argument that must name exactly one player.
    ///
    /// # Errors
    /// Collective ranges such as `ALL_PLAYERS`.
    pub fn single_player(&self, index: usize) -> Result<PlayerId, ScriptError> {
        let range = self.player(index)?;
        range.single_player().ok_or_else(|| ScriptError::InvalidArgument {
            index: index + 1,
            kind: "single player",
            value: range.to_string(),
        })
    }

    /// # Errors
    /// The slot does not hold a creature.
    pub fn creature(&self, index: usize) -> Result<CreatureSel, ScriptError> {
        match self.args.get(index) {
            Some(Arg::Creature(sel)) => Ok(*sel),
            _ => Err(Self::shape(index, "creature")),
        }
    }

    /// # Errors
    /// The slot does not hold a room.
    pub fn room(&self, index: usize) -> Result<u16, ScriptError> {
        match self.args.get(index) {
            Some(Arg::Room(id)) => Ok(*id),
            _ => Err(Self::shape(index, "room")),
        }
    }

    /// # Errors
    /// The slot does not hold a slab.
    pub fn slab(&self, index: usize) -> Result<u16, ScriptError> {
        match self.args.get(index) {
            Some(Arg::Slab(id)) => Ok(*id),
            _ => Err(Self::shape(index, "slab")),
        }
    }

    /// # Errors
    /// The slot does not hold text.
    pub fn text(&self, index: usize) -> Result<&str, ScriptError> {
        match self.args.get(index) {
            Some(Arg::Text(text)) => Ok(text),
            _ => Err(Self::shape(index, "text")),
        }
    }

    /// # Errors
    /// The slot does not hold an operator.
    pub fn operator(&self, index: usize) -> Result<Comparison, ScriptError> {
        match self.args.get(index) {
            Some(Arg::Operator(op)) => Ok(*op),
            _ => Err(Self::shape(index, "operator")),
        }
    }

    /// # Errors
    /// The slot does not hold a boolean.
    pub fn boolean(&self, index: usize) -> Result<i64, ScriptError> {
        match self.args.get(index) {
            Some(Arg::Boolean(b)) => Ok(*b),
            _ => Err(Self::shape(index, "boolean")),
        }
    }

    /// First player argument; it decides whom a deferred command targets.
    pub fn first_player(&self) -> Option<PlayerRange> {
        self.args.iter().find_map(|arg| match arg {
            Arg::Player(range) => Some(*range),
            _ => None,
        })
    }

    /// Supplied text arguments from `start` on (repeating parameters).
    pub fn texts_from(&self, start: usize) -> Vec<&str> {
        self.args
            .iter()
            .take(self.supplied)
            .skip(start)
            .filter_map(|arg| match arg {
                Arg::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Check raw tokens against a signature and resolve them.
///
/// # Errors
/// The first argument that is missing or fails to resolve refuses the whole line.
pub fn encode(signature: &Signature, tokens: &[ArgToken], cx: &mut CheckContext<'_>) -> Result<ArgList, ScriptError> {
    let limit = signature.max_args();
    if tokens.len() > limit {
        if signature.is_variadic() {
            return Err(ScriptError::Invalid(format!(
                "too many parameters ({}, max {limit})",
                tokens.len()
            )));
        }
        for index in limit..tokens.len() {
            cx.warn(format!("excessive parameter {} ignored", index + 1));
        }
    }

    let mut list = ArgList::default();
    for index in 0..limit {
        let Some(spec) = signature.spec_at(index) else {
            break;
        };
        let Some(token) = tokens.get(index) else {
            if index >= signature.len() {
                break;
            }
            if !spec.optional {
                return Err(ScriptError::MissingArgument {
                    index: index + 1,
                    kind: spec.kind.name(),
                });
            }
            list.args.push(Arg::default_for(spec.kind));
            continue;
        };
        let token = expand_subfunction(token, spec, cx)?;
        list.args.push(resolve(&token, spec, index + 1, cx)?);
        list.supplied = index + 1;
    }
    Ok(list)
}

fn expand_subfunction(token: &ArgToken, spec: ArgSpec, cx: &mut CheckContext<'_>) -> Result<ArgToken, ScriptError> {
    let ArgToken::Call(call) = token else {
        return Ok(token.clone());
    };
    match call.function {
        SubFunction::Random => Err(ScriptError::Unsupported("RANDOM")),
        SubFunction::Import => Ok(ArgToken::Number(import_value(call, cx))),
        SubFunction::DrawFrom => draw_from(call, spec, cx),
    }
}

enum Candidate {
    Single(ArgToken),
    Span(i64, i64),
}

impl Candidate {
    /// Number of values covered; `None` when a span holds more than `u64` can count.
    fn size(&self) -> Option<u64> {
        match self {
            Candidate::Single(_) => Some(1),
            Candidate::Span(lo, hi) => hi.abs_diff(*lo).checked_add(1),
        }
    }
}

fn draw_from(call: &SubCall, spec: ArgSpec, cx: &mut CheckContext<'_>) -> Result<ArgToken, ScriptError> {
    let mut candidates = Vec::with_capacity(call.items.len());
    for item in &call.items {
        match item {
            DrawItem::Value(value) => candidates.push(Candidate::Single(value.clone().into_token())),
            DrawItem::Range(lo, hi) => {
                if spec.kind.is_text() && !cx.allow_ranges {
                    return Err(ScriptError::Invalid(format!(
                        "DRAWFROM ranges are not allowed for {} parameters",
                        spec.kind.name()
                    )));
                }
                let lo = range_bound(lo, spec.kind, cx)?;
                let mut hi = range_bound(hi, spec.kind, cx)?;
                if hi < lo {
                    cx.warn(format!("DRAWFROM range {lo}~{hi} is reversed, using {lo}"));
                    hi = lo;
                }
                candidates.push(Candidate::Span(lo, hi));
            },
        }
    }

    let too_large = || ScriptError::Invalid("DRAWFROM range too large".to_string());
    let mut total: u64 = 0;
    for candidate in &candidates {
        total = candidate
            .size()
            .and_then(|size| total.checked_add(size))
            .ok_or_else(too_large)?;
    }
    if total == 0 {
        return Err(ScriptError::Invalid("DRAWFROM has nothing to draw from".to_string()));
    }
    let mut pick = cx.rng.random_range(0..total);
    for candidate in candidates {
        let size = candidate.size().ok_or_else(too_large)?;
        if pick < size {
            let token = match candidate {
                Candidate::Single(token) => token,
                Candidate::Span(lo, _) => ArgToken::Number(lo.saturating_add_unsigned(pick)),
            };
            debug!("DRAWFROM picked {token}");
            return Ok(token);
        }
        pick -= size;
    }
    Err(ScriptError::Invalid("DRAWFROM selection failed".to_string()))
}

/// Numeric value of a range end; named kinds use their catalog ids.
fn range_bound(bound: &Scalar, kind: ArgKind, cx: &CheckContext<'_>) -> Result<i64, ScriptError> {
    let id = match (bound, kind) {
        (Scalar::Number(n), _) => return Ok(*n),
        (Scalar::Word(word), ArgKind::Creature) => cx.catalog.creatures.id(word),
        (Scalar::Word(word), ArgKind::Room) => cx.catalog.rooms.id(word),
        (Scalar::Word(word), ArgKind::Slab) => cx.catalog.slabs.id(word),
        _ => None,
    };
    id.map(i64::from).ok_or_else(|| ScriptError::Invalid(format!("invalid DRAWFROM range bound '{bound}'")))
}

/// Value of `IMPORT(player, CAMPAIGN_FLAGn)`; unknown players or flags give 0.
fn import_value(call: &SubCall, cx: &mut CheckContext<'_>) -> i64 {
    let value = match call.items.as_slice() {
        [DrawItem::Value(Scalar::Word(player)), DrawItem::Value(Scalar::Word(flag))] => {
            let player = PlayerRange::from_name(player)
                .and_then(PlayerRange::single_player)
                .filter(|p| p.is_keeper());
            let flag = indexed_name("CAMPAIGN_FLAG", flag, CAMPAIGN_FLAGS_COUNT);
            match (player, flag) {
                (Some(player), Some(flag)) => Some(cx.sim.variable(player, FlagStore::CampaignFlag, flag)),
                _ => None,
            }
        },
        _ => None,
    };
    value.unwrap_or_else(|| {
        cx.error(format!("invalid {call}, using 0"));
        0
    })
}

/// Leading integer of a word like `10X`.
fn numeric_prefix(word: &str) -> Option<i64> {
    let end = word
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map_or(word.len(), |(i, _)| i);
    word[..end].parse().ok()
}

fn resolve(token: &ArgToken, spec: ArgSpec, index: usize, cx: &mut CheckContext<'_>) -> Result<Arg, ScriptError> {
    let invalid = || ScriptError::InvalidArgument {
        index,
        kind: spec.kind.name(),
        value: token.to_string(),
    };
    match spec.kind {
        ArgKind::Number => match token {
            ArgToken::Number(n) => Ok(Arg::Number(*n)),
            ArgToken::Word(word) => {
                let n = numeric_prefix(word).ok_or_else(invalid)?;
                cx.warn(format!("parameter {index} '{word}' is not a number, using {n}"));
                Ok(Arg::Number(n))
            },
            _ => Err(invalid()),
        },
        ArgKind::Player => {
            let range = match token {
                ArgToken::Word(word) => PlayerRange::from_name(word),
                ArgToken::Number(n) => usize::try_from(*n)
                    .ok()
                    .filter(|&n| n < PLAYER_SLOTS)
                    .and_then(|n| u8::try_from(n).ok())
                    .map(|n| PlayerRange::single(PlayerId(n))),
                _ => None,
            };
            range.map(Arg::Player).ok_or_else(|| ScriptError::UnknownName {
                kind: "player",
                name: token.to_string(),
            })
        },
        ArgKind::Creature => {
            let sel = match token {
                ArgToken::Word(word)
                    if spec.extended
                        && (word.eq_ignore_ascii_case("ANY_CREATURE") || word.eq_ignore_ascii_case("ANY")) =>
                {
                    Some(CreatureSel::Any)
                },
                ArgToken::Word(word) => cx.catalog.creatures.id(word).map(CreatureSel::Kind),
                ArgToken::Number(0) if spec.extended => Some(CreatureSel::Any),
                ArgToken::Number(n) if cx.catalog.creatures.contains_id(*n) => {
                    u16::try_from(*n).ok().map(CreatureSel::Kind)
                },
                _ => None,
            };
            sel.map(Arg::Creature).ok_or_else(|| ScriptError::UnknownName {
                kind: "creature",
                name: token.to_string(),
            })
        },
        ArgKind::Room | ArgKind::Slab => {
            let table = if spec.kind == ArgKind::Room {
                &cx.catalog.rooms
            } else {
                &cx.catalog.slabs
            };
            let id = match token {
                ArgToken::Word(word) => table.id(word),
                ArgToken::Number(n) if table.contains_id(*n) => u16::try_from(*n).ok(),
                _ => None,
            };
            let id = id.ok_or_else(|| ScriptError::UnknownName {
                kind: spec.kind.name(),
                name: token.to_string(),
            })?;
            Ok(if spec.kind == ArgKind::Room {
                Arg::Room(id)
            } else {
                Arg::Slab(id)
            })
        },
        ArgKind::Location | ArgKind::Atom | ArgKind::Property => token.text().map(Arg::Text).ok_or_else(invalid),
        ArgKind::Operator => match token {
            ArgToken::Operator(op) | ArgToken::Word(op) => Comparison::from_token(op).map(Arg::Operator).ok_or_else(invalid),
            _ => Err(invalid()),
        },
        ArgKind::Boolean => {
            let value = match token {
                ArgToken::Number(n @ (0 | 1)) => Some(*n),
                ArgToken::Number(-1) if spec.extended => Some(-1),
                ArgToken::Word(word) => parse_boolean(word).map(i64::from),
                _ => None,
            };
            value.map(Arg::Boolean).ok_or_else(invalid)
        },
    }
}
