//! keeper_script
//!
//! Front end for keeper level scripts. Splits script text into lines, strips
//! comments and parses each line into a [`ScriptLine`]: an upper-cased command
//! word plus its raw argument tokens. Tokens are not interpreted here; the
//! engine resolves them against each command's argument signature.
//!
//! Parsing is line-isolated. A malformed line produces a [`SyntaxError`] and
//! is skipped without affecting the lines around it.

pub mod parser;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use parser::{LineError, ParsedScript, SyntaxError, parse_line, parse_script};

/// Maximum number of arguments a command line may carry.
pub const MAX_ARGS: usize = 8;

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLine {
    /// 1-based source line number.
    pub line_no: usize,
    /// Command word, upper-cased.
    pub command: String,
    pub args: Vec<ArgToken>,
}

/// A raw argument as written in the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgToken {
    Word(String),
    Number(i64),
    Text(String),
    Operator(String),
    Call(SubCall),
}

impl ArgToken {
    /// Source-like text of a plain token; `None` for subfunction calls.
    pub fn text(&self) -> Option<String> {
        match self {
            ArgToken::Word(w) | ArgToken::Text(w) | ArgToken::Operator(w) => Some(w.clone()),
            ArgToken::Number(n) => Some(n.to_string()),
            ArgToken::Call(_) => None,
        }
    }
}

impl fmt::Display for ArgToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgToken::Word(w) | ArgToken::Operator(w) => f.write_str(w),
            ArgToken::Number(n) => write!(f, "{n}"),
            ArgToken::Text(t) => write!(f, "\"{t}\""),
            ArgToken::Call(call) => write!(f, "{call}"),
        }
    }
}

/// Functions that may stand in argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubFunction {
    /// Pick one of the listed values at load time.
    DrawFrom,
    /// Reserved for per-turn random values; not supported by the engine yet.
    Random,
    /// Read a campaign flag carried over from a previous level.
    Import,
}

impl SubFunction {
    pub fn name(self) -> &'static str {
        match self {
            SubFunction::DrawFrom => "DRAWFROM",
            SubFunction::Random => "RANDOM",
            SubFunction::Import => "IMPORT",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        [SubFunction::DrawFrom, SubFunction::Random, SubFunction::Import]
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(word))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCall {
    pub function: SubFunction,
    pub items: Vec<DrawItem>,
}

impl fmt::Display for SubCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.items.iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.function.name(), items.join(", "))
    }
}

/// One entry of a subfunction argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawItem {
    Value(Scalar),
    Range(Scalar, Scalar),
}

impl fmt::Display for DrawItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawItem::Value(v) => write!(f, "{v}"),
            DrawItem::Range(lo, hi) => write!(f, "{lo}~{hi}"),
        }
    }
}

/// A plain value inside a subfunction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scalar {
    Word(String),
    Number(i64),
    Text(String),
}

impl Scalar {
    pub fn into_token(self) -> ArgToken {
        match self {
            Scalar::Word(w) => ArgToken::Word(w),
            Scalar::Number(n) => ArgToken::Number(n),
            Scalar::Text(t) => ArgToken::Text(t),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Word(w) => f.write_str(w),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(t) => write!(f, "\"{t}\""),
        }
    }
}
