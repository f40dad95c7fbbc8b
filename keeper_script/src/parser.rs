use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest_derive::Parser as PestParser;

use crate::{ArgToken, DrawItem, Scalar, ScriptLine, SubCall, SubFunction};

#[derive(PestParser)]
#[grammar = "src/grammar.pest"]
struct LineParser;

/// Errors that can happen when parsing a single script line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("syntax error at column {column}: {message}")]
    Pest { column: usize, message: String },
    #[error("unexpected grammar shape: {0}")]
    Shape(&'static str),
    #[error("numeric value '{0}' out of range")]
    Number(String),
    #[error("unterminated block comment")]
    UnterminatedComment,
}

/// A line-level error tagged with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {error}")]
pub struct SyntaxError {
    pub line: usize,
    pub error: LineError,
}

/// Result of parsing a whole script: every well-formed line plus one error per bad line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScript {
    pub lines: Vec<ScriptLine>,
    pub errors: Vec<SyntaxError>,
}

/// Parse full script text.
///
/// Block comments are removed first; each remaining line is parsed on its own.
///
/// ```
/// let parsed = keeper_script::parse_script("REM setup\nSTART_MONEY(PLAYER0, 2500)\nENDIF");
/// assert!(parsed.errors.is_empty());
/// assert_eq!(parsed.lines.len(), 2);
/// assert_eq!(parsed.lines[0].line_no, 2);
/// ```
pub fn parse_script(source: &str) -> ParsedScript {
    let mut parsed = ParsedScript::default();
    for (line_no, text) in strip_block_comments(source, &mut parsed.errors) {
        match parse_line(&text, line_no) {
            Ok(Some(line)) => parsed.lines.push(line),
            Ok(None) => {},
            Err(error) => parsed.errors.push(SyntaxError { line: line_no, error }),
        }
    }
    parsed
}

/// Parse one line; blank and comment-only lines yield `Ok(None)`.
///
/// # Errors
/// Returns a [`LineError`] when the line does not match the script grammar.
pub fn parse_line(text: &str, line_no: usize) -> Result<Option<ScriptLine>, LineError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let mut pairs = LineParser::parse(Rule::line, text).map_err(|e| pest_error(&e))?;
    let line = pairs.next().ok_or(LineError::Shape("expected line"))?;
    for pair in line.into_inner() {
        match pair.as_rule() {
            Rule::statement => return build_statement(pair, line_no).map(Some),
            Rule::rem | Rule::EOI => {},
            _ => return Err(LineError::Shape("unexpected line content")),
        }
    }
    Ok(None)
}

fn pest_error(err: &pest::error::Error<Rule>) -> LineError {
    let column = match err.line_col {
        LineColLocation::Pos((_, col)) | LineColLocation::Span((_, col), _) => col,
    };
    // the rendered error ends with a "= expected ..." summary line
    let rendered = err.to_string();
    let message = rendered
        .lines()
        .last()
        .map(|l| l.trim().trim_start_matches('=').trim().to_string())
        .unwrap_or_default();
    LineError::Pest { column, message }
}

fn build_statement(pair: Pair<Rule>, line_no: usize) -> Result<ScriptLine, LineError> {
    let mut inner = pair.into_inner();
    let command = inner
        .next()
        .filter(|p| p.as_rule() == Rule::command)
        .ok_or(LineError::Shape("expected command word"))?
        .as_str()
        .to_ascii_uppercase();

    let mut args = Vec::new();
    for part in inner {
        match part.as_rule() {
            Rule::arguments => {
                for arg in part.into_inner() {
                    args.push(build_arg(arg)?);
                }
            },
            Rule::rem => {},
            _ => return Err(LineError::Shape("unexpected statement part")),
        }
    }
    Ok(ScriptLine { line_no, command, args })
}

fn build_arg(pair: Pair<Rule>) -> Result<ArgToken, LineError> {
    match pair.as_rule() {
        Rule::word => Ok(ArgToken::Word(pair.as_str().to_string())),
        Rule::number => parse_number(pair.as_str()).map(ArgToken::Number),
        Rule::string => Ok(ArgToken::Text(string_content(pair))),
        Rule::operator => Ok(ArgToken::Operator(pair.as_str().to_string())),
        Rule::subfunction => build_subcall(pair).map(ArgToken::Call),
        _ => Err(LineError::Shape("unexpected argument")),
    }
}

fn build_subcall(pair: Pair<Rule>) -> Result<SubCall, LineError> {
    let mut inner = pair.into_inner();
    let name = inner.next().ok_or(LineError::Shape("expected subfunction name"))?;
    let function = SubFunction::from_word(name.as_str()).ok_or(LineError::Shape("unknown subfunction"))?;
    let mut items = Vec::new();
    for item in inner {
        let mut values = item.into_inner();
        let first = build_scalar(values.next().ok_or(LineError::Shape("empty draw item"))?)?;
        match values.next() {
            Some(second) => items.push(DrawItem::Range(first, build_scalar(second)?)),
            None => items.push(DrawItem::Value(first)),
        }
    }
    Ok(SubCall { function, items })
}

fn build_scalar(pair: Pair<Rule>) -> Result<Scalar, LineError> {
    match pair.as_rule() {
        Rule::word => Ok(Scalar::Word(pair.as_str().to_string())),
        Rule::number => parse_number(pair.as_str()).map(Scalar::Number),
        Rule::string => Ok(Scalar::Text(string_content(pair))),
        _ => Err(LineError::Shape("unexpected draw value")),
    }
}

fn string_content(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|inner| inner.as_str().to_string())
        .unwrap_or_default()
}

fn parse_number(text: &str) -> Result<i64, LineError> {
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(&format!("{sign}{hex}"), 16),
        None => text.parse::<i64>(),
    }
    .map_err(|_| LineError::Number(text.to_string()))
}

/// Remove `/* ... */` comments, which may span lines. Returns `(line_no, text)` pairs.
fn strip_block_comments(source: &str, errors: &mut Vec<SyntaxError>) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut open_since: Option<usize> = None;
    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let mut kept = String::with_capacity(raw.len());
        let mut rest = raw;
        loop {
            if open_since.is_some() {
                match rest.find("*/") {
                    Some(end) => {
                        open_since = None;
                        rest = &rest[end + 2..];
                    },
                    None => break,
                }
            } else {
                match rest.find("/*") {
                    Some(start) => {
                        kept.push_str(&rest[..start]);
                        open_since = Some(line_no);
                        rest = &rest[start + 2..];
                    },
                    None => {
                        kept.push_str(rest);
                        break;
                    },
                }
            }
        }
        out.push((line_no, kept));
    }
    if let Some(line) = open_since {
        errors.push(SyntaxError {
            line,
            error: LineError::UnterminatedComment,
        });
    }
    out
}
