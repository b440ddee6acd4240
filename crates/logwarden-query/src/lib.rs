//! Search-query compiler: free text in, typed predicate tokens out.
//!
//! Queries are whitespace-delimited lexemes, each independently classified
//! into a [`Token`]. There is deliberately no error channel anywhere in
//! this crate: malformed fragments (bad comparison values, unknown level
//! aliases, unparseable datetimes) are dropped one token at a time, and
//! the remaining valid tokens still apply. Alert configuration validation
//! and live evaluation share this parser and both rely on that leniency.

mod classify;
mod datetime;
mod tokenizer;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use logwarden_common::types::LogLevel;
use serde::{Deserialize, Serialize};

/// Comparison operator for metadata and timestamp filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "eq"),
            CompareOp::Gt => write!(f, "gt"),
            CompareOp::Gte => write!(f, "gte"),
            CompareOp::Lt => write!(f, "lt"),
            CompareOp::Lte => write!(f, "lte"),
        }
    }
}

impl CompareOp {
    /// SQL comparison operator spelling.
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// A classified unit of a compiled search query.
///
/// Every variant carries an include/exclude polarity; the exclude forms
/// are separate variants so that a downstream predicate applier can match
/// exhaustively. Tokens combine with logical AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    /// Positive free-text match against the message or any metadata value.
    Term(String),
    /// Exact-substring match, derived from a quoted lexeme.
    Phrase(String),
    /// Negated free-text match.
    Exclude(String),
    /// Comparison against the metadata value at `key`.
    MetadataFilter {
        key: String,
        op: CompareOp,
        value: String,
    },
    ExcludeMetadataFilter {
        key: String,
        op: CompareOp,
        value: String,
    },
    /// Pseudo-field on the severity column.
    LevelFilter(LogLevel),
    ExcludeLevelFilter(LogLevel),
    /// Pseudo-field on the timestamp column.
    TimestampFilter { op: CompareOp, at: DateTime<Utc> },
    ExcludeTimestampFilter { op: CompareOp, at: DateTime<Utc> },
    /// Pseudo-field on the source column; substring match, `*` wildcards.
    SourceFilter(String),
    ExcludeSourceFilter(String),
}

/// Compile a raw query string into tokens, using the current wall clock
/// for relative datetime values.
///
/// Never fails. Empty or all-whitespace input yields an empty sequence,
/// which downstream filtering treats as "match everything".
///
/// # Examples
///
/// ```
/// use logwarden_query::{parse, CompareOp, Token};
///
/// let tokens = parse("error user_id:123 -debug");
/// assert_eq!(
///     tokens,
///     vec![
///         Token::Term("error".into()),
///         Token::MetadataFilter {
///             key: "user_id".into(),
///             op: CompareOp::Eq,
///             value: "123".into(),
///         },
///         Token::Exclude("debug".into()),
///     ]
/// );
/// ```
pub fn parse(text: &str) -> Vec<Token> {
    parse_at(text, Utc::now())
}

/// [`parse`] with an injected "now", so relative datetimes (`-15m`,
/// `today`) resolve deterministically in tests.
pub fn parse_at(text: &str, now: DateTime<Utc>) -> Vec<Token> {
    tokenizer::lexemes(text.trim())
        .into_iter()
        .filter_map(|lexeme| classify::classify(lexeme, now))
        .collect()
}
