use crate::datetime;
use crate::{CompareOp, Token};
use chrono::{DateTime, Utc};
use logwarden_common::types::LogLevel;

/// Query keys that map to first-class log columns instead of arbitrary
/// metadata: `level`, `timestamp`, `source`.
const LEVEL_KEY: &str = "level";
const TIMESTAMP_KEY: &str = "timestamp";
const SOURCE_KEY: &str = "source";

/// Classify one lexeme into a token, or drop it.
///
/// Returning `None` is not an error: the parse contract is that malformed
/// fragments contribute nothing while their siblings still apply.
pub(crate) fn classify(lexeme: &str, now: DateTime<Utc>) -> Option<Token> {
    let (negated, body) = match lexeme.strip_prefix('-') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, lexeme),
    };

    if body.starts_with('"') {
        let text = unquote(body);
        if text.is_empty() {
            return None;
        }
        return Some(if negated {
            Token::Exclude(text)
        } else {
            Token::Phrase(text)
        });
    }

    if let Some((key, raw_value)) = body.split_once(':') {
        if !key.is_empty() && !raw_value.is_empty() {
            return classify_keyed(key, raw_value, negated, now);
        }
    }

    if body.is_empty() {
        None
    } else if negated {
        Some(Token::Exclude(body.to_string()))
    } else {
        Some(Token::Term(body.to_string()))
    }
}

fn classify_keyed(
    key: &str,
    raw_value: &str,
    negated: bool,
    now: DateTime<Utc>,
) -> Option<Token> {
    let key = key.to_lowercase();
    let (op, comparand) = split_operator(raw_value);
    let comparand = unquote(comparand);

    match key.as_str() {
        LEVEL_KEY => {
            let level = resolve_level_alias(&comparand)?;
            Some(if negated {
                Token::ExcludeLevelFilter(level)
            } else {
                Token::LevelFilter(level)
            })
        }
        TIMESTAMP_KEY => {
            let at = datetime::parse_instant(&comparand, now)?;
            Some(if negated {
                Token::ExcludeTimestampFilter { op, at }
            } else {
                Token::TimestampFilter { op, at }
            })
        }
        // Source patterns have no operator semantics: the raw value is the
        // pattern, so a misused `source:>api` keeps the `>` verbatim.
        SOURCE_KEY => {
            let pattern = unquote(raw_value);
            if pattern.is_empty() {
                return None;
            }
            Some(if negated {
                Token::ExcludeSourceFilter(pattern)
            } else {
                Token::SourceFilter(pattern)
            })
        }
        _ => {
            if comparand.is_empty() {
                return None;
            }
            Some(if negated {
                Token::ExcludeMetadataFilter {
                    key,
                    op,
                    value: comparand,
                }
            } else {
                Token::MetadataFilter {
                    key,
                    op,
                    value: comparand,
                }
            })
        }
    }
}

/// Extract a leading comparison operator from a filter value.
fn split_operator(value: &str) -> (CompareOp, &str) {
    if let Some(rest) = value.strip_prefix(">=") {
        (CompareOp::Gte, rest)
    } else if let Some(rest) = value.strip_prefix("<=") {
        (CompareOp::Lte, rest)
    } else if let Some(rest) = value.strip_prefix('>') {
        (CompareOp::Gt, rest)
    } else if let Some(rest) = value.strip_prefix('<') {
        (CompareOp::Lt, rest)
    } else {
        (CompareOp::Eq, value)
    }
}

/// Map a level comparand through the alias table. Unknown values drop
/// the token.
fn resolve_level_alias(value: &str) -> Option<LogLevel> {
    match value.to_lowercase().as_str() {
        "debug" | "dbg" => Some(LogLevel::Debug),
        "info" | "inf" => Some(LogLevel::Info),
        "warning" | "warn" | "wrn" => Some(LogLevel::Warning),
        "error" | "err" => Some(LogLevel::Error),
        _ => None,
    }
}

/// Trim surrounding quotes and unescape `\"` and `\\`. Unquoted input is
/// returned as-is.
fn unquote(s: &str) -> String {
    let inner = match s
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) if s.len() >= 2 => inner,
        _ => return s.to_string(),
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_strips_and_unescapes() {
        assert_eq!(unquote(r#""plain""#), "plain");
        assert_eq!(unquote(r#""say \"hi\"""#), r#"say "hi""#);
        assert_eq!(unquote("not-quoted"), "not-quoted");
        assert_eq!(unquote(r#""""#), "");
    }

    #[test]
    fn split_operator_prefers_two_char_forms() {
        assert_eq!(split_operator(">=10"), (CompareOp::Gte, "10"));
        assert_eq!(split_operator("<=10"), (CompareOp::Lte, "10"));
        assert_eq!(split_operator(">10"), (CompareOp::Gt, "10"));
        assert_eq!(split_operator("<10"), (CompareOp::Lt, "10"));
        assert_eq!(split_operator("10"), (CompareOp::Eq, "10"));
    }

    #[test]
    fn level_aliases_resolve() {
        assert_eq!(resolve_level_alias("err"), Some(LogLevel::Error));
        assert_eq!(resolve_level_alias("WRN"), Some(LogLevel::Warning));
        assert_eq!(resolve_level_alias("inf"), Some(LogLevel::Info));
        assert_eq!(resolve_level_alias("dbg"), Some(LogLevel::Debug));
        assert_eq!(resolve_level_alias("bogus"), None);
    }
}
