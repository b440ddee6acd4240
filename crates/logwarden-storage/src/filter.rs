use logwarden_query::{CompareOp, Token};
use rusqlite::types::ToSqlOutput;
use rusqlite::ToSql;

/// A bound SQL parameter produced by the predicate applier.
#[derive(Debug, Clone)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlValue::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            SqlValue::Integer(i) => Ok(ToSqlOutput::from(*i)),
            SqlValue::Real(f) => Ok(ToSqlOutput::from(*f)),
        }
    }
}

/// A compiled token sequence lowered to SQL: one predicate per token,
/// combined with AND. An empty token slice narrows nothing.
#[derive(Debug, Default)]
pub struct LogFilter {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl LogFilter {
    /// Lower every token to a predicate over the `logs` table.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let mut filter = LogFilter::default();
        for token in tokens {
            filter.push_token(token);
        }
        filter
    }

    /// Additional raw predicate, used for cursor and window bounds.
    pub fn push_raw(&mut self, clause: &str, param: SqlValue) {
        self.clauses.push(clause.to_string());
        self.params.push(param);
    }

    /// ` WHERE a AND b ...`, or the empty string when nothing narrows.
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    fn push_token(&mut self, token: &Token) {
        match token {
            Token::Term(text) | Token::Phrase(text) => {
                self.clauses.push(format!("({TEXT_NEEDLE})"));
                let needle = SqlValue::Text(format!("%{}%", escape_like(text)));
                self.params.push(needle.clone());
                self.params.push(needle);
            }
            Token::Exclude(text) => {
                self.clauses.push(format!("NOT ({TEXT_NEEDLE})"));
                let needle = SqlValue::Text(format!("%{}%", escape_like(text)));
                self.params.push(needle.clone());
                self.params.push(needle);
            }
            Token::MetadataFilter { key, op, value } => {
                let (clause, params) = metadata_predicate(key, *op, value, false);
                self.clauses.push(clause);
                self.params.extend(params);
            }
            Token::ExcludeMetadataFilter { key, op, value } => {
                let (clause, params) = metadata_predicate(key, *op, value, true);
                self.clauses.push(clause);
                self.params.extend(params);
            }
            Token::LevelFilter(level) => {
                self.clauses.push("level = ?".to_string());
                self.params.push(SqlValue::Text(level.to_string()));
            }
            Token::ExcludeLevelFilter(level) => {
                self.clauses.push("level <> ?".to_string());
                self.params.push(SqlValue::Text(level.to_string()));
            }
            Token::TimestampFilter { op, at } => {
                self.clauses.push(format!("timestamp {} ?", op.sql()));
                self.params.push(SqlValue::Integer(at.timestamp_millis()));
            }
            Token::ExcludeTimestampFilter { op, at } => {
                self.clauses
                    .push(format!("NOT (timestamp {} ?)", op.sql()));
                self.params.push(SqlValue::Integer(at.timestamp_millis()));
            }
            Token::SourceFilter(pattern) => {
                self.clauses.push("source LIKE ? ESCAPE '\\'".to_string());
                self.params.push(SqlValue::Text(source_like(pattern)));
            }
            Token::ExcludeSourceFilter(pattern) => {
                self.clauses
                    .push("(source IS NULL OR source NOT LIKE ? ESCAPE '\\')".to_string());
                self.params.push(SqlValue::Text(source_like(pattern)));
            }
        }
    }
}

/// Free-text needle over the message column and every metadata value.
/// Metadata keys and JSON punctuation are deliberately out of reach:
/// `json_each` walks the values only.
const TEXT_NEEDLE: &str = "message LIKE ? ESCAPE '\\' OR EXISTS \
     (SELECT 1 FROM json_each(metadata) WHERE json_each.value LIKE ? ESCAPE '\\')";

/// Backslash-escape LIKE metacharacters so user text matches literally.
/// Every clause binding an escaped needle declares `ESCAPE '\'`.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Metadata comparisons go through `json_extract`. When the comparand
/// parses as a number the stored value is CAST so `duration_ms:>100`
/// compares numerically; otherwise the comparison is lexical. Excluded
/// filters also match records lacking the key entirely.
fn metadata_predicate(
    key: &str,
    op: CompareOp,
    value: &str,
    negated: bool,
) -> (String, Vec<SqlValue>) {
    let path = SqlValue::Text(format!("$.\"{key}\""));
    let (inner, comparand) = match value.parse::<f64>() {
        Ok(number) => (
            format!("CAST(json_extract(metadata, ?) AS REAL) {} ?", op.sql()),
            SqlValue::Real(number),
        ),
        Err(_) => (
            format!("json_extract(metadata, ?) {} ?", op.sql()),
            SqlValue::Text(value.to_string()),
        ),
    };
    if negated {
        (
            format!("(json_extract(metadata, ?) IS NULL OR NOT ({inner}))"),
            vec![path.clone(), path, comparand],
        )
    } else {
        (inner, vec![path, comparand])
    }
}

/// Source patterns are substring matches; `*` is the only wildcard and
/// translates to SQL `%`. Literal `%`/`_` in the pattern are escaped
/// first so only the deliberate wildcard survives.
fn source_like(pattern: &str) -> String {
    let escaped = escape_like(pattern);
    if pattern.contains('*') {
        escaped.replace('*', "%")
    } else {
        format!("%{escaped}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_tokens_narrow_nothing() {
        let filter = LogFilter::from_tokens(&[]);
        assert_eq!(filter.where_clause(), "");
        assert!(filter.params().is_empty());
    }

    #[test]
    fn tokens_join_with_and() {
        let filter = LogFilter::from_tokens(&[
            Token::Term("error".into()),
            Token::LevelFilter(logwarden_common::types::LogLevel::Error),
        ]);
        assert_eq!(
            filter.where_clause(),
            format!(" WHERE ({TEXT_NEEDLE}) AND level = ?")
        );
        assert_eq!(filter.params().len(), 3);
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("100%"), r"100\%");
        assert_eq!(escape_like("api_gateway"), r"api\_gateway");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
        assert_eq!(escape_like("plain"), "plain");

        let filter = LogFilter::from_tokens(&[Token::Term("100%".into())]);
        match &filter.params()[0] {
            SqlValue::Text(needle) => assert_eq!(needle, r"%100\%%"),
            other => panic!("expected text param, got {other:?}"),
        }
    }

    #[test]
    fn numeric_metadata_uses_cast() {
        let filter = LogFilter::from_tokens(&[Token::MetadataFilter {
            key: "duration_ms".into(),
            op: CompareOp::Gt,
            value: "100".into(),
        }]);
        assert!(filter.where_clause().contains("CAST(json_extract"));
    }

    #[test]
    fn lexical_metadata_skips_cast() {
        let filter = LogFilter::from_tokens(&[Token::MetadataFilter {
            key: "env".into(),
            op: CompareOp::Eq,
            value: "prod".into(),
        }]);
        assert!(!filter.where_clause().contains("CAST"));
    }

    #[test]
    fn source_wildcards_translate() {
        assert_eq!(source_like("api-*"), "api-%");
        assert_eq!(source_like("gateway"), "%gateway%");
        // literal underscore stays literal; only * becomes a wildcard
        assert_eq!(source_like("api_*"), r"api\_%");
        assert_eq!(source_like("api_gateway"), r"%api\_gateway%");
    }

    #[test]
    fn timestamp_binds_millis() {
        let at = Utc.with_ymd_and_hms(2025, 8, 12, 0, 0, 0).unwrap();
        let filter = LogFilter::from_tokens(&[Token::TimestampFilter {
            op: CompareOp::Gte,
            at,
        }]);
        assert_eq!(filter.where_clause(), " WHERE timestamp >= ?");
        match &filter.params()[0] {
            SqlValue::Integer(ms) => assert_eq!(*ms, at.timestamp_millis()),
            other => panic!("expected integer param, got {other:?}"),
        }
    }
}
