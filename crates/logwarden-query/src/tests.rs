use crate::{parse, parse_at, CompareOp, Token};
use chrono::{Duration, TimeZone, Utc};
use logwarden_common::types::LogLevel;

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 12, 15, 30, 0).unwrap()
}

#[test]
fn empty_and_whitespace_queries_yield_no_tokens() {
    assert!(parse("").is_empty());
    assert!(parse("   \t  \n ").is_empty());
}

#[test]
fn mixed_query_preserves_order() {
    let tokens = parse("error user_id:123 -debug");
    assert_eq!(
        tokens,
        vec![
            Token::Term("error".into()),
            Token::MetadataFilter {
                key: "user_id".into(),
                op: CompareOp::Eq,
                value: "123".into(),
            },
            Token::Exclude("debug".into()),
        ]
    );
}

#[test]
fn comparison_operators() {
    assert_eq!(
        parse("duration_ms:>100"),
        vec![Token::MetadataFilter {
            key: "duration_ms".into(),
            op: CompareOp::Gt,
            value: "100".into(),
        }]
    );
    assert_eq!(
        parse("duration_ms:>=100 retries:<=3"),
        vec![
            Token::MetadataFilter {
                key: "duration_ms".into(),
                op: CompareOp::Gte,
                value: "100".into(),
            },
            Token::MetadataFilter {
                key: "retries".into(),
                op: CompareOp::Lte,
                value: "3".into(),
            },
        ]
    );
}

#[test]
fn negated_comparison() {
    assert_eq!(
        parse("-size:<10"),
        vec![Token::ExcludeMetadataFilter {
            key: "size".into(),
            op: CompareOp::Lt,
            value: "10".into(),
        }]
    );
}

#[test]
fn quoted_phrases_and_quoted_values() {
    assert_eq!(
        parse(r#""connection refused""#),
        vec![Token::Phrase("connection refused".into())]
    );
    assert_eq!(
        parse(r#"request_path:"/api/v1/users""#),
        vec![Token::MetadataFilter {
            key: "request_path".into(),
            op: CompareOp::Eq,
            value: "/api/v1/users".into(),
        }]
    );
    // Escaped quotes survive unescaping
    assert_eq!(
        parse(r#"msg:"said \"no\"""#),
        vec![Token::MetadataFilter {
            key: "msg".into(),
            op: CompareOp::Eq,
            value: r#"said "no""#.into(),
        }]
    );
}

#[test]
fn level_pseudo_field_maps_aliases_and_drops_unknowns() {
    assert_eq!(parse("level:err"), vec![Token::LevelFilter(LogLevel::Error)]);
    assert_eq!(
        parse("level:WARN"),
        vec![Token::LevelFilter(LogLevel::Warning)]
    );
    assert_eq!(
        parse("-level:dbg"),
        vec![Token::ExcludeLevelFilter(LogLevel::Debug)]
    );
    assert!(parse("level:bogus").is_empty());
    // The bad token drops, the good siblings survive
    assert_eq!(
        parse("level:bogus timeout"),
        vec![Token::Term("timeout".into())]
    );
}

#[test]
fn timestamp_pseudo_field() {
    let tokens = parse("timestamp:>=2025-08-12");
    assert_eq!(
        tokens,
        vec![Token::TimestampFilter {
            op: CompareOp::Gte,
            at: Utc.with_ymd_and_hms(2025, 8, 12, 0, 0, 0).unwrap(),
        }]
    );

    let now = fixed_now();
    assert_eq!(
        parse_at("timestamp:>-15m", now),
        vec![Token::TimestampFilter {
            op: CompareOp::Gt,
            at: now - Duration::minutes(15),
        }]
    );

    assert!(parse("timestamp:whenever").is_empty());
}

#[test]
fn source_pseudo_field_keeps_pattern_verbatim() {
    assert_eq!(
        parse("source:api-*"),
        vec![Token::SourceFilter("api-*".into())]
    );
    // Operator characters are part of the pattern, not semantics
    assert_eq!(
        parse("source:>gateway"),
        vec![Token::SourceFilter(">gateway".into())]
    );
    assert_eq!(
        parse("-source:staging"),
        vec![Token::ExcludeSourceFilter("staging".into())]
    );
}

#[test]
fn keys_are_lowercased() {
    assert_eq!(
        parse("LEVEL:error User_ID:9"),
        vec![
            Token::LevelFilter(LogLevel::Error),
            Token::MetadataFilter {
                key: "user_id".into(),
                op: CompareOp::Eq,
                value: "9".into(),
            },
        ]
    );
}

#[test]
fn dangling_operator_value_drops_token() {
    // `key:>` lexes as a bare key:value whose comparand is empty
    assert!(parse("duration_ms:>").is_empty());
}

#[test]
fn parse_never_fails_on_hostile_input() {
    for input in [
        ":::",
        "-",
        "--",
        "\"",
        r#"a:"unclosed"#,
        "key:",
        ":value",
        "🦀 emoji:👍",
        &"x".repeat(10_000),
    ] {
        // Must terminate and never panic; token contents are incidental
        let _ = parse(input);
    }
}

#[test]
fn reparsing_is_stable() {
    // Re-lexing the surviving raw fragments yields an equivalent sequence
    let input = "error user_id:123 -debug level:err timestamp:>=2025-08-12 source:api-*";
    let now = fixed_now();
    assert_eq!(parse_at(input, now), parse_at(input, now));
}
