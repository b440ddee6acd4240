use once_cell::sync::Lazy;
use regex::Regex;

/// Lexical grammar, ordered most-specific-first. The regex crate's
/// leftmost-first alternation semantics make that ordering load-bearing:
/// `key:>100` must be captured by the comparison alternative before the
/// generic bare-term fallback can eat it, and quoted forms must win so
/// that phrases may contain whitespace.
static LEXEME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"-?[\w.-]+:"(?:[^"\\]|\\.)*""#, // key:"quoted value" (and -key:"...")
        r#"|"(?:[^"\\]|\\.)*""#,          // "quoted phrase"
        r"|-?[\w.-]+:(?:>=|<=|>|<)\S+",   // key:>value comparisons
        r"|-?[\w.-]+:\S+",                // bare key:value
        r"|-\S+",                         // -excluded
        r"|\S+",                          // bare term
    ))
    .expect("lexeme grammar must compile")
});

/// Split the input into raw lexemes. Anything that matches no alternative
/// (only possible for stray whitespace) is skipped.
pub(crate) fn lexemes(text: &str) -> Vec<&str> {
    LEXEME.find_iter(text).map(|m| m.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_delimits_lexemes() {
        assert_eq!(lexemes("a  b\tc"), vec!["a", "b", "c"]);
        assert!(lexemes("").is_empty());
    }

    #[test]
    fn quoted_lexemes_keep_whitespace() {
        assert_eq!(
            lexemes(r#"before "two words" after"#),
            vec!["before", r#""two words""#, "after"]
        );
        assert_eq!(
            lexemes(r#"source:"api gateway""#),
            vec![r#"source:"api gateway""#]
        );
    }

    #[test]
    fn comparison_wins_over_bare_term() {
        assert_eq!(lexemes("duration_ms:>100"), vec!["duration_ms:>100"]);
        assert_eq!(lexemes("-duration_ms:<=5"), vec!["-duration_ms:<=5"]);
    }

    #[test]
    fn unterminated_quote_falls_back() {
        // No closing quote: the quoted alternatives cannot match, so the
        // input degrades to ordinary whitespace-split lexemes.
        assert_eq!(lexemes(r#"msg:"oops then"#), vec![r#"msg:"oops"#, "then"]);
    }
}
