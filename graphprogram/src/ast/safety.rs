// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Textual safety scanning for query strings
//!
//! These checks operate on raw query text, not on a parsed query, so they are
//! a best-effort static gate rather than a proof. They reject when uncertain
//! and run twice: once in the validator and again at dispatch time.
//!
//! Before scanning, string-literal contents and comment contents are blanked
//! out (replaced by spaces, one per character) so that keywords appearing in
//! literal text or comments do not trigger. An unterminated literal or block
//! comment is left unblanked.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum hop count for a variable-length relationship pattern
pub const MAX_TRAVERSAL_HOPS: u64 = 6;

/// Mutation keywords and the rule id each one maps to
pub const WRITE_KEYWORDS: &[(&str, &str)] = &[
    ("CREATE", "V010"),
    ("SET", "V011"),
    ("DELETE", "V012"),
    ("MERGE", "V013"),
    ("REMOVE", "V014"),
    ("DROP", "V015"),
    ("DETACH", "V016"),
];

static WRITE_KEYWORD_PATTERNS: Lazy<Vec<(&'static str, &'static str, Regex)>> = Lazy::new(|| {
    WRITE_KEYWORDS
        .iter()
        .map(|(keyword, rule_id)| {
            let pattern = format!(r"(?i)\b{}\b", keyword);
            (
                *keyword,
                *rule_id,
                Regex::new(&pattern).expect("write keyword pattern is valid"),
            )
        })
        .collect()
});

static QUANTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\s*(?P<min>\d+)?\s*(?P<range>\.\.)?\s*(?P<max>\d+)?")
        .expect("quantifier pattern is valid")
});

static LIMIT_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLIMIT\b").expect("limit pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

/// Blank out string-literal and comment contents, preserving length in chars
///
/// Quote characters themselves are kept so token boundaries survive. Comment
/// forms recognised: `/* ... */`, `// ...`, and `-- ...` only when the `--`
/// starts a line (elsewhere `--` is an undirected relationship pattern).
pub fn strip_literals_and_comments(query: &str) -> String {
    let chars: Vec<char> = query.chars().collect();
    let mut out: Vec<char> = Vec::with_capacity(chars.len());
    let mut state = ScanState::Code;
    // Char index where the current literal or block comment opened
    let mut opened_at = 0usize;
    let mut at_line_start = true;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            ScanState::Code => {
                match (c, next) {
                    ('\'', _) => {
                        state = ScanState::SingleQuoted;
                        opened_at = i;
                        out.push(c);
                    }
                    ('"', _) => {
                        state = ScanState::DoubleQuoted;
                        opened_at = i;
                        out.push(c);
                    }
                    ('/', Some('*')) => {
                        state = ScanState::BlockComment;
                        opened_at = i;
                        out.extend([' ', ' ']);
                        i += 1;
                    }
                    ('/', Some('/')) => {
                        state = ScanState::LineComment;
                        out.extend([' ', ' ']);
                        i += 1;
                    }
                    ('-', Some('-')) if at_line_start => {
                        state = ScanState::LineComment;
                        out.extend([' ', ' ']);
                        i += 1;
                    }
                    _ => out.push(c),
                }
                if c == '\n' {
                    at_line_start = true;
                } else if !c.is_whitespace() {
                    at_line_start = false;
                }
            }
            ScanState::SingleQuoted | ScanState::DoubleQuoted => {
                let quote = if state == ScanState::SingleQuoted {
                    '\''
                } else {
                    '"'
                };
                if c == '\\' && next.is_some() {
                    out.extend([' ', ' ']);
                    i += 1;
                } else if c == quote {
                    out.push(c);
                    state = ScanState::Code;
                    at_line_start = false;
                } else {
                    out.push(' ');
                }
            }
            ScanState::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = ScanState::Code;
                    at_line_start = true;
                } else {
                    out.push(' ');
                }
            }
            ScanState::BlockComment => {
                if c == '*' && next == Some('/') {
                    out.extend([' ', ' ']);
                    i += 1;
                    state = ScanState::Code;
                } else {
                    out.push(if c == '\n' { '\n' } else { ' ' });
                }
            }
        }
        i += 1;
    }

    if matches!(
        state,
        ScanState::SingleQuoted | ScanState::DoubleQuoted | ScanState::BlockComment
    ) {
        out.truncate(opened_at);
        out.extend_from_slice(&chars[opened_at..]);
    }

    out.into_iter().collect()
}

/// A mutation keyword found in query text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteKeywordHit {
    pub keyword: &'static str,
    pub rule_id: &'static str,
}

/// Find every denylisted mutation keyword outside literals and comments.
/// Each keyword is reported at most once.
pub fn find_write_keywords(query: &str) -> Vec<WriteKeywordHit> {
    let stripped = strip_literals_and_comments(query);
    WRITE_KEYWORD_PATTERNS
        .iter()
        .filter(|(_, _, regex)| regex.is_match(&stripped))
        .map(|(keyword, rule_id, _)| WriteKeywordHit { keyword, rule_id })
        .collect()
}

/// Why a variable-length quantifier was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathBoundViolation {
    /// `*`, `*N..` or `*..` with no upper bound
    Unbounded { pattern: String },
    /// Upper (or fixed) bound above [`MAX_TRAVERSAL_HOPS`]
    ExceedsMaximum { pattern: String, hops: String },
}

impl PathBoundViolation {
    pub fn pattern(&self) -> &str {
        match self {
            PathBoundViolation::Unbounded { pattern } => pattern,
            PathBoundViolation::ExceedsMaximum { pattern, .. } => pattern,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PathBoundViolation::Unbounded { pattern } => format!(
                "Unbounded variable-length path '{}': an explicit upper bound of at most {} hops is required",
                pattern, MAX_TRAVERSAL_HOPS
            ),
            PathBoundViolation::ExceedsMaximum { pattern, hops } => format!(
                "Variable-length path '{}' allows {} hops, maximum is {}",
                pattern, hops, MAX_TRAVERSAL_HOPS
            ),
        }
    }
}

fn exceeds_max(digits: &str) -> bool {
    // Overflowing bounds are certainly too large
    digits
        .parse::<u64>()
        .map(|hops| hops > MAX_TRAVERSAL_HOPS)
        .unwrap_or(true)
}

/// Outermost `[...]` spans of already-stripped text, nested brackets included.
/// An unclosed `[` runs to the end of the text.
fn bracket_spans(stripped: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (offset, c) in stripped.char_indices() {
        match c {
            '[' => {
                if depth == 0 {
                    start = offset;
                }
                depth += 1;
            }
            ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&stripped[start..=offset]);
                }
            }
            _ => {}
        }
    }
    if depth > 0 {
        spans.push(&stripped[start..]);
    }

    spans
}

/// Find variable-length quantifiers inside `[...]` segments that are
/// unbounded or exceed [`MAX_TRAVERSAL_HOPS`]
pub fn find_unbounded_paths(query: &str) -> Vec<PathBoundViolation> {
    let stripped = strip_literals_and_comments(query);
    let mut violations = Vec::new();

    for segment in bracket_spans(&stripped) {
        for caps in QUANTIFIER.captures_iter(segment) {
            let pattern = caps
                .get(0)
                .map(|m| m.as_str().trim_end().to_string())
                .unwrap_or_default();
            let min = caps.name("min").map(|m| m.as_str());
            let has_range = caps.name("range").is_some();
            let max = caps.name("max").map(|m| m.as_str());

            match (min, has_range, max) {
                (None, false, _) => violations.push(PathBoundViolation::Unbounded { pattern }),
                (Some(fixed), false, _) => {
                    if exceeds_max(fixed) {
                        violations.push(PathBoundViolation::ExceedsMaximum {
                            pattern,
                            hops: fixed.to_string(),
                        });
                    }
                }
                (_, true, None) => violations.push(PathBoundViolation::Unbounded { pattern }),
                (_, true, Some(upper)) => {
                    if exceeds_max(upper) {
                        violations.push(PathBoundViolation::ExceedsMaximum {
                            pattern,
                            hops: upper.to_string(),
                        });
                    }
                }
            }
        }
    }

    violations
}

/// True if the query has its own LIMIT clause outside literals and comments
pub fn has_explicit_limit(query: &str) -> bool {
    LIMIT_CLAUSE.is_match(&strip_literals_and_comments(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_preserves_char_length() {
        let query = "MATCH (n {name: 'CREATE é'}) /* DELETE */ RETURN n // SET";
        let stripped = strip_literals_and_comments(query);
        assert_eq!(stripped.chars().count(), query.chars().count());
        assert!(!stripped.contains("CREATE"));
        assert!(!stripped.contains("DELETE"));
        assert!(!stripped.contains("SET"));
        assert!(stripped.contains("RETURN n"));
    }

    #[test]
    fn test_escaped_quote_does_not_close_literal() {
        let stripped = strip_literals_and_comments(r#"RETURN 'it\'s DROP' AS x"#);
        assert!(!stripped.contains("DROP"));
        assert!(stripped.contains("AS x"));
    }

    #[test]
    fn test_unterminated_literal_is_not_blanked() {
        let stripped = strip_literals_and_comments("MATCH (n) RETURN 'x DELETE n");
        assert!(stripped.contains("DELETE"));
    }

    #[test]
    fn test_double_dash_mid_line_is_a_pattern() {
        let query = "MATCH (a)--(b) DETACH DELETE a";
        let hits = find_write_keywords(query);
        assert!(hits.iter().any(|h| h.keyword == "DETACH"));
        assert!(hits.iter().any(|h| h.keyword == "DELETE"));
    }

    #[test]
    fn test_double_dash_line_comment() {
        let query = "-- CREATE nothing here\nMATCH (n) RETURN n";
        assert!(find_write_keywords(query).is_empty());
    }

    #[test]
    fn test_double_dash_after_code_is_not_a_comment() {
        let hits = find_write_keywords("MATCH (n) RETURN n -- DROP later");
        assert_eq!(hits, vec![WriteKeywordHit { keyword: "DROP", rule_id: "V015" }]);

        assert!(find_write_keywords("-- DROP later\nMATCH (n) RETURN n").is_empty());
        assert!(find_write_keywords("MATCH (n)\n   -- DROP later\nRETURN n").is_empty());
    }

    #[test]
    fn test_keyword_word_boundaries() {
        // Identifiers that merely contain a keyword do not match
        assert!(find_write_keywords("MATCH (n:Dataset) RETURN n.created_at, n.offset").is_empty());
        let hits = find_write_keywords("match (n) set n.x = 1");
        assert_eq!(hits, vec![WriteKeywordHit { keyword: "SET", rule_id: "V011" }]);
    }

    #[test]
    fn test_quantifier_bounds() {
        assert!(find_unbounded_paths("MATCH (a)-[:R*1..3]->(b) RETURN b").is_empty());
        assert!(find_unbounded_paths("MATCH (a)-[*2]->(b) RETURN b").is_empty());
        assert!(find_unbounded_paths("MATCH (a)-[r*..6]->(b) RETURN b").is_empty());

        assert!(matches!(
            find_unbounded_paths("MATCH (a)-[*]->(b) RETURN b").as_slice(),
            [PathBoundViolation::Unbounded { .. }]
        ));
        assert!(matches!(
            find_unbounded_paths("MATCH (a)-[:R*2..]->(b) RETURN b").as_slice(),
            [PathBoundViolation::Unbounded { .. }]
        ));
        assert!(matches!(
            find_unbounded_paths("MATCH (a)-[:R*1..7]->(b) RETURN b").as_slice(),
            [PathBoundViolation::ExceedsMaximum { .. }]
        ));
        assert!(matches!(
            find_unbounded_paths("MATCH (a)-[:R*10]->(b) RETURN b").as_slice(),
            [PathBoundViolation::ExceedsMaximum { .. }]
        ));
        assert!(matches!(
            find_unbounded_paths("MATCH (a)-[*99999999999999999999999]->(b) RETURN b").as_slice(),
            [PathBoundViolation::ExceedsMaximum { .. }]
        ));
    }

    #[test]
    fn test_quantifier_beside_nested_list_is_scanned() {
        assert!(matches!(
            find_unbounded_paths("MATCH (a)-[:R* {tags: [1]}]->(b) RETURN b").as_slice(),
            [PathBoundViolation::Unbounded { .. }]
        ));
        assert!(matches!(
            find_unbounded_paths("MATCH (a)-[:R*1..500 {w: [2]}]->(b) RETURN b").as_slice(),
            [PathBoundViolation::ExceedsMaximum { hops, .. }] if hops == "500"
        ));
        assert!(matches!(
            find_unbounded_paths("MATCH (a)-[:R {w: [[1], [2]]}*]->(b) RETURN b").as_slice(),
            [PathBoundViolation::Unbounded { .. }]
        ));
        assert!(find_unbounded_paths("MATCH (a)-[:R*1..3 {tags: [1]}]->(b) RETURN b").is_empty());
    }

    #[test]
    fn test_unclosed_bracket_is_scanned_to_end() {
        assert!(matches!(
            find_unbounded_paths("MATCH (a)-[:R*").as_slice(),
            [PathBoundViolation::Unbounded { .. }]
        ));
        assert_eq!(bracket_spans("a ] [b [c] d] [e"), vec!["[b [c] d]", "[e"]);
    }

    #[test]
    fn test_quantifier_in_literal_ignored() {
        assert!(find_unbounded_paths("MATCH (n) WHERE n.name = '[*]' RETURN n").is_empty());
        assert!(find_unbounded_paths("MATCH (n) RETURN count(*)").is_empty());
    }

    #[test]
    fn test_explicit_limit_detection() {
        assert!(has_explicit_limit("MATCH (n) RETURN n LIMIT 5"));
        assert!(!has_explicit_limit("MATCH (n {name: 'LIMIT'}) RETURN n"));
        assert!(!has_explicit_limit("MATCH (n) RETURN n.limit_value"));
    }
}
