//! Candidate extraction: walk the statement tree and propose blankable spans.
//!
//! If the source does not parse, a regex token scanner takes over and every
//! identifier or integer becomes a `PlainToken` candidate.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

use super::error::SyntaxError;
use super::lexer::Span;
use super::score::RegionMap;
use super::syntax::{parse, Stmt};
use super::{BlankCandidate, Category};
use crate::config::EngineConfig;

static EXCLUDED_LINES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"^\s*print\s*\(\s*[rRuUfFbB]*["']"#,
        r"^\s*#",
        r#"^\s*""""#,
        r"^\s*'''",
        r"^\s*(async\s+)?def\s",
        r"^\s*class\s",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid exclusion regex"))
    .collect()
});

static FALLBACK_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*|\b\d+\b").expect("valid token regex"));

const MIN_CONDITION_LEN: usize = 3;
const MIN_FOR_ITER_LEN: usize = 3;
const MIN_POINTER_ASSIGN_LEN: usize = 4;

/// Result of the extraction phase.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Candidates in document traversal order, unscored.
    pub candidates: Vec<BlankCandidate>,
    pub regions: RegionMap,
    /// Set when the syntax parser failed and the token scanner was used.
    pub diagnostic: Option<SyntaxError>,
}

impl Extraction {
    pub fn used_fallback(&self) -> bool {
        self.diagnostic.is_some()
    }
}

#[instrument(target = "drill", level = "debug", skip_all, fields(source_len = source.len()))]
pub fn extract(source: &str, cfg: &EngineConfig) -> Extraction {
    let lines: Vec<&str> = source.split('\n').collect();

    match parse(source) {
        Ok(module) => {
            let mut walker = Walker {
                lines: &lines,
                cfg,
                out: Vec::new(),
                seen: HashSet::new(),
            };
            walker.walk(&module.body);
            let regions = RegionMap::from_module(&module);
            debug!(
                target: "drill",
                candidates = walker.out.len(),
                regions = regions.ranges().len(),
                "syntax extraction finished"
            );
            Extraction {
                candidates: walker.out,
                regions,
                diagnostic: None,
            }
        }
        Err(err) => {
            warn!(target: "drill", line = err.line, error = %err.message, "source did not parse; using token scanner");
            Extraction {
                candidates: scan_tokens(&lines, cfg),
                regions: RegionMap::default(),
                diagnostic: Some(err),
            }
        }
    }
}

struct Walker<'a> {
    lines: &'a [&'a str],
    cfg: &'a EngineConfig,
    out: Vec<BlankCandidate>,
    seen: HashSet<(usize, usize)>,
}

impl Walker<'_> {
    fn walk(&mut self, body: &[Stmt]) {
        for stmt in body {
            let excluded = self.is_excluded_line(stmt.span().start.line);
            match stmt {
                Stmt::FunctionDef { body, .. }
                | Stmt::ClassDef { body, .. }
                | Stmt::Compound { body, .. } => self.walk(body),
                Stmt::If { test, body, orelse, .. } | Stmt::While { test, body, orelse, .. } => {
                    if !excluded {
                        self.condition(*test);
                    }
                    self.walk(body);
                    self.walk(orelse);
                }
                Stmt::For { iter, body, orelse, .. } => {
                    if !excluded {
                        self.push(*iter, Category::ForIter, MIN_FOR_ITER_LEN);
                    }
                    self.walk(body);
                    self.walk(orelse);
                }
                Stmt::Assign { targets, span, .. } => {
                    if excluded {
                        continue;
                    }
                    let is_pointer = targets
                        .first()
                        .and_then(|t| slice_span(self.lines, *t))
                        .is_some_and(|t| self.is_pointer_target(&t));
                    if is_pointer {
                        self.push(*span, Category::PointerAssign, MIN_POINTER_ASSIGN_LEN);
                    }
                }
                Stmt::Return { value: Some(value), .. } => {
                    if !excluded {
                        self.push(*value, Category::Return, 1);
                    }
                }
                Stmt::Return { value: None, .. } | Stmt::Simple { .. } => {}
            }
        }
    }

    fn is_excluded_line(&self, line: usize) -> bool {
        self.lines
            .get(line.wrapping_sub(1))
            .map_or(true, |text| EXCLUDED_LINES.iter().any(|re| re.is_match(text)))
    }

    fn condition(&mut self, test: Span) {
        let Some(text) = slice_span(self.lines, test) else {
            return;
        };
        let boundary = self.cfg.boundary_patterns.iter().any(|p| text.contains(p.as_str()));
        let category = if boundary && !self.involves_pointer(&text) {
            Category::Boundary
        } else {
            Category::Condition
        };
        self.push(test, category, MIN_CONDITION_LEN);
    }

    fn involves_pointer(&self, text: &str) -> bool {
        self.cfg.pointer_identifiers.iter().any(|id| contains_word(text, id))
            || self.cfg.link_tokens.iter().any(|t| text.contains(t.as_str()))
    }

    /// Bare pointer name, attribute access rooted at one, or any link token.
    fn is_pointer_target(&self, target: &str) -> bool {
        let target = target.trim();
        let root = target.split('.').next().unwrap_or(target).trim();
        self.cfg.pointer_identifiers.iter().any(|id| id == root)
            || self.cfg.link_tokens.iter().any(|t| target.contains(t.as_str()))
    }

    fn push(&mut self, span: Span, category: Category, min_len: usize) {
        let Some(text) = slice_span(self.lines, span) else {
            debug!(target: "drill", line = span.start.line, "span could not be sliced; skipped");
            return;
        };
        if text.trim().is_empty() || text.len() < min_len {
            return;
        }
        if !self.seen.insert((span.start.line, span.start.col)) {
            return;
        }
        self.out.push(BlankCandidate::new(
            text,
            category,
            span.start.line,
            Some(span.start.col),
        ));
    }
}

/// Exact source text covered by `span`; `None` if it is out of range or not
/// on character boundaries.
pub fn slice_span(lines: &[&str], span: Span) -> Option<String> {
    let first = lines.get(span.start.line.checked_sub(1)?)?;
    if span.start.line == span.end.line {
        return first.get(span.start.col..span.end.col).map(str::to_string);
    }
    if span.end.line < span.start.line {
        return None;
    }
    let mut parts = vec![first.get(span.start.col..)?.to_string()];
    for line in span.start.line + 1..span.end.line {
        parts.push(lines.get(line - 1)?.to_string());
    }
    let last = lines.get(span.end.line - 1)?;
    parts.push(last.get(..span.end.col)?.to_string());
    Some(parts.join("\n"))
}

/// `word` appears in `text` as a whole identifier.
fn contains_word(text: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(word).any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after = text[at + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

fn scan_tokens(lines: &[&str], cfg: &EngineConfig) -> Vec<BlankCandidate> {
    let mut out = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        for m in FALLBACK_TOKEN.find_iter(line) {
            let token = m.as_str();
            if token.len() <= 1 || cfg.excluded_keywords.iter().any(|k| k == token) {
                continue;
            }
            out.push(BlankCandidate::new(
                token,
                Category::PlainToken,
                idx + 1,
                Some(m.start()),
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(ex: &Extraction) -> Vec<(&str, Category, usize)> {
        ex.candidates
            .iter()
            .map(|c| (c.text.as_str(), c.category, c.line))
            .collect()
    }

    #[test]
    fn test_extract_condition_and_returns() {
        let src = "def f(x):\n    if x > 0:\n        return x\n    else:\n        return -x";
        let ex = extract(src, &EngineConfig::default());
        assert!(!ex.used_fallback());
        assert_eq!(
            texts(&ex),
            vec![
                ("x > 0", Category::Condition, 2),
                ("x", Category::Return, 3),
                ("-x", Category::Return, 5),
            ]
        );
        assert_eq!(ex.candidates[0].column, Some(7));
    }

    #[test]
    fn test_pointer_assignment_takes_whole_statement() {
        let src = "def appendNode(head, data):\n    newNode = Node(data)\n    current = head\n    while current.link is not None:\n        current = current.link\n    current.link = newNode\n    count = 0\n";
        let ex = extract(src, &EngineConfig::default());
        let found = texts(&ex);
        assert!(found.contains(&("newNode = Node(data)", Category::PointerAssign, 2)));
        assert!(found.contains(&("current.link = newNode", Category::PointerAssign, 6)));
        // Boundary pattern, but pointer involvement keeps it a Condition.
        assert!(found.contains(&("current.link is not None", Category::Condition, 4)));
        assert!(!found.iter().any(|(t, _, _)| *t == "count = 0"));
    }

    #[test]
    fn test_boundary_without_pointer() {
        let src = "def check(index, size):\n    if index < 0:\n        return False\n    for i in range(size):\n        pass\n";
        let ex = extract(src, &EngineConfig::default());
        let found = texts(&ex);
        assert!(found.contains(&("index < 0", Category::Boundary, 2)));
        assert!(found.contains(&("range(size)", Category::ForIter, 4)));
        assert!(found.contains(&("False", Category::Return, 3)));
    }

    #[test]
    fn test_short_condition_is_skipped() {
        let ex = extract("while x:\n    x = step(x)\n", &EngineConfig::default());
        assert!(ex.candidates.is_empty());
    }

    #[test]
    fn test_one_line_def_body_is_excluded() {
        let ex = extract("def f(): return value\n", &EngineConfig::default());
        assert!(ex.candidates.is_empty());
    }

    #[test]
    fn test_candidate_text_matches_source_slice() {
        let src = "class LinkedList:\n    def insertAt(self, index, data):\n        if index == 0 or self.head is None:\n            node = Node(data)\n            node.next = self.head\n            return node\n";
        let ex = extract(src, &EngineConfig::default());
        let lines: Vec<&str> = src.split('\n').collect();
        assert!(!ex.candidates.is_empty());
        for c in &ex.candidates {
            let col = c.column.unwrap();
            assert_eq!(&lines[c.line - 1][col..col + c.text.len()], c.text);
        }
    }

    #[test]
    fn test_multi_line_condition_slices_joined_text() {
        let src = "if (alpha and\n        beta):\n    go()\n";
        let ex = extract(src, &EngineConfig::default());
        assert_eq!(ex.candidates.len(), 1);
        assert_eq!(ex.candidates[0].text, "(alpha and\n        beta)");
        assert_eq!(ex.candidates[0].end_line(), 2);
    }

    #[test]
    fn test_fallback_scanner_on_syntax_error() {
        let src = "def broken(:\n    total = a + 10\n# note here\n";
        let ex = extract(src, &EngineConfig::default());
        assert!(ex.used_fallback());
        assert!(ex.candidates.iter().all(|c| c.category == Category::PlainToken));
        let tokens: Vec<&str> = ex.candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(tokens, vec!["broken", "total", "10"]);
    }

    #[test]
    fn test_contains_word_respects_identifier_edges() {
        assert!(contains_word("node is None", "node"));
        assert!(!contains_word("nodes is None", "node"));
        assert!(!contains_word("prev_node", "node"));
        assert!(contains_word("a(node)", "node"));
    }
}
