//! Local blank-generation engine.
//!
//! Pipeline, leaves first:
//! lexer -> syntax -> extract -> score -> distribute -> render / segment.
//! Every phase is synchronous and pure given its inputs (randomness only via
//! an injected RNG). Failures are returned as `EngineError`; only the session
//! assembler turns them into a degraded session.

pub mod distribute;
pub mod error;
pub mod extract;
pub mod lexer;
pub mod render;
pub mod score;
pub mod segment;
pub mod syntax;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub use distribute::{distribute, number_blanks};
pub use error::EngineError;
pub use extract::extract;
pub use render::{render, restore_markers};
pub use score::score;
pub use segment::{segment, SectionKind};

/// Why a span was chosen as a blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PointerAssign,
    Condition,
    Boundary,
    ForIter,
    Return,
    PlainToken,
}

/// A span of source proposed as a blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlankCandidate {
    pub text: String,
    pub category: Category,
    /// 1-based.
    pub line: usize,
    /// 0-based byte offset into `line`; `None` when unknown.
    pub column: Option<usize>,
    /// Enclosing function/method (`Class.method`), or `"global"`.
    pub region: String,
    pub score: f64,
}

impl BlankCandidate {
    pub fn new(text: impl Into<String>, category: Category, line: usize, column: Option<usize>) -> Self {
        Self {
            text: text.into(),
            category,
            line,
            column,
            region: GLOBAL_REGION.to_string(),
            score: 0.0,
        }
    }

    /// Last line touched by this candidate (multi-line texts span several).
    pub fn end_line(&self) -> usize {
        self.line + self.text.matches('\n').count()
    }

    /// Sort key used everywhere blanks are ordered by position.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column.unwrap_or(0))
    }
}

/// A selected candidate with its final 1-based ordinal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blank {
    pub ordinal: usize,
    #[serde(flatten)]
    pub candidate: BlankCandidate,
}

pub const GLOBAL_REGION: &str = "global";

/// Matches a rendered blank marker; group 1 is the ordinal.
pub static MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__\[(\d+)\]__").expect("valid marker regex"));

/// `__[N]__` -- never valid Python, so it cannot collide with real code.
pub fn marker(ordinal: usize) -> String {
    format!("__[{ordinal}]__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_format_matches_regex() {
        let m = marker(12);
        assert_eq!(m, "__[12]__");
        let caps = MARKER_RE.captures(&m).unwrap();
        assert_eq!(&caps[1], "12");
    }

    #[test]
    fn test_end_line_counts_embedded_newlines() {
        let c = BlankCandidate::new("a = (1,\n     2)", Category::PointerAssign, 4, Some(0));
        assert_eq!(c.end_line(), 5);
        assert_eq!(c.region, GLOBAL_REGION);
    }
}
