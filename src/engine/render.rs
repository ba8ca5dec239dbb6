//! Inline renderer: replace each blank's text with its `__[N]__` marker.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use super::error::EngineError;
use super::{marker, Blank, MARKER_RE};

/// How a blank ended up in the rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Found at its recorded column.
    Exact,
    /// Recorded column drifted; first free occurrence on the line was used.
    Searched,
    /// Text not found; marker appended to the end of the line.
    Appended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedBlank {
    pub ordinal: usize,
    pub line: usize,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub text: String,
    /// Sorted by ordinal.
    pub placements: Vec<PlacedBlank>,
}

/// Substitute markers for `blanks` in `text`.
///
/// Blanks are applied from the bottom-right of the document upwards, so an
/// earlier blank's line and column are never disturbed by a later one. A
/// multi-line blank collapses the lines it spans into one.
pub fn render(text: &str, blanks: &[Blank]) -> Result<Rendered, EngineError> {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();

    let mut order: Vec<&Blank> = blanks.iter().collect();
    order.sort_by(|a, b| b.candidate.position().cmp(&a.candidate.position()));

    let mut placements = Vec::with_capacity(blanks.len());
    for blank in order {
        let cand = &blank.candidate;
        if cand.line == 0 || cand.line > lines.len() {
            return Err(EngineError::LineOutOfRange {
                ordinal: blank.ordinal,
                line: cand.line,
                lines: lines.len(),
            });
        }

        let first = cand.line - 1;
        let last = (cand.end_line() - 1).min(lines.len() - 1);
        let window = lines[first..=last].join("\n");
        let mark = marker(blank.ordinal);

        let exact = cand.column.and_then(|col| {
            let end = col + cand.text.len();
            (window.get(col..end) == Some(cand.text.as_str())).then_some(col..end)
        });
        let (placement, merged) = match exact {
            Some(range) => (Placement::Exact, splice(&window, range, &mark)),
            None => match find_free(&window, &cand.text) {
                Some(range) => (Placement::Searched, splice(&window, range, &mark)),
                None => (Placement::Appended, format!("{} {mark}", lines[first])),
            },
        };

        if placement == Placement::Appended {
            lines[first] = merged;
        } else {
            lines.splice(first..=last, std::iter::once(merged));
        }
        if placement != Placement::Exact {
            debug!(target: "drill", ordinal = blank.ordinal, line = cand.line, ?placement, "blank drifted from recorded position");
        }
        placements.push(PlacedBlank {
            ordinal: blank.ordinal,
            line: cand.line,
            placement,
        });
    }

    placements.sort_by_key(|p| p.ordinal);
    Ok(Rendered {
        text: lines.join("\n"),
        placements,
    })
}

fn splice(s: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(s.len() + replacement.len());
    out.push_str(&s[..range.start]);
    out.push_str(replacement);
    out.push_str(&s[range.end..]);
    out
}

/// First occurrence of `needle` that does not touch an existing marker.
fn find_free(haystack: &str, needle: &str) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    let taken: Vec<Range<usize>> = MARKER_RE.find_iter(haystack).map(|m| m.range()).collect();
    haystack
        .match_indices(needle)
        .map(|(at, _)| at..at + needle.len())
        .find(|r| !taken.iter().any(|t| r.start < t.end && t.start < r.end))
}

/// Put answers back in place of their markers. Markers without an answer are
/// left untouched.
pub fn restore_markers(text: &str, answers: &BTreeMap<usize, String>) -> String {
    MARKER_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| answers.get(&n))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BlankCandidate, Category};

    fn blank(ordinal: usize, text: &str, line: usize, column: Option<usize>) -> Blank {
        Blank {
            ordinal,
            candidate: BlankCandidate::new(text, Category::Condition, line, column),
        }
    }

    fn answers(blanks: &[Blank]) -> BTreeMap<usize, String> {
        blanks
            .iter()
            .map(|b| (b.ordinal, b.candidate.text.clone()))
            .collect()
    }

    #[test]
    fn test_render_example_function() {
        let src = "def f(x):\n    if x > 0:\n        return x\n    else:\n        return -x";
        let blanks = vec![blank(1, "x > 0", 2, Some(7)), blank(2, "-x", 5, Some(15))];
        let out = render(src, &blanks).unwrap();
        assert_eq!(
            out.text,
            "def f(x):\n    if __[1]__:\n        return x\n    else:\n        return __[2]__"
        );
        assert!(out.placements.iter().all(|p| p.placement == Placement::Exact));
        assert_eq!(restore_markers(&out.text, &answers(&blanks)), src);
    }

    #[test]
    fn test_two_blanks_on_one_line_keep_columns() {
        let src = "node.next = temp.next";
        let blanks = vec![blank(1, "node.next", 1, Some(0)), blank(2, "temp.next", 1, Some(12))];
        let out = render(src, &blanks).unwrap();
        assert_eq!(out.text, "__[1]__ = __[2]__");
        assert_eq!(restore_markers(&out.text, &answers(&blanks)), src);
    }

    #[test]
    fn test_drifted_column_falls_back_to_search() {
        let src = "a = 1\n  total = count + 1";
        let blanks = vec![blank(1, "count", 2, Some(3))];
        let out = render(src, &blanks).unwrap();
        assert_eq!(out.text, "a = 1\n  total = __[1]__ + 1");
        assert_eq!(out.placements[0].placement, Placement::Searched);
        assert_eq!(restore_markers(&out.text, &answers(&blanks)), src);
    }

    #[test]
    fn test_missing_text_is_appended() {
        let src = "x = 1";
        let out = render(src, &[blank(1, "missing", 1, Some(0))]).unwrap();
        assert_eq!(out.text, "x = 1 __[1]__");
        assert_eq!(out.placements[0].placement, Placement::Appended);
    }

    #[test]
    fn test_multi_line_blank_merges_lines() {
        let src = "if (alpha and\n        beta):\n    go()";
        let blanks = vec![blank(1, "(alpha and\n        beta)", 1, Some(3)), blank(2, "go()", 3, Some(4))];
        let out = render(src, &blanks).unwrap();
        assert_eq!(out.text, "if __[1]__:\n    __[2]__");
        assert_eq!(restore_markers(&out.text, &answers(&blanks)), src);
    }

    #[test]
    fn test_search_skips_existing_markers() {
        // "2" only occurs inside the marker placed for blank 2.
        let src = "x = y";
        let blanks = vec![blank(1, "2", 1, Some(0)), blank(2, "y", 1, Some(4))];
        let out = render(src, &blanks).unwrap();
        assert_eq!(out.text, "x = __[2]__ __[1]__");
        assert_eq!(out.placements[0].placement, Placement::Appended);
        assert_eq!(out.placements[1].placement, Placement::Exact);
    }

    #[test]
    fn test_each_ordinal_appears_once() {
        let src = "one\ntwo\nthree\nfour";
        let blanks: Vec<Blank> = ["one", "two", "three", "four"]
            .iter()
            .enumerate()
            .map(|(i, t)| blank(i + 1, t, i + 1, None))
            .collect();
        let out = render(src, &blanks).unwrap();
        for b in &blanks {
            assert_eq!(out.text.matches(&marker(b.ordinal)).count(), 1);
        }
        assert!(out.placements.iter().all(|p| p.placement == Placement::Searched));
    }

    #[test]
    fn test_line_out_of_range_is_error() {
        let err = render("x", &[blank(1, "x", 3, Some(0))]).unwrap_err();
        assert_eq!(
            err,
            EngineError::LineOutOfRange {
                ordinal: 1,
                line: 3,
                lines: 1
            }
        );
    }
}
