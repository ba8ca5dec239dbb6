//! Segmenter: split a document into structural sections for whiteboard drills.
//!
//! This is a line scanner, not a parser, so it also works on code that does
//! not compile.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^=!<>])=($|[^=])").expect("valid assignment regex"));

pub const GLOBAL_DECLARATIONS_LABEL: &str = "# global declarations";
pub const CODE_BLOCK_LABEL: &str = "# code block";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Function,
    Class,
    EntryPointBlock,
    CommentHeader,
    PlainCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralSection {
    pub kind: SectionKind,
    /// The header line as written; for `PlainCode` a synthetic label.
    pub header: String,
    pub body: Vec<String>,
    /// 1-based line of the first source line in this section.
    pub start_line: usize,
}

impl StructuralSection {
    /// The original lines this section covers, header included.
    #[cfg(test)]
    pub fn source_lines(&self) -> Vec<&str> {
        let body = self.body.iter().map(String::as_str);
        match self.kind {
            SectionKind::PlainCode => body.collect(),
            _ => std::iter::once(self.header.as_str()).chain(body).collect(),
        }
    }

    /// Body without leading/trailing blank lines; indentation is preserved.
    pub fn body_text(&self) -> String {
        let first = self.body.iter().position(|l| !l.trim().is_empty());
        let last = self.body.iter().rposition(|l| !l.trim().is_empty());
        match (first, last) {
            (Some(a), Some(b)) => self.body[a..=b].join("\n"),
            _ => String::new(),
        }
    }

    /// Header shown to the learner.
    pub fn signature(&self) -> &str {
        self.header.trim()
    }
}

/// Exact partition of `text`: concatenating every section's `source_lines()`
/// gives back the input lines.
pub fn split_sections(text: &str) -> Vec<StructuralSection> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut sections = Vec::new();
    let mut plain: Vec<String> = Vec::new();
    let mut plain_start = 1;

    let flush = |plain: &mut Vec<String>, start: usize, out: &mut Vec<StructuralSection>| {
        if plain.is_empty() {
            return;
        }
        let body = std::mem::take(plain);
        out.push(StructuralSection {
            kind: SectionKind::PlainCode,
            header: plain_label(&body).to_string(),
            body,
            start_line: start,
        });
    };

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let stripped = line.trim();

        let kind = if stripped.len() >= 2 && stripped.starts_with("##") && stripped.ends_with("##") {
            Some(SectionKind::CommentHeader)
        } else if stripped.starts_with("if __name__") && stripped.contains("__main__") {
            Some(SectionKind::EntryPointBlock)
        } else if stripped.starts_with("class ") {
            Some(SectionKind::Class)
        } else if stripped.starts_with("def ") || stripped.starts_with("async def ") {
            Some(SectionKind::Function)
        } else {
            None
        };

        let Some(kind) = kind else {
            if plain.is_empty() {
                plain_start = i + 1;
            }
            plain.push(line.to_string());
            i += 1;
            continue;
        };

        flush(&mut plain, plain_start, &mut sections);
        let start = i;
        i += 1;
        let body_end = match kind {
            SectionKind::CommentHeader => i,
            SectionKind::EntryPointBlock => lines.len(),
            _ => {
                let header_indent = indent_width(line);
                let mut end = i;
                while end < lines.len() && belongs_to_block(lines[end], header_indent) {
                    end += 1;
                }
                end
            }
        };
        sections.push(StructuralSection {
            kind,
            header: line.to_string(),
            body: lines[i..body_end].iter().map(|l| l.to_string()).collect(),
            start_line: start + 1,
        });
        i = body_end;
    }
    flush(&mut plain, plain_start, &mut sections);
    sections
}

/// Sections worth drilling: comment headers and blank-only sections dropped.
pub fn segment(text: &str) -> Vec<StructuralSection> {
    split_sections(text)
        .into_iter()
        .filter(|s| s.kind != SectionKind::CommentHeader && !s.body_text().is_empty())
        .collect()
}

fn belongs_to_block(line: &str, header_indent: usize) -> bool {
    let stripped = line.trim();
    stripped.is_empty()
        || indent_width(line) > header_indent
        || stripped.starts_with('#')
        || stripped.starts_with("\"\"\"")
        || stripped.starts_with("'''")
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 8 } else { 1 })
        .sum()
}

fn plain_label(body: &[String]) -> &'static str {
    let first = body.iter().map(|l| l.trim()).find(|l| !l.is_empty());
    match first {
        Some(l) if ASSIGNMENT.is_match(l) => GLOBAL_DECLARATIONS_LABEL,
        _ => CODE_BLOCK_LABEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "import os\n\nMAX = 10\n\n## Node ##\nclass Node:\n    def __init__(self, data):\n        self.data = data\n\ndef helper(x):\n    # doubles\n    return x * 2\nprint(helper(2))\n\nif __name__ == \"__main__\":\n    main()\n";

    #[test]
    fn test_raw_partition_reproduces_document() {
        let sections = split_sections(SRC);
        let rebuilt: Vec<&str> = sections.iter().flat_map(|s| s.source_lines()).collect();
        assert_eq!(rebuilt.join("\n"), SRC);
    }

    #[test]
    fn test_section_kinds_and_labels() {
        let sections = segment(SRC);
        let kinds: Vec<SectionKind> = sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::PlainCode,
                SectionKind::Class,
                SectionKind::Function,
                SectionKind::PlainCode,
                SectionKind::EntryPointBlock,
            ]
        );
        assert_eq!(sections[0].header, CODE_BLOCK_LABEL);
        assert_eq!(sections[1].signature(), "class Node:");
        assert_eq!(sections[1].start_line, 6);
        assert_eq!(sections[2].body_text(), "    # doubles\n    return x * 2");
        assert_eq!(sections[3].body_text(), "print(helper(2))");
        assert_eq!(sections[4].body_text(), "    main()");
    }

    #[test]
    fn test_global_declaration_label() {
        let sections = segment("count = 0\nnames = []\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].header, GLOBAL_DECLARATIONS_LABEL);
        let sections = segment("if a == b:\n    pass\n");
        assert_eq!(sections[0].header, CODE_BLOCK_LABEL);
    }

    #[test]
    fn test_header_only_function_is_dropped() {
        let sections = segment("def stub(): pass\n\nx = 1\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, SectionKind::PlainCode);
    }

    #[test]
    fn test_retained_sections_cover_all_non_blank_lines() {
        let kept: Vec<String> = segment(SRC)
            .iter()
            .flat_map(|s| s.source_lines().into_iter().map(str::to_string).collect::<Vec<_>>())
            .filter(|l| !l.trim().is_empty())
            .collect();
        let expected: Vec<&str> = SRC
            .split('\n')
            .filter(|l| !l.trim().is_empty() && *l != "## Node ##")
            .collect();
        assert_eq!(kept, expected);
    }
}
