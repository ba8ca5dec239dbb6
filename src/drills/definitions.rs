//! Definition quizzes (mode 5) from already-formatted notes.
//!
//! Accepted layouts:
//! - `term,definition` on one line (split at the first comma)
//! - term and definition on alternating lines

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::{AnswerKey, DrillMode, DrillSession};

pub const KIND: &str = "definition_quiz";

/// A line that starts like a new term, e.g. `Overloading (`.
static TERM_LIKE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[가-힣a-zA-Z]+\s*\(").expect("valid term regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
  pub term: String,
  pub definition: String,
}

pub fn parse_definitions(content: &str) -> Vec<Definition> {
  let lines: Vec<&str> = content.trim().split('\n').map(str::trim).collect();

  let comma: Vec<Definition> = lines
    .iter()
    .filter_map(|line| {
      let (term, definition) = line.split_once(',')?;
      let (term, definition) = (term.trim(), definition.trim());
      (!term.is_empty() && !definition.is_empty()).then(|| Definition {
        term: term.to_string(),
        definition: definition.to_string(),
      })
    })
    .collect();
  if !comma.is_empty() {
    return comma;
  }

  let mut out = Vec::new();
  let mut i = 0;
  while i < lines.len() {
    let term = lines[i];
    if term.is_empty() {
      i += 1;
      continue;
    }
    if let Some(definition) = lines.get(i + 1) {
      if !definition.is_empty() && !TERM_LIKE.is_match(definition) {
        out.push(Definition {
          term: term.to_string(),
          definition: definition.to_string(),
        });
        i += 2;
        continue;
      }
    }
    i += 1;
  }
  out
}

#[instrument(target = "drill", level = "debug", skip_all, fields(content_len = content.len()))]
pub fn build_definition_quiz(content: &str) -> DrillSession {
  let definitions = parse_definitions(content);
  debug!(target: "drill", count = definitions.len(), "definitions parsed");

  let mut key = AnswerKey::new(KIND).with_meta("definitions", &definitions);
  for (i, d) in definitions.iter().enumerate() {
    key.insert_answer(i + 1, d.definition.clone());
  }

  let question = definitions
    .iter()
    .enumerate()
    .map(|(i, d)| format!("{}. {}", i + 1, d.term))
    .collect::<Vec<_>>()
    .join("\n");
  let answer = definitions
    .iter()
    .enumerate()
    .map(|(i, d)| format!("{}. {}: {}", i + 1, d.term, d.definition))
    .collect::<Vec<_>>()
    .join("\n");

  DrillSession::new(DrillMode::DefinitionQuiz.code(), question, answer, content, key)
}
