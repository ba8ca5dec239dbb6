//! Domain models used by the backend: drill modes, answer keys, and the drill session itself.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Which kind of drill is generated from the input text?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrillMode {
  /// Inline blanks, easy tier by default.
  InlineBlankEasy,
  /// Inline blanks, normal tier by default.
  InlineBlankHard,
  /// Rewrite each section from its signature.
  WhiteboardChallenge,
  MultipleChoice,
  DefinitionQuiz,
  VocabularyCards,
}

impl DrillMode {
  pub const ALL: [DrillMode; 6] = [
    DrillMode::InlineBlankEasy,
    DrillMode::InlineBlankHard,
    DrillMode::WhiteboardChallenge,
    DrillMode::MultipleChoice,
    DrillMode::DefinitionQuiz,
    DrillMode::VocabularyCards,
  ];

  pub fn from_code(code: i64) -> Option<Self> {
    match code {
      1 => Some(Self::InlineBlankEasy),
      2 => Some(Self::InlineBlankHard),
      3 => Some(Self::WhiteboardChallenge),
      4 => Some(Self::MultipleChoice),
      5 => Some(Self::DefinitionQuiz),
      7 => Some(Self::VocabularyCards),
      _ => None,
    }
  }

  pub fn code(self) -> u8 {
    match self {
      Self::InlineBlankEasy => 1,
      Self::InlineBlankHard => 2,
      Self::WhiteboardChallenge => 3,
      Self::MultipleChoice => 4,
      Self::DefinitionQuiz => 5,
      Self::VocabularyCards => 7,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::InlineBlankEasy => "inline-blank-easy",
      Self::InlineBlankHard => "inline-blank-hard",
      Self::WhiteboardChallenge => "whiteboard-challenge",
      Self::MultipleChoice => "multiple-choice",
      Self::DefinitionQuiz => "definition-quiz",
      Self::VocabularyCards => "vocabulary-cards",
    }
  }

  /// Difficulty tier used when the request names neither a tier nor a count.
  pub fn default_tier(self) -> u8 {
    match self {
      Self::InlineBlankEasy => 1,
      _ => 2,
    }
  }
}

/// How a session was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
  #[default]
  Local,
  Ai,
}

impl std::fmt::Display for GenerationMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::Local => "local",
      Self::Ai => "ai",
    })
  }
}

/// Ordinal answers plus `_`-prefixed metadata.
///
/// Serializes as a flat JSON object: `_type`, `_total`, every metadata entry,
/// then `"1".."N"`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnswerKey {
  kind: String,
  answers: BTreeMap<usize, String>,
  meta: BTreeMap<String, Value>,
}

impl AnswerKey {
  pub fn new(kind: impl Into<String>) -> Self {
    Self { kind: kind.into(), ..Self::default() }
  }

  pub fn insert_answer(&mut self, ordinal: usize, answer: impl Into<String>) {
    self.answers.insert(ordinal, answer.into());
  }

  /// Attach metadata; `key` gets a leading `_` if it lacks one.
  pub fn with_meta(mut self, key: &str, value: impl Serialize) -> Self {
    let key = if key.starts_with('_') { key.to_string() } else { format!("_{key}") };
    self.meta.insert(key, serde_json::to_value(value).unwrap_or(Value::Null));
    self
  }

  pub fn kind(&self) -> &str { &self.kind }
  pub fn answers(&self) -> &BTreeMap<usize, String> { &self.answers }
  pub fn len(&self) -> usize { self.answers.len() }
  #[allow(dead_code)]
  pub fn is_empty(&self) -> bool { self.answers.is_empty() }
}

#[cfg(test)]
impl AnswerKey {
  pub fn answer(&self, ordinal: usize) -> Option<&str> { self.answers.get(&ordinal).map(String::as_str) }
  pub fn meta(&self, key: &str) -> Option<&Value> { self.meta.get(key) }
}

impl Serialize for AnswerKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(2 + self.meta.len() + self.answers.len()))?;
    map.serialize_entry("_type", &self.kind)?;
    map.serialize_entry("_total", &self.answers.len())?;
    for (k, v) in &self.meta {
      if k != "_type" && k != "_total" {
        map.serialize_entry(k, v)?;
      }
    }
    for (n, answer) in &self.answers {
      map.serialize_entry(&n.to_string(), answer)?;
    }
    map.end()
  }
}

/// The unit returned to clients. Immutable after construction.
#[derive(Clone, Debug, Serialize)]
pub struct DrillSession {
  mode: i64,
  question_text: String,
  answer_text: String,
  original_text: String,
  answer_key: AnswerKey,
}

impl DrillSession {
  pub fn new(
    mode: impl Into<i64>,
    question_text: impl Into<String>,
    answer_text: impl Into<String>,
    original_text: impl Into<String>,
    answer_key: AnswerKey,
  ) -> Self {
    Self {
      mode: mode.into(),
      question_text: question_text.into(),
      answer_text: answer_text.into(),
      original_text: original_text.into(),
      answer_key,
    }
  }

  pub fn mode(&self) -> i64 { self.mode }

  /// Number of drill items (answers) in the session.
  pub fn item_count(&self) -> usize { self.answer_key.len() }

  pub fn is_degraded(&self) -> bool { self.answer_key.kind() == "error" }
}

#[cfg(test)]
impl DrillSession {
  pub fn question_text(&self) -> &str { &self.question_text }
  pub fn answer_text(&self) -> &str { &self.answer_text }
  pub fn original_text(&self) -> &str { &self.original_text }
  pub fn answer_key(&self) -> &AnswerKey { &self.answer_key }
}
