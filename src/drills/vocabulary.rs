//! Vocabulary flashcards (mode 7).
//!
//! Line layouts, tried in order:
//! - `word, meaning1, meaning2`
//! - `word -> meaning`, `word: meaning`, `word = meaning`, `word → meaning`
//! - a lone English word (meaning left for the model to fill in)

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::{AnswerKey, DrillMode, DrillSession};

pub const KIND: &str = "vocabulary_cards";
pub const NEEDS_AI_ANSWER: &str = "[needs AI generation]";

static LEADING_LATIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]").expect("valid regex"));
static LONE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]+$").expect("valid regex"));
static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*(?:->|→|[-:=])\s*").expect("valid regex"));

/// Loanwords that merely spell the English word in Hangul.
static TRANSLITERATIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
  [
    ("code", "코드"),
    ("interface", "인터페이스"),
    ("class", "클래스"),
    ("object", "오브젝트"),
    ("method", "메서드"),
    ("function", "펑션"),
    ("module", "모듈"),
    ("package", "패키지"),
    ("library", "라이브러리"),
    ("framework", "프레임워크"),
    ("server", "서버"),
    ("client", "클라이언트"),
    ("database", "데이터베이스"),
    ("process", "프로세스"),
    ("thread", "스레드"),
    ("memory", "메모리"),
    ("file", "파일"),
    ("system", "시스템"),
    ("program", "프로그램"),
    ("data", "데이터"),
    ("type", "타입"),
    ("list", "리스트"),
    ("array", "어레이"),
    ("string", "스트링"),
    ("integer", "인티저"),
    ("boolean", "불리언"),
    ("null", "널"),
    ("error", "에러"),
    ("debug", "디버그"),
    ("test", "테스트"),
    ("api", "에이피아이"),
    ("url", "유알엘"),
  ]
  .into_iter()
  .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyCard {
  pub word: String,
  pub meaning: String,
  pub needs_ai: bool,
}

/// True when `meaning` is just `word` written phonetically.
pub fn is_transliteration(word: &str, meaning: &str) -> bool {
  let word = word.to_lowercase();
  let meaning = meaning.trim();
  if TRANSLITERATIONS.get(word.as_str()) == Some(&meaning) {
    return true;
  }
  let meaning_len = meaning.chars().count();
  meaning_len <= 3 && word.chars().count() <= meaning_len * 2
}

fn parse_line(line: &str) -> Option<VocabularyCard> {
  if line.contains(',') {
    let mut parts = line.split(',');
    let word = parts.next().unwrap_or_default().trim();
    let meaning = parts.map(str::trim).filter(|p| !p.is_empty()).collect::<Vec<_>>().join(", ");
    if !word.is_empty() && !meaning.is_empty() && LEADING_LATIN.is_match(word) {
      return Some(VocabularyCard { word: word.to_string(), meaning, needs_ai: false });
    }
  }

  if let Some(m) = SEPARATOR.find(line) {
    let word = line[..m.start()].trim();
    let meaning = line[m.end()..].trim();
    if !word.is_empty()
      && !meaning.is_empty()
      && LEADING_LATIN.is_match(word)
      && !is_transliteration(word, meaning)
    {
      return Some(VocabularyCard {
        word: word.to_string(),
        meaning: meaning.to_string(),
        needs_ai: false,
      });
    }
  }

  LONE_WORD.is_match(line).then(|| VocabularyCard {
    word: line.to_string(),
    meaning: String::new(),
    needs_ai: true,
  })
}

pub fn parse_vocabulary(content: &str) -> Vec<VocabularyCard> {
  content
    .trim()
    .split('\n')
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .filter_map(parse_line)
    .collect()
}

#[instrument(target = "drill", level = "debug", skip_all, fields(content_len = content.len()))]
pub fn build_vocabulary_cards(content: &str) -> DrillSession {
  let cards = parse_vocabulary(content);
  let needs_ai = cards.iter().any(|c| c.needs_ai);
  debug!(target: "drill", count = cards.len(), needs_ai, "vocabulary parsed");

  let mut key = AnswerKey::new(KIND)
    .with_meta("words", &cards)
    .with_meta("needs_ai_generation", needs_ai);
  for (i, c) in cards.iter().enumerate() {
    let answer = if c.meaning.is_empty() { NEEDS_AI_ANSWER } else { c.meaning.as_str() };
    key.insert_answer(i + 1, answer);
  }

  let question = cards
    .iter()
    .enumerate()
    .map(|(i, c)| format!("{}. {}", i + 1, c.word))
    .collect::<Vec<_>>()
    .join("\n");
  let answer = cards
    .iter()
    .enumerate()
    .map(|(i, c)| {
      let meaning = if c.meaning.is_empty() { NEEDS_AI_ANSWER } else { c.meaning.as_str() };
      format!("{}. {} = {}", i + 1, c.word, meaning)
    })
    .collect::<Vec<_>>()
    .join("\n");

  DrillSession::new(DrillMode::VocabularyCards.code(), question, answer, content, key)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_comma_layout_joins_meanings() {
    let cards = parse_vocabulary("inheritance, 상속, 유산");
    assert_eq!(cards[0].word, "inheritance");
    assert_eq!(cards[0].meaning, "상속, 유산");
    assert!(!cards[0].needs_ai);
  }

  #[test]
  fn test_separator_layouts() {
    let cards = parse_vocabulary("abstract: 추상적인\nencapsulation -> 캡슐화하기\nrecursion → 재귀호출\nscope = 유효범위");
    let meanings: Vec<&str> = cards.iter().map(|c| c.meaning.as_str()).collect();
    assert_eq!(meanings, vec!["추상적인", "캡슐화하기", "재귀호출", "유효범위"]);
  }

  #[test]
  fn test_transliteration_is_rejected() {
    assert!(is_transliteration("interface", "인터페이스"));
    assert!(is_transliteration("api", "에이피"));
    assert!(!is_transliteration("abstract", "추상적인"));
    // Rejected as a pair, and not a lone word either.
    assert!(parse_vocabulary("code: 코드").is_empty());
  }

  #[test]
  fn test_lone_word_needs_ai() {
    let s = build_vocabulary_cards("polymorphism\n\n123\n");
    assert_eq!(s.item_count(), 1);
    assert_eq!(s.answer_key().answer(1), Some(NEEDS_AI_ANSWER));
    assert_eq!(s.answer_key().meta("_needs_ai_generation"), Some(&serde_json::Value::Bool(true)));
  }
}
