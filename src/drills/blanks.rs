//! Inline fill-in-the-blank drills (modes 1 and 2).

use rand::Rng;
use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::domain::{AnswerKey, DrillMode, DrillSession};
use crate::engine::{distribute, extract, number_blanks, render, restore_markers, score, EngineError};

pub const KIND: &str = "fill_in_blank_inline";

#[instrument(target = "drill", level = "debug", skip(source, cfg, rng), fields(source_len = source.len()))]
pub fn build_inline_blanks<R: Rng + ?Sized>(
  source: &str,
  mode: DrillMode,
  target: usize,
  cfg: &EngineConfig,
  rng: &mut R,
) -> Result<DrillSession, EngineError> {
  let mut extraction = extract(source, cfg);
  score(&mut extraction.candidates, &extraction.regions, cfg);

  let picked = distribute(&extraction.candidates, target, cfg, rng);
  let blanks = number_blanks(picked)?;
  let rendered = render(source, &blanks)?;

  let mut key = AnswerKey::new(KIND)
    .with_meta("blanks", &blanks)
    .with_meta("placements", &rendered.placements)
    .with_meta("original_code", source)
    .with_meta("fallback", extraction.used_fallback());
  if let Some(diag) = &extraction.diagnostic {
    key = key.with_meta("diagnostic", diag.to_string());
  }
  for b in &blanks {
    key.insert_answer(b.ordinal, b.candidate.text.clone());
  }
  let round_trip = restore_markers(&rendered.text, key.answers()) == source;
  if !round_trip {
    warn!(target: "drill", blanks = blanks.len(), "filled-in question does not reproduce the source");
  }
  key = key.with_meta("round_trip", round_trip);

  info!(
    target: "drill",
    candidates = extraction.candidates.len(),
    blanks = blanks.len(),
    target,
    fallback = extraction.used_fallback(),
    "inline blanks generated"
  );
  Ok(DrillSession::new(mode.code(), rendered.text, source, source, key))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::MARKER_RE;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  const LINKED_LIST: &str = r#"class Node:
    def __init__(self, data):
        self.data = data
        self.link = None

class LinkedList:
    def __init__(self):
        self.head = None

    def appendNode(self, data):
        newNode = Node(data)
        if self.head is None:
            self.head = newNode
            return
        current = self.head
        while current.link is not None:
            current = current.link
        current.link = newNode

    def deleteNode(self, data):
        pre = None
        current = self.head
        while current is not None and current.data != data:
            pre = current
            current = current.link
        if current is None:
            return False
        if pre is None:
            self.head = current.link
        else:
            pre.link = current.link
        return True

    def printNodes(self):
        current = self.head
        items = []
        for item in self.iterate(current):
            items.append(str(item))
        return " -> ".join(items)
"#;

  #[test]
  fn test_example_answer_key() {
    let src = "def f(x):\n    if x > 0:\n        return x\n    else:\n        return -x";
    let mut rng = StdRng::seed_from_u64(42);
    let s = build_inline_blanks(src, DrillMode::InlineBlankEasy, 2, &EngineConfig::default(), &mut rng).unwrap();
    let key = serde_json::to_value(s.answer_key()).unwrap();
    assert_eq!(key["1"], "x > 0");
    assert_eq!(key["2"], "-x");
    assert_eq!(key["_total"], 2);
    assert_eq!(key["_type"], KIND);
    assert_eq!(s.question_text(), "def f(x):\n    if __[1]__:\n        return x\n    else:\n        return __[2]__");
  }

  #[test]
  fn test_round_trip_restores_source() {
    for seed in 0..10 {
      let mut rng = StdRng::seed_from_u64(seed);
      let s = build_inline_blanks(LINKED_LIST, DrillMode::InlineBlankHard, 50, &EngineConfig::default(), &mut rng)
        .unwrap();
      assert_eq!(restore_markers(s.question_text(), s.answer_key().answers()), LINKED_LIST);
      assert_eq!(s.answer_key().meta("_round_trip"), Some(&serde_json::Value::Bool(true)));
    }
  }

  #[test]
  fn test_ordinals_are_contiguous_and_unique() {
    let mut rng = StdRng::seed_from_u64(9);
    let s = build_inline_blanks(LINKED_LIST, DrillMode::InlineBlankHard, 12, &EngineConfig::default(), &mut rng)
      .unwrap();
    let n = s.item_count();
    assert!(n > 0 && n <= 12);
    let mut seen: Vec<usize> = MARKER_RE
      .captures_iter(s.question_text())
      .map(|c| c[1].parse().unwrap())
      .collect();
    seen.sort_unstable();
    assert_eq!(seen, (1..=n).collect::<Vec<_>>());
  }

  #[test]
  fn test_same_seed_same_session() {
    let cfg = EngineConfig::default();
    let a = build_inline_blanks(LINKED_LIST, DrillMode::InlineBlankEasy, 8, &cfg, &mut StdRng::seed_from_u64(3)).unwrap();
    let b = build_inline_blanks(LINKED_LIST, DrillMode::InlineBlankEasy, 8, &cfg, &mut StdRng::seed_from_u64(3)).unwrap();
    assert_eq!(a.question_text(), b.question_text());
    assert_eq!(a.answer_key(), b.answer_key());
  }

  #[test]
  fn test_unparsable_source_uses_fallback_tokens() {
    let src = "def broken(:\n    total = alpha + beta\n    return total\n";
    let mut rng = StdRng::seed_from_u64(1);
    let s = build_inline_blanks(src, DrillMode::InlineBlankEasy, 30, &EngineConfig::default(), &mut rng).unwrap();
    let key = serde_json::to_value(s.answer_key()).unwrap();
    assert_eq!(key["_fallback"], true);
    assert!(key["_diagnostic"].as_str().unwrap().contains("line"));
    assert!(s.item_count() > 0);
    assert_eq!(restore_markers(s.question_text(), s.answer_key().answers()), src);
  }

  #[test]
  fn test_no_candidates_is_an_empty_drill() {
    let mut rng = StdRng::seed_from_u64(1);
    let s = build_inline_blanks("import os\n", DrillMode::InlineBlankEasy, 30, &EngineConfig::default(), &mut rng)
      .unwrap();
    assert_eq!(s.item_count(), 0);
    assert_eq!(s.question_text(), "import os\n");
  }
}
