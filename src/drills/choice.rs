//! Multiple-choice drills (mode 4): one question per selected blank, with
//! distractors drawn from the other candidates.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::domain::{AnswerKey, DrillMode, DrillSession};
use crate::engine::{distribute, extract, number_blanks, score, Blank, EngineError};

pub const KIND: &str = "multiple_choice";
pub const QUESTION_PROMPT: &str = "Which expression fills the blank in this code?";
const PLACEHOLDER: &str = "_____";
const CONTEXT_LINES: usize = 3;
const DISTRACTORS: usize = 3;
const FILLER_POOL: &[&str] = &["None", "True", "False", "self", "0", "1", "[]", "{}"];

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceOption {
  pub num: usize,
  pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceQuestion {
  pub num: usize,
  pub text: String,
  pub code: String,
  pub options: Vec<ChoiceOption>,
  /// 1-based option number of the right answer.
  pub correct: usize,
}

#[instrument(target = "drill", level = "debug", skip(source, cfg, rng), fields(source_len = source.len()))]
pub fn build_multiple_choice<R: Rng + ?Sized>(
  source: &str,
  questions: usize,
  cfg: &EngineConfig,
  rng: &mut R,
) -> Result<DrillSession, EngineError> {
  let mut extraction = extract(source, cfg);
  score(&mut extraction.candidates, &extraction.regions, cfg);
  // Multi-line answers make poor options.
  extraction.candidates.retain(|c| !c.text.contains('\n') && !c.text.trim().is_empty());

  let lines: Vec<&str> = source.split('\n').collect();
  let all_answers: BTreeSet<&str> = extraction.candidates.iter().map(|c| c.text.as_str()).collect();

  let picked = distribute(&extraction.candidates, questions, cfg, rng);
  let blanks = number_blanks(picked)?;

  let items: Vec<ChoiceQuestion> = blanks
    .iter()
    .map(|b| make_question(b, &lines, &all_answers, rng))
    .collect();

  let mut key = AnswerKey::new(KIND).with_meta("questions", &items);
  for q in &items {
    key.insert_answer(q.num, q.correct.to_string());
  }

  let question_text = items.iter().map(format_question).collect::<Vec<_>>().join("\n\n");
  let answer_text = items
    .iter()
    .map(|q| format!("Q{}: {}) {}", q.num, q.correct, q.options[q.correct - 1].text))
    .collect::<Vec<_>>()
    .join("\n");

  info!(target: "drill", questions = items.len(), pool = all_answers.len(), "multiple choice generated");
  Ok(DrillSession::new(DrillMode::MultipleChoice.code(), question_text, answer_text, source, key))
}

fn make_question<R: Rng + ?Sized>(
  blank: &Blank,
  lines: &[&str],
  all_answers: &BTreeSet<&str>,
  rng: &mut R,
) -> ChoiceQuestion {
  let correct = blank.candidate.text.as_str();

  let mut pool: Vec<&str> = all_answers.iter().copied().filter(|a| *a != correct).collect();
  if pool.len() < DISTRACTORS {
    for &filler in FILLER_POOL {
      if filler != correct && !pool.contains(&filler) {
        pool.push(filler);
      }
    }
  }
  let mut choices: Vec<&str> = pool.choose_multiple(rng, DISTRACTORS).copied().collect();
  choices.push(correct);
  choices.shuffle(rng);
  let correct_at = choices.iter().position(|c| *c == correct).map_or(1, |i| i + 1);

  ChoiceQuestion {
    num: blank.ordinal,
    text: QUESTION_PROMPT.to_string(),
    code: context_with_placeholder(blank, lines),
    options: choices
      .into_iter()
      .enumerate()
      .map(|(i, text)| ChoiceOption { num: i + 1, text: text.to_string() })
      .collect(),
    correct: correct_at,
  }
}

/// Up to three lines either side of the blank, with the answer replaced.
fn context_with_placeholder(blank: &Blank, lines: &[&str]) -> String {
  let cand = &blank.candidate;
  let idx = cand.line.saturating_sub(1).min(lines.len().saturating_sub(1));
  let start = idx.saturating_sub(CONTEXT_LINES);
  let end = (idx + CONTEXT_LINES + 1).min(lines.len());

  lines[start..end]
    .iter()
    .enumerate()
    .map(|(offset, line)| {
      if start + offset != idx {
        return line.to_string();
      }
      let at = cand
        .column
        .filter(|&c| line.get(c..c + cand.text.len()) == Some(cand.text.as_str()))
        .or_else(|| line.find(&cand.text));
      match at {
        Some(c) => format!("{}{}{}", &line[..c], PLACEHOLDER, &line[c + cand.text.len()..]),
        None => line.to_string(),
      }
    })
    .collect::<Vec<_>>()
    .join("\n")
}

fn format_question(q: &ChoiceQuestion) -> String {
  let options = q
    .options
    .iter()
    .map(|o| format!("  {}) {}", o.num, o.text))
    .collect::<Vec<_>>()
    .join("\n");
  format!("Q{}. {}\n{}\n{}", q.num, q.text, q.code, options)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  const SRC: &str = "def walk(head):\n    current = head\n    count = 0\n    while current is not None:\n        count += 1\n        current = current.next\n    if count == 0:\n        return None\n    return count\n";

  #[test]
  fn test_each_question_has_the_correct_option() {
    let mut rng = StdRng::seed_from_u64(4);
    let s = build_multiple_choice(SRC, 10, &EngineConfig::default(), &mut rng).unwrap();
    assert!(s.item_count() > 0);
    let key = serde_json::to_value(s.answer_key()).unwrap();
    let questions = key["_questions"].as_array().unwrap();
    assert_eq!(questions.len(), s.item_count());
    for q in questions {
      let options = q["options"].as_array().unwrap();
      assert!(options.len() >= 2 && options.len() <= 4);
      let correct = q["correct"].as_u64().unwrap() as usize;
      assert_eq!(key[q["num"].to_string()], correct.to_string());
      assert!(q["code"].as_str().unwrap().contains(PLACEHOLDER));
      let texts: BTreeSet<&str> = options.iter().map(|o| o["text"].as_str().unwrap()).collect();
      assert_eq!(texts.len(), options.len(), "options must be distinct");
    }
  }

  #[test]
  fn test_small_pool_is_padded_with_fillers() {
    let src = "def f(node):\n    return node.next\n";
    let mut rng = StdRng::seed_from_u64(2);
    let s = build_multiple_choice(src, 10, &EngineConfig::default(), &mut rng).unwrap();
    let key = serde_json::to_value(s.answer_key()).unwrap();
    let options = key["_questions"][0]["options"].as_array().unwrap();
    assert_eq!(options.len(), 4);
    assert!(options.iter().any(|o| o["text"] == "node.next"));
  }

  #[test]
  fn test_context_window_replaces_answer() {
    let lines: Vec<&str> = SRC.split('\n').collect();
    let blank = Blank {
      ordinal: 1,
      candidate: crate::engine::BlankCandidate::new("count", crate::engine::Category::Return, 9, Some(11)),
    };
    let ctx = context_with_placeholder(&blank, &lines);
    assert!(ctx.ends_with("    return _____\n"));
    assert!(ctx.starts_with("        current = current.next"));
  }
}
