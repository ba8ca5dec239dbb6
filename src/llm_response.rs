//! Turn a model reply into a `DrillSession`.
//!
//! The reply is expected to hold a question code block, an answer code block
//! and a ```json answer key (modes 1-3), or a markdown problem set ending in an
//! answer sheet (mode 4). `_____` placeholders are numbered as `__[N]__`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{AnswerKey, DrillMode, DrillSession};
use crate::engine::marker;

const PLACEHOLDER: &str = "_____";
const ANSWER_SHEET_HEADINGS: &[&str] = &["### Answer Sheet", "### 🔓 정답 확인"];

static JSON_BLOCK: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("valid json block regex"));
static CODE_BLOCK: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)```(?:\w+)?\s*(.*?)```").expect("valid code block regex"));
static BLOCK_TITLE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^#\s*(Question|Answer) Block\s*\n").expect("valid block title regex"));

pub fn parse_llm_response(reply: &str, mode: DrillMode, original: &str) -> Result<DrillSession, String> {
  if reply.trim().is_empty() {
    return Err("model returned an empty reply".into());
  }
  match mode {
    DrillMode::InlineBlankEasy | DrillMode::InlineBlankHard | DrillMode::WhiteboardChallenge => {
      parse_code_blocks(reply, mode, original)
    }
    DrillMode::MultipleChoice => Ok(parse_problem_set(reply, original)),
    _ => Err(format!("mode {} is not generated by the model", mode.code())),
  }
}

fn parse_code_blocks(reply: &str, mode: DrillMode, original: &str) -> Result<DrillSession, String> {
  let json_key = JSON_BLOCK
    .captures(reply)
    .and_then(|c| match serde_json::from_str::<Value>(&c[1]) {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(target: "llm", error = %e, "answer key block is not valid JSON");
        None
      }
    });

  let blocks: Vec<String> = CODE_BLOCK
    .captures_iter(reply)
    .map(|c| c[1].to_string())
    .filter(|b| {
      let t = b.trim();
      !(t.starts_with('{') && t.ends_with('}') && serde_json::from_str::<Value>(t).is_ok())
    })
    .map(|b| BLOCK_TITLE.replace(&b, "").into_owned())
    .collect();

  let (question, answer) = match blocks.as_slice() {
    [] => return Err("model reply has no code block".into()),
    [q] => (q.clone(), "The model did not return an answer block.".to_string()),
    [q, a, ..] => (q.clone(), a.clone()),
  };
  let (question, blank_count) = number_placeholders(&question);

  let kind = match mode {
    DrillMode::WhiteboardChallenge => "implementation_challenge",
    _ => "fill_in_blank_inline",
  };
  let mut key = AnswerKey::new(kind)
    .with_meta("source", "ai")
    .with_meta("original_code", original);

  let answers = json_key.as_ref().map(flatten_answer_key).unwrap_or_default();
  if answers.is_empty() && blank_count > 0 {
    key = key.with_meta("answer_key_missing", true);
    for n in 1..=blank_count {
      key.insert_answer(n, format!("[answer #{n}]"));
    }
  }
  for (n, text) in answers {
    key.insert_answer(n, text);
  }

  debug!(target: "llm", blanks = blank_count, answers = key.len(), "model reply parsed");
  Ok(DrillSession::new(mode.code(), question, answer, original, key))
}

fn parse_problem_set(reply: &str, original: &str) -> DrillSession {
  let split = ANSWER_SHEET_HEADINGS
    .iter()
    .find_map(|h| reply.find(h).map(|at| (at, *h)));

  let (question, answer) = match split {
    Some((at, heading)) => (
      reply[..at].trim().to_string(),
      format!("{heading}\n{}", reply[at + heading.len()..].trim()),
    ),
    None => (reply.trim().to_string(), "The model did not return an answer sheet.".to_string()),
  };

  let mut key = AnswerKey::new("problem_set").with_meta("source", "ai");
  if let Some(v) = JSON_BLOCK
    .captures(reply)
    .and_then(|c| serde_json::from_str::<Value>(&c[1]).ok())
  {
    for (n, text) in flatten_answer_key(&v) {
      key.insert_answer(n, text);
    }
  }
  DrillSession::new(DrillMode::MultipleChoice.code(), question, answer, original, key)
}

/// Replace each `_____` with the next numbered marker.
fn number_placeholders(text: &str) -> (String, usize) {
  let mut out = String::with_capacity(text.len());
  let mut count = 0;
  let mut rest = text;
  while let Some(at) = rest.find(PLACEHOLDER) {
    count += 1;
    out.push_str(&rest[..at]);
    out.push_str(&marker(count));
    rest = &rest[at + PLACEHOLDER.len()..];
    // Longer underscore runs count as one placeholder.
    rest = rest.trim_start_matches('_');
  }
  out.push_str(rest);
  (out, count)
}

/// `{"1": "x"}`, `{"Q2": "B"}` or `{"answer_key": {...}}` -> ordinal answers.
fn flatten_answer_key(v: &Value) -> Vec<(usize, String)> {
  let obj = match v.get("answer_key") {
    Some(inner @ Value::Object(_)) => inner,
    _ => v,
  };
  let Some(map) = obj.as_object() else {
    return Vec::new();
  };
  map
    .iter()
    .filter_map(|(k, val)| {
      let digits: String = k.chars().filter(|c| c.is_ascii_digit()).collect();
      let n = digits.parse::<usize>().ok().filter(|n| *n > 0)?;
      let text = match val {
        Value::String(s) => s.clone(),
        other => other.to_string(),
      };
      Some((n, text))
    })
    .collect()
}
