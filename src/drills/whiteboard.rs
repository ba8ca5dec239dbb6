//! Whiteboard recall drills (mode 3): rewrite each section from its header.

use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::{AnswerKey, DrillMode, DrillSession};
use crate::engine::{segment, SectionKind};

pub const KIND: &str = "implementation_challenge";

#[derive(Debug, Clone, Serialize)]
struct Challenge {
  signature: String,
  body: String,
  line_num: usize,
  #[serde(rename = "type")]
  kind: SectionKind,
}

#[instrument(target = "drill", level = "debug", skip_all, fields(source_len = source.len()))]
pub fn build_whiteboard(source: &str) -> DrillSession {
  let challenges: Vec<Challenge> = segment(source)
    .into_iter()
    .map(|s| Challenge {
      signature: s.signature().to_string(),
      body: s.body_text(),
      line_num: s.start_line,
      kind: s.kind,
    })
    .collect();

  let question = challenges
    .iter()
    .enumerate()
    .map(|(i, c)| format!("[Challenge {}] {}", i + 1, c.signature))
    .collect::<Vec<_>>()
    .join("\n");

  let mut key = AnswerKey::new(KIND)
    .with_meta("challenges", &challenges)
    .with_meta("original_code", source);
  for (i, c) in challenges.iter().enumerate() {
    key.insert_answer(i + 1, c.body.clone());
  }

  info!(target: "drill", challenges = challenges.len(), "whiteboard challenges generated");
  DrillSession::new(DrillMode::WhiteboardChallenge.code(), question, source, source, key)
}
