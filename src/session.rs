//! Session assembler: the single place where engine failures become a
//! degraded session instead of an error.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, instrument, warn};

use crate::config::EngineConfig;
use crate::domain::{AnswerKey, DrillMode, DrillSession};
use crate::drills::{
  build_definition_quiz, build_existing_quiz, build_inline_blanks, build_multiple_choice, build_vocabulary_cards,
  build_whiteboard, is_existing_quiz,
};
use crate::engine::EngineError;

pub const DEGRADED_QUESTION: &str = "This drill could not be generated. The answer view explains why.";

/// Parameters of one local generation call.
#[derive(Clone, Debug, Default)]
pub struct GenerationRequest {
  /// Raw mode code; anything outside `DrillMode` yields an unsupported session.
  pub mode: i64,
  /// Tier 1..=4; ignored when `blank_count` is set.
  pub difficulty: Option<u8>,
  pub blank_count: Option<usize>,
  pub seed: Option<u64>,
}

/// Build a session with the local engine. Never fails and never panics out.
#[instrument(target = "drill", level = "info", skip(content, cfg), fields(content_len = content.len()))]
pub fn build_local_session(content: &str, req: &GenerationRequest, cfg: &EngineConfig) -> DrillSession {
  let seed = req.seed.unwrap_or_else(rand::random);
  guarded(req.mode, content, || assemble(content, req, cfg, seed))
}

fn assemble(content: &str, req: &GenerationRequest, cfg: &EngineConfig, seed: u64) -> Result<DrillSession, EngineError> {
  let Some(mode) = DrillMode::from_code(req.mode) else {
    warn!(target: "drill", mode = req.mode, "unsupported mode requested");
    return Ok(unsupported_session(req.mode, content));
  };
  if is_existing_quiz(content) {
    info!(target: "drill", mode = mode.label(), "input is an already-formatted quiz; loading it as-is");
    return Ok(build_existing_quiz(content, req.mode));
  }
  let mut rng = StdRng::seed_from_u64(seed);

  let session = match mode {
    DrillMode::InlineBlankEasy | DrillMode::InlineBlankHard => {
      let tier = req.difficulty.unwrap_or_else(|| mode.default_tier());
      let target = req.blank_count.unwrap_or_else(|| cfg.blank_count_for(tier));
      build_inline_blanks(content, mode, target, cfg, &mut rng)?
    }
    DrillMode::WhiteboardChallenge => build_whiteboard(content),
    DrillMode::MultipleChoice => {
      let questions = req.blank_count.unwrap_or(cfg.choice_questions);
      build_multiple_choice(content, questions, cfg, &mut rng)?
    }
    DrillMode::DefinitionQuiz => build_definition_quiz(content),
    DrillMode::VocabularyCards => build_vocabulary_cards(content),
  };
  info!(target: "drill", mode = mode.label(), seed, items = session.item_count(), "local session assembled");
  Ok(session)
}

/// Run `build`, flattening errors and panics into a degraded session.
pub fn guarded<F>(mode: i64, content: &str, build: F) -> DrillSession
where
  F: FnOnce() -> Result<DrillSession, EngineError>,
{
  match catch_unwind(AssertUnwindSafe(build)) {
    Ok(Ok(session)) => session,
    Ok(Err(e)) => {
      error!(target: "drill", mode, error = %e, "drill generation failed; returning degraded session");
      degraded_session(mode, content, &e.to_string())
    }
    Err(panic) => {
      let msg = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
      error!(target: "drill", mode, error = %msg, "drill generation panicked; returning degraded session");
      degraded_session(mode, content, &format!("internal error: {msg}"))
    }
  }
}

pub fn degraded_session(mode: i64, content: &str, message: &str) -> DrillSession {
  let key = AnswerKey::new("error").with_meta("error", message);
  DrillSession::new(mode, DEGRADED_QUESTION, message, content, key)
}

pub fn unsupported_session(mode: i64, content: &str) -> DrillSession {
  let text = format!("Mode {mode} is not supported.");
  let key = AnswerKey::new("unsupported_mode").with_meta("mode", mode);
  DrillSession::new(mode, text.clone(), text, content, key)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn req(mode: i64) -> GenerationRequest {
    GenerationRequest { mode, seed: Some(17), ..GenerationRequest::default() }
  }

  #[test]
  fn test_every_mode_survives_malformed_input() {
    let garbage = "def (:\n\t  ]]] '''\n\u{0}\u{7f} →→ ,,, ==\n    return";
    let cfg = EngineConfig::default();
    for mode in [1i64, 2, 3, 4, 5, 7] {
      let s = build_local_session(garbage, &req(mode), &cfg);
      assert_eq!(s.mode(), mode);
      assert_eq!(s.original_text(), garbage);
    }
  }

  #[test]
  fn test_malformed_code_reports_diagnostic() {
    let s = build_local_session("def broken(:\n    value = other\n", &req(1), &EngineConfig::default());
    let key = serde_json::to_value(s.answer_key()).unwrap();
    assert!(!key["_diagnostic"].as_str().unwrap_or_default().is_empty());
  }

  #[test]
  fn test_unknown_mode_is_unsupported_session() {
    let s = build_local_session("x = 1", &req(6), &EngineConfig::default());
    assert_eq!(s.answer_key().kind(), "unsupported_mode");
    assert!(s.question_text().contains("not supported"));
  }

  #[test]
  fn test_errors_and_panics_become_degraded_sessions() {
    let s = guarded(1, "src", || Err(EngineError::DuplicatePosition { line: 2, column: 4 }));
    assert!(s.is_degraded());
    assert_eq!(s.answer_text(), "two blanks share line 2, column 4");
    assert_eq!(s.answer_key().meta("_error").unwrap(), "two blanks share line 2, column 4");

    let s = guarded(2, "src", || panic!("boom"));
    assert!(s.is_degraded());
    assert!(s.answer_text().contains("boom"));
  }

  #[test]
  fn test_formatted_quiz_is_loaded_for_any_mode() {
    let quiz = "1. 다음 코드의 실행 결과는?\n   print(1 + 1)\n① 1\n② 2\n";
    for mode in [1i64, 3, 7] {
      let s = build_local_session(quiz, &req(mode), &EngineConfig::default());
      assert_eq!(s.answer_key().kind(), "parsed_quiz");
      assert_eq!(s.mode(), mode);
      assert_eq!(s.item_count(), 1);
    }
    let s = build_local_session(quiz, &req(6), &EngineConfig::default());
    assert_eq!(s.answer_key().kind(), "unsupported_mode");
  }

  #[test]
  fn test_blank_count_overrides_tier() {
    let src = "def f(a, b):\n    if a > b:\n        return a - b\n\n    while b < a:\n        b = b + 1\n\n    return b * 2\n";
    let mut r = req(2);
    r.blank_count = Some(1);
    let s = build_local_session(src, &r, &EngineConfig::default());
    assert_eq!(s.item_count(), 1);
  }
}
