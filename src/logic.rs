//! Core generation behavior behind the HTTP handlers.
//!
//! The model path is tried first when requested and available; any failure
//! there falls back to the local engine, which always produces a session.

use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{error, info, instrument, warn};

use crate::domain::{DrillMode, DrillSession, GenerationMethod};
use crate::llm_response::parse_llm_response;
use crate::session::{build_local_session, degraded_session, GenerationRequest};
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state, content), fields(content_len = content.len(), mode = req.mode, %method))]
pub async fn generate_session(
  state: &AppState,
  content: String,
  req: GenerationRequest,
  method: GenerationMethod,
) -> (DrillSession, GenerationMethod) {
  if method == GenerationMethod::Ai {
    if let Some(session) = try_model(state, &content, &req).await {
      return (session, GenerationMethod::Ai);
    }
  }
  (generate_local(state, content, req).await, GenerationMethod::Local)
}

async fn try_model(state: &AppState, content: &str, req: &GenerationRequest) -> Option<DrillSession> {
  let Some(oa) = &state.openai else {
    warn!(target: "llm", "OPENAI_API_KEY not set; using local generator");
    return None;
  };
  let mode = DrillMode::from_code(req.mode)
    .filter(|m| state.config.prompts.for_mode(m.code()).is_some());
  let Some(mode) = mode else {
    info!(target: "llm", mode = req.mode, "mode is not served by the model; using local generator");
    return None;
  };

  let difficulty = req.difficulty.unwrap_or_else(|| mode.default_tier());
  match oa.generate_drill(&state.config.prompts, mode.code(), difficulty, content).await {
    Ok(reply) => match parse_llm_response(&reply, mode, content) {
      Ok(session) => Some(session),
      Err(e) => {
        warn!(target: "llm", error = %e, reply = %trunc_for_log(&reply, 200), "unusable model reply; using local generator");
        None
      }
    },
    Err(e) => {
      error!(target: "llm", error = %e, "model generation failed; using local generator");
      None
    }
  }
}

/// Run the CPU-bound local engine off the async runtime.
pub async fn generate_local(state: &AppState, content: String, req: GenerationRequest) -> DrillSession {
  let config = state.config.clone();
  let mode = req.mode;
  let content: Arc<str> = Arc::from(content);
  let input = Arc::clone(&content);
  let task = tokio::task::spawn_blocking(move || build_local_session(&input, &req, &config.engine));
  settle(task.await, mode, &content)
}

fn settle(joined: Result<DrillSession, JoinError>, mode: i64, content: &str) -> DrillSession {
  match joined {
    Ok(session) => session,
    Err(e) => {
      error!(target: "drill", error = %e, "local generation task failed");
      degraded_session(mode, content, &format!("generation task failed: {e}"))
    }
  }
}
