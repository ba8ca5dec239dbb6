//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{extract::State, Json, response::IntoResponse};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::DrillMode;
use crate::logic::generate_session;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, ai_enabled: state.ai_enabled() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_modes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let modes = DrillMode::ALL
    .iter()
    .map(|m| {
      let ai = state.ai_enabled() && state.config.prompts.for_mode(m.code()).is_some();
      ModeOut::new(*m, ai)
    })
    .collect();
  Json(ModesOut { modes })
}

#[instrument(level = "info", skip(state, body), fields(mode = ?body.mode, content_len = body.content.len(), method = %body.method))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> impl IntoResponse {
  let (content, req, requested) = body.into_parts();
  let (session, method) = generate_session(&state, content, req, requested).await;
  let session_id = Uuid::new_v4().to_string();
  let items = session.item_count();
  let degraded = session.is_degraded();
  info!(target: "code_drill", %session_id, mode = session.mode(), %requested, %method, items, degraded, "HTTP session generated");
  Json(GenerateOut { session_id, method, items, degraded, session })
}
