//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{DrillMode, DrillSession, GenerationMethod};
use crate::session::GenerationRequest;

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub content: String,
    /// Missing or non-integer codes become mode 0, which is unsupported.
    #[serde(default, deserialize_with = "lenient_int")]
    pub mode: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub difficulty: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub blank_count: Option<i64>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Defaults to the local engine.
    #[serde(default)]
    pub method: GenerationMethod,
}

impl GenerateIn {
    /// Split into the content and the engine-facing request.
    pub fn into_parts(self) -> (String, GenerationRequest, GenerationMethod) {
        let req = GenerationRequest {
            mode: self.mode.unwrap_or(0),
            difficulty: self.difficulty.map(|d| d.clamp(1, 4) as u8),
            blank_count: self.blank_count.and_then(|n| usize::try_from(n).ok()),
            seed: self.seed,
        };
        (self.content, req, self.method)
    }
}

/// Integers (or integer strings) pass through; any other value reads as absent.
fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_u64().map(|_| i64::MAX)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Serialize)]
pub struct GenerateOut {
    pub session_id: String,
    /// Method that actually produced the session (after any fallback).
    pub method: GenerationMethod,
    pub items: usize,
    pub degraded: bool,
    pub session: DrillSession,
}

#[derive(Debug, Serialize)]
pub struct ModeOut {
    pub code: u8,
    pub label: &'static str,
    pub default_difficulty: u8,
    pub ai_supported: bool,
}

impl ModeOut {
    pub fn new(mode: DrillMode, ai_supported: bool) -> Self {
        Self { code: mode.code(), label: mode.label(), default_difficulty: mode.default_tier(), ai_supported }
    }
}

#[derive(Serialize)]
pub struct ModesOut {
    pub modes: Vec<ModeOut>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub ai_enabled: bool,
}
