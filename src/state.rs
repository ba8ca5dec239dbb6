//! Application state: drill configuration and the optional model client.
//!
//! Sessions are returned to the client and never stored, so the state is
//! read-only after startup and shared behind an `Arc`.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_drill_config_from_env, DrillConfig};
use crate::openai::OpenAI;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DrillConfig>,
    pub openai: Option<OpenAI>,
}

impl AppState {
    /// Build state from env: load the TOML config (or defaults) and init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_drill_config_from_env().unwrap_or_default();
        info!(
            target: "code_drill",
            blank_counts = ?config.engine.blank_counts,
            regions = config.engine.region_weights.len(),
            "Engine configuration loaded"
        );

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "code_drill", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "code_drill", "OpenAI disabled (no OPENAI_API_KEY). Using the local engine only.");
        }

        Self::with_config(config, openai)
    }

    pub fn with_config(config: DrillConfig, openai: Option<OpenAI>) -> Self {
        Self { config: Arc::new(config), openai }
    }

    pub fn ai_enabled(&self) -> bool {
        self.openai.is_some()
    }
}
