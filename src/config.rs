//! Loading drill configuration (LLM prompts + engine tables) from TOML.
//!
//! See `DrillConfig`, `Prompts` and `EngineConfig` for the expected schema.
//! Every field has a default, so a partial file only overrides what it names.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{error, info};

use crate::engine::Category;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct DrillConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub engine: EngineConfig,
}

/// Prompts sent to the model service. `{difficulty}` and `{content}` are
/// substituted in `user_template`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub common_rules: String,
  pub mode1: String,
  pub mode2: String,
  pub mode3: String,
  pub mode4: String,
  pub user_template: String,
}

impl Prompts {
  /// Mode-specific system prompt; `None` for modes the model path does not serve.
  pub fn for_mode(&self, mode: u8) -> Option<&str> {
    match mode {
      1 => Some(&self.mode1),
      2 => Some(&self.mode2),
      3 => Some(&self.mode3),
      4 => Some(&self.mode4),
      _ => None,
    }
  }
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      common_rules: "!! CRITICAL INSTRUCTION\n\
- All final output (explanations, hints, order, headers) must be ENGLISH ONLY.\n\
- Never change source logic beyond required blanks/answers.\n\
- Keep the number and order of blanks stable; keep code structure intact.\n\
- Blank placeholder must be exactly `_____` (five underscores).\n\
- Provide three blocks in order: Question Block (code with blanks), Answer Block (code with answers), JSON answer key.".into(),
      mode1: "You are [MODE 1] OOP Fill-in-the-Blank Mode.\n\
Goal: produce balanced blanks focusing on control flow, return values, conditions, and core OOP logic.\n\
Blank volume by difficulty (hard cap = 70 blanks, never exceed 2 blanks per line):\n\
- Difficulty 1 (Easy): 28-35 blanks\n\
- Difficulty 2 (Normal): 35-48 blanks (default)\n\
- Difficulty 3 (Hard): 48-60 blanks\n\
- Difficulty 4 (Extreme): 60-70 blanks\n\
Distribution: split the code into top/middle/bottom thirds and keep each third between 20% and 45% of the blanks. \
Prefer control flow, returns, key operations and constructor wiring. Never blank punctuation, operators, brackets or comments. \
Keep indentation exactly as in the source.\n\
Output format: ```python # Question Block```, then ```python # Answer Block```, then ```json {\"1\": \"answer1\"}```.".into(),
      mode2: "You are [MODE 2] Data Structure Drill Mode. Target a hard but fair blank set with even coverage.\n\
Blank volume by difficulty (hard cap = 70 blanks, never exceed 2 blanks per line):\n\
- Difficulty 1 (Easy): 30-38 blanks\n\
- Difficulty 2 (Normal): 38-50 blanks (default)\n\
- Difficulty 3 (Hard): 50-62 blanks\n\
- Difficulty 4 (Extreme): 60-70 blanks\n\
Cover traversal hotspots (`node.next`, `head`, `prev`), loop conditions, returns and boundary checks. \
No third of the code may hold more than 45% or fewer than 20% of the blanks. Use `_____` for blanks.\n\
Output format is identical to MODE 1 (Question Block, Answer Block, JSON answer key).".into(),
      mode3: "You are [MODE 3] Whiteboard/Recall Mode (blank sheet coding).\n\
Goal: remove all answers so the learner rewrites the code from memory.\n\
- Keep function/class signatures; remove bodies with `pass` or blanks.\n\
- Keep important comments as hints.\n\
- Output: single code block with blanks or `pass` where needed (no JSON required).".into(),
      mode4: "You are [MODE 4] Problem Set Mode (5 questions).\n\
Goal: generate 5 question blocks with answers and a JSON table.\n\
- Maintain order; clearly separate questions with `---` lines.\n\
- Finish with a `### Answer Sheet` table.\n\
Also return a JSON answer map `{ \"Q1\": \"A\", ... }`.".into(),
      user_template: "Difficulty: {difficulty}\n\nSource:\n```python\n{content}\n```".into(),
    }
  }
}

/// Category weights used by the scorer.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
  pub pointer_assign: f64,
  pub condition: f64,
  pub boundary: f64,
  pub for_iter: f64,
  #[serde(rename = "return")]
  pub return_value: f64,
  pub plain_token: f64,
}

impl Default for CategoryWeights {
  fn default() -> Self {
    Self {
      pointer_assign: 3.0,
      condition: 3.0,
      boundary: 2.0,
      for_iter: 3.0,
      return_value: 1.0,
      plain_token: 0.0,
    }
  }
}

impl CategoryWeights {
  pub fn weight(&self, category: Category) -> f64 {
    match category {
      Category::PointerAssign => self.pointer_assign,
      Category::Condition => self.condition,
      Category::Boundary => self.boundary,
      Category::ForIter => self.for_iter,
      Category::Return => self.return_value,
      Category::PlainToken => self.plain_token,
    }
  }
}

/// Static tables for the local engine. Immutable once loaded.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub weights: CategoryWeights,
  /// Function/method name (last dotted segment) -> importance multiplier.
  pub region_weights: HashMap<String, f64>,
  pub default_region_weight: f64,
  pub pointer_identifiers: Vec<String>,
  pub link_tokens: Vec<String>,
  pub boundary_patterns: Vec<String>,
  /// Tokens the fallback scanner never proposes.
  pub excluded_keywords: Vec<String>,
  /// Blank counts for difficulty tiers 1..=4.
  pub blank_counts: Vec<usize>,
  pub default_blank_count: usize,
  pub min_line_distance: usize,
  pub max_blanks_per_line: usize,
  pub concept_prefix_chars: usize,
  pub choice_questions: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    let region_weights = [
      ("appendNode", 3.0),
      ("insertNode", 3.0),
      ("insertAt", 3.0),
      ("deleteNode", 3.0),
      ("searchNode", 2.0),
      ("printNodes", 1.0),
      ("get_list_data", 1.0),
      ("Node", 1.0),
      ("__init__", 1.0),
      ("saveToFile", 0.5),
      ("loadFromFile", 0.5),
      ("clearList", 0.5),
      ("__main__", 0.3),
      ("main", 0.3),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let strings = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    Self {
      weights: CategoryWeights::default(),
      region_weights,
      default_region_weight: 1.0,
      pointer_identifiers: strings(&["head", "current", "pre", "node", "newNode", "temp"]),
      link_tokens: strings(&[".link", ".next", ".prev"]),
      boundary_patterns: strings(&["is None", "is not None", "< 0", "> len", ">= len", "== 0", "index"]),
      excluded_keywords: strings(&[
        "print", "def", "class", "import", "from", "as", "pass", "True", "False", "None",
        "self", "cls", "__init__", "__main__", "__name__",
      ]),
      blank_counts: vec![30, 50, 60, 80],
      default_blank_count: 50,
      min_line_distance: 2,
      max_blanks_per_line: 2,
      concept_prefix_chars: 20,
      choice_questions: 10,
    }
  }
}

impl EngineConfig {
  /// Blank count for a difficulty tier (1-based); unknown tiers get the default.
  pub fn blank_count_for(&self, tier: u8) -> usize {
    (tier as usize)
      .checked_sub(1)
      .and_then(|idx| self.blank_counts.get(idx))
      .copied()
      .unwrap_or(self.default_blank_count)
  }

  /// Weight for a region, looked up by its last dotted segment.
  pub fn region_weight(&self, region: &str) -> f64 {
    let leaf = region.rsplit('.').next().unwrap_or(region);
    self
      .region_weights
      .get(leaf)
      .copied()
      .unwrap_or(self.default_region_weight)
  }
}

/// Attempt to load `DrillConfig` from DRILL_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_drill_config_from_env() -> Option<DrillConfig> {
  let path = std::env::var("DRILL_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<DrillConfig>(&s) {
      Ok(cfg) => {
        info!(target: "code_drill", %path, "Loaded drill config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "code_drill", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "code_drill", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
