//! Already-formatted quizzes pasted as input.
//!
//! A numbered problem set with circled options (①..⑤) is loaded as-is instead
//! of being run through a drill builder. Questions keep their original number
//! and chapter; options and code lines are collected until the next question.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::{AnswerKey, DrillSession};

pub const KIND: &str = "parsed_quiz";

/// At least this many distinct signals mark the input as a quiz.
const MIN_SIGNALS: usize = 2;

static QUIZ_SIGNALS: Lazy<Vec<Regex>> = Lazy::new(|| {
  [r"[①②③④⑤]", r"(?m)^\s*\d+\.\s+.+", r"실행\s*결과", r"빈칸에\s*들어갈"]
    .iter()
    .map(|p| Regex::new(p).expect("valid quiz signal regex"))
    .collect()
});
static CHAPTER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^\[Chapter\s*(\d+)\.").expect("valid chapter regex"));
static QUESTION_START: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(\d+)\.\s*(.+)").expect("valid question regex"));
static NEXT_QUESTION: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^\d+\.\s+.+").expect("valid question regex"));
static OPTION: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^([①②③④⑤])\s*(.+)").expect("valid option regex"));
static CALL_OR_ASSIGN: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*\s*[=\[(]").expect("valid code regex"));

const CODE_PREFIXES: &[&str] = &[
  "print", "def ", "class ", "for ", "if ", "while ", "import ", "from ", "return ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  MultipleChoice,
  ShortAnswer,
  FillBlank,
}

impl QuestionKind {
  fn from_prompt(text: &str) -> Self {
    if ["입력하시오", "적으시오", "작성하시오"].iter().any(|w| text.contains(w)) {
      Self::ShortAnswer
    } else if text.contains("빈칸") || text.contains("밑줄") {
      Self::FillBlank
    } else {
      Self::MultipleChoice
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizOption {
  pub num: u8,
  pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuestion {
  pub id: usize,
  pub original_num: String,
  pub chapter: u32,
  pub text: String,
  pub code: String,
  pub options: Vec<QuizOption>,
  #[serde(rename = "type")]
  pub kind: QuestionKind,
}

pub fn is_existing_quiz(content: &str) -> bool {
  QUIZ_SIGNALS.iter().filter(|re| re.is_match(content)).count() >= MIN_SIGNALS
}

fn option_number(symbol: &str) -> u8 {
  match symbol {
    "①" => 1,
    "②" => 2,
    "③" => 3,
    "④" => 4,
    "⑤" => 5,
    _ => 0,
  }
}

fn is_code_line(raw: &str, stripped: &str) -> bool {
  !stripped.is_empty()
    && !stripped.starts_with('#')
    && (raw.starts_with("   ")
      || raw.starts_with('\t')
      || stripped.contains('=')
      || CODE_PREFIXES.iter().any(|p| stripped.starts_with(p))
      || CALL_OR_ASSIGN.is_match(stripped))
}

pub fn parse_existing_quiz(content: &str) -> Vec<ParsedQuestion> {
  let lines: Vec<&str> = content.lines().collect();
  let mut questions = Vec::new();
  let mut chapter = 0u32;
  let mut i = 0;

  while i < lines.len() {
    let line = lines[i].trim();
    if let Some(c) = CHAPTER.captures(line) {
      chapter = c[1].parse().unwrap_or(chapter);
      i += 1;
      continue;
    }
    let Some(q) = QUESTION_START.captures(line) else {
      i += 1;
      continue;
    };

    let text = q[2].trim().to_string();
    let mut kind = QuestionKind::from_prompt(&text);
    let mut question = ParsedQuestion {
      id: questions.len() + 1,
      original_num: q[1].to_string(),
      chapter,
      text,
      code: String::new(),
      options: Vec::new(),
      kind,
    };
    let mut code = Vec::new();

    i += 1;
    while i < lines.len() {
      let raw = lines[i];
      let stripped = raw.trim();
      if NEXT_QUESTION.is_match(stripped) || stripped.to_lowercase().starts_with("[chapter") {
        break;
      }
      if let Some(o) = OPTION.captures(stripped) {
        question.options.push(QuizOption { num: option_number(&o[1]), text: o[2].trim().to_string() });
        kind = QuestionKind::MultipleChoice;
      } else if !(stripped.starts_with('[') && stripped.ends_with(']')) && is_code_line(raw, stripped) {
        code.push(stripped);
      }
      i += 1;
    }

    question.code = code.join("\n");
    question.kind = kind;
    questions.push(question);
  }
  questions
}

/// Session for a pasted quiz. Answers start empty; the UI grades by option.
#[instrument(target = "drill", level = "debug", skip(content), fields(content_len = content.len()))]
pub fn build_existing_quiz(content: &str, mode: i64) -> DrillSession {
  let questions = parse_existing_quiz(content);
  let choice = questions
    .iter()
    .filter(|q| q.kind == QuestionKind::MultipleChoice && !q.options.is_empty())
    .count();
  let written = questions.len() - choice;
  debug!(target: "drill", total = questions.len(), choice, written, "existing quiz parsed");

  let mut key = AnswerKey::new(KIND)
    .with_meta("questions", &questions)
    .with_meta("has_answers", false);
  for q in &questions {
    key.insert_answer(q.id, "");
  }

  let question = format!("{} questions loaded from the pasted quiz.", questions.len());
  let answer = format!(
    "{} questions loaded.\n\nQuestion types:\n- multiple choice: {choice}\n- short answer / fill-in: {written}\n\nPick an option to check it.",
    questions.len()
  );
  DrillSession::new(mode, question, answer, content, key)
}
