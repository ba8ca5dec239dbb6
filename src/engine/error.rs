//! Errors raised by the engine phases. Only the session assembler flattens these
//! into a degraded session; everything below it returns them as-is.

use thiserror::Error;

/// The source could not be tokenized or parsed as Python-style code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error on line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("blank {ordinal} points at line {line}, but the document has {lines} lines")]
    LineOutOfRange {
        ordinal: usize,
        line: usize,
        lines: usize,
    },

    #[error("two blanks share line {line}, column {column}")]
    DuplicatePosition { line: usize, column: usize },
}
