//! Per-mode drill builders. Each one turns source text into a `DrillSession`.

pub mod blanks;
pub mod choice;
pub mod definitions;
pub mod existing_quiz;
pub mod vocabulary;
pub mod whiteboard;

pub use blanks::build_inline_blanks;
pub use choice::build_multiple_choice;
pub use definitions::build_definition_quiz;
pub use existing_quiz::{build_existing_quiz, is_existing_quiz};
pub use vocabulary::build_vocabulary_cards;
pub use whiteboard::build_whiteboard;
