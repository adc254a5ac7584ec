//! Answer generation grounded in retrieved elements

mod answer;
mod prompt;

pub use answer::AnsweringStage;
pub use prompt::PromptBuilder;
