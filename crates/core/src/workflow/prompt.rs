//! The interactive question surface used by the workflow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    /// The terminal could not be read or written.
    #[error("Terminal prompt failed: {0}")]
    Terminal(String),

    /// Input ended before an answer was given.
    #[error("Input closed before an answer was given")]
    Closed,
}

/// Asks the user questions. Calls block until answered.
pub trait Prompter: Send {
    /// Free-form text; `default` is offered when given.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// Yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError>;

    /// Informational output that needs no answer.
    fn message(&mut self, text: &str);
}
