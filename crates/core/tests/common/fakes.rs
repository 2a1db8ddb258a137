//! Deterministic collaborators for driving the workflow in tests.

use async_trait::async_trait;
use lb_core::discovery::{DiscoveryError, ModelDiscovery};
use lb_core::progress::ProgressSurface;
use lb_core::workflow::{PromptError, Prompter};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Answer {
    Text(String),
    Confirm(bool),
}

#[allow(dead_code)]
pub fn text(answer: &str) -> Answer {
    Answer::Text(answer.to_string())
}

/// What the workflow asked or told the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptRecord {
    Input(String),
    Confirm(String),
    Message(String),
}

/// Answers prompts from a fixed script; runs dry with `PromptError::Closed`.
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    transcript: Arc<Mutex<Vec<PromptRecord>>>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> (Self, Arc<Mutex<Vec<PromptRecord>>>) {
        let transcript = Arc::new(Mutex::new(Vec::new()));
        let prompter = Self {
            answers: answers.into(),
            transcript: Arc::clone(&transcript),
        };
        (prompter, transcript)
    }

    fn record(&self, entry: PromptRecord) {
        self.transcript.lock().unwrap().push(entry);
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, prompt: &str, _default: Option<&str>) -> Result<String, PromptError> {
        self.record(PromptRecord::Input(prompt.to_string()));
        match self.answers.pop_front() {
            Some(Answer::Text(answer)) => Ok(answer),
            Some(other) => Err(PromptError::Terminal(format!(
                "expected a text answer, script has {other:?}"
            ))),
            None => Err(PromptError::Closed),
        }
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool, PromptError> {
        self.record(PromptRecord::Confirm(prompt.to_string()));
        match self.answers.pop_front() {
            Some(Answer::Confirm(answer)) => Ok(answer),
            Some(other) => Err(PromptError::Terminal(format!(
                "expected a yes/no answer, script has {other:?}"
            ))),
            None => Err(PromptError::Closed),
        }
    }

    fn message(&mut self, text: &str) {
        self.record(PromptRecord::Message(text.to_string()));
    }
}

/// Calls made on a progress surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Show(String),
    SetText(String),
    Close,
}

#[derive(Default)]
pub struct RecordingSurface {
    ops: Arc<Mutex<Vec<SurfaceOp>>>,
}

impl RecordingSurface {
    pub fn new() -> (Self, Arc<Mutex<Vec<SurfaceOp>>>) {
        let surface = Self::default();
        let ops = Arc::clone(&surface.ops);
        (surface, ops)
    }
}

impl ProgressSurface for RecordingSurface {
    fn show(&mut self, text: &str) {
        self.ops.lock().unwrap().push(SurfaceOp::Show(text.to_string()));
    }

    fn set_text(&mut self, text: &str) {
        self.ops
            .lock()
            .unwrap()
            .push(SurfaceOp::SetText(text.to_string()));
    }

    fn close(&mut self) {
        self.ops.lock().unwrap().push(SurfaceOp::Close);
    }
}

/// Discovery with a canned answer.
pub struct StaticDiscovery {
    models: Option<Vec<String>>,
}

impl StaticDiscovery {
    #[allow(dead_code)]
    pub fn found(models: &[&str]) -> Self {
        Self {
            models: Some(models.iter().map(|model| model.to_string()).collect()),
        }
    }

    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self { models: None }
    }
}

#[async_trait]
impl ModelDiscovery for StaticDiscovery {
    async fn discover(&self, host: &str) -> Result<Vec<String>, DiscoveryError> {
        self.models.clone().ok_or_else(|| DiscoveryError::Reported {
            host: host.to_string(),
        })
    }
}
