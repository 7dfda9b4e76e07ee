//! The chat window's state: text entry, send control, model selection and
//! transcript, owned by one UI task and handed to the dispatcher explicitly.

use tracing::{info, warn};

use crate::backend::ChatBackend;
use crate::composer::Composer;
use crate::error::BackendError;
use crate::state::{ChatMessage, Transcript};

pub const NO_MODELS_NOTICE: &str = "No models found. Please check your Ollama installation.";

/// Whether the text entry and send control accept input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputState {
    /// Waiting for the model list.
    Loading,
    Ready,
    /// A round trip is in flight.
    Busy,
    /// Startup failed; the notice is shown and input stays off for good.
    Blocked(String),
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    transcript: Transcript,
    composer: Composer,
    input: InputState,
    input_focused: bool,
    models: Vec<String>,
    selected_model: Option<usize>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            composer: Composer::new(),
            input: InputState::Loading,
            input_focused: false,
            models: Vec::new(),
            selected_model: None,
        }
    }

    /// Fetch the model list once and open (or block) the session.
    pub async fn bootstrap(&mut self, backend: &dyn ChatBackend, preferred: Option<&str>) {
        let result = backend.get_models().await;
        self.install_models(result, preferred);
    }

    pub fn install_models(
        &mut self,
        result: Result<Vec<String>, BackendError>,
        preferred: Option<&str>,
    ) {
        match result {
            Ok(models) if models.is_empty() => {
                warn!("backend reported no models");
                self.input = InputState::Blocked(NO_MODELS_NOTICE.to_string());
            }
            Ok(models) => {
                info!(count = models.len(), "models loaded");
                self.selected_model = preferred
                    .and_then(|p| models.iter().position(|m| m == p))
                    .or(Some(0));
                self.models = models;
                self.input = InputState::Ready;
                self.input_focused = true;
            }
            Err(e) => {
                warn!(error = %e, "failed to load models");
                self.input = InputState::Blocked(format!("{} ({})", NO_MODELS_NOTICE, e));
            }
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn input_state(&self) -> &InputState {
        &self.input
    }

    pub fn input_enabled(&self) -> bool {
        self.input == InputState::Ready
    }

    pub fn is_busy(&self) -> bool {
        self.input == InputState::Busy
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.input, InputState::Blocked(_))
    }

    pub fn blocking_notice(&self) -> Option<&str> {
        match &self.input {
            InputState::Blocked(notice) => Some(notice),
            _ => None,
        }
    }

    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_model
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model
            .and_then(|i| self.models.get(i))
            .map(String::as_str)
    }

    /// Returns the newly selected model name, or `None` for an out-of-range index.
    pub fn select_model(&mut self, index: usize) -> Option<&str> {
        if index < self.models.len() {
            self.selected_model = Some(index);
        }
        self.models.get(index).map(String::as_str)
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    pub(crate) fn disable_input(&mut self) {
        self.input = InputState::Busy;
        self.input_focused = false;
    }

    pub(crate) fn enable_input(&mut self) {
        if self.input == InputState::Busy {
            self.input = InputState::Ready;
        }
        self.input_focused = true;
    }
}
