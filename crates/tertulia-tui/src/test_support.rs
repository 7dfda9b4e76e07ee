use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tertulia_core::{BackendError, ChatBackend, Dispatcher};

use crate::app::App;

/// Replies with `"<model> says <message>"`.
pub(crate) struct EchoBackend;

#[async_trait]
impl ChatBackend for EchoBackend {
    async fn get_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(vec!["llama2".to_string(), "mistral".to_string()])
    }

    async fn chat_with_ai(&self, message: &str, model: &str) -> Result<String, BackendError> {
        Ok(format!("{} says {}", model, message))
    }
}

/// Lists models but fails every chat.
pub(crate) struct BrokenChatBackend;

#[async_trait]
impl ChatBackend for BrokenChatBackend {
    async fn get_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(vec!["llama2".to_string()])
    }

    async fn chat_with_ai(&self, _message: &str, _model: &str) -> Result<String, BackendError> {
        Err(BackendError::Status {
            status: 500,
            body: "boom".to_string(),
        })
    }
}

/// Replies with `lines` short lines.
pub(crate) struct LongReplyBackend {
    pub lines: usize,
}

#[async_trait]
impl ChatBackend for LongReplyBackend {
    async fn get_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(vec!["llama2".to_string()])
    }

    async fn chat_with_ai(&self, _message: &str, _model: &str) -> Result<String, BackendError> {
        Ok("x\n".repeat(self.lines))
    }
}

/// Lists models, then panics inside the chat call.
pub(crate) struct PanickingBackend;

#[async_trait]
impl ChatBackend for PanickingBackend {
    async fn get_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(vec!["llama2".to_string()])
    }

    async fn chat_with_ai(&self, _message: &str, _model: &str) -> Result<String, BackendError> {
        panic!("backend crashed mid-request");
    }
}

/// App with no dispatch delay and no config persistence.
pub(crate) fn make_app(backend: Arc<dyn ChatBackend>) -> App {
    App::new(Dispatcher::new(backend).with_delay(Duration::ZERO), None)
}

/// App whose round trips stay in flight long enough to observe.
pub(crate) fn make_slow_app(backend: Arc<dyn ChatBackend>) -> App {
    App::new(
        Dispatcher::new(backend).with_delay(Duration::from_millis(250)),
        None,
    )
}
