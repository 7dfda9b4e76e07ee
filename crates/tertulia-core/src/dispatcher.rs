//! One round trip from the text entry to a visible assistant reply.
//!
//! A round trip is split in three steps so a front end can keep drawing while
//! the backend works:
//!
//! - [`Dispatcher::begin`] validates the draft, appends the user message,
//!   clears the entry and disables input.
//! - [`Dispatcher::resolve`] waits the configured delay, calls the backend and
//!   maps any failure to the fallback reply. It does not touch the session, so
//!   it can run on a spawned task.
//! - [`Dispatcher::finish`] appends the assistant message and re-enables input.
//!
//! Every request that leaves `begin` must go through `finish` exactly once.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::ChatBackend;
use crate::fallback::Fallback;
use crate::session::ChatSession;
use crate::state::ChatMessage;

pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub message: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOrigin {
    Backend,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: String,
    pub origin: ReplyOrigin,
}

#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn ChatBackend>,
    delay: Duration,
    fallback: Fallback,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            delay: DEFAULT_DISPATCH_DELAY,
            fallback: Fallback::default(),
        }
    }

    /// Minimum wait before the backend is called. Zero is fine.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn backend(&self) -> &dyn ChatBackend {
        self.backend.as_ref()
    }

    /// Start a round trip from the session's draft and selected model.
    ///
    /// Returns `None`, leaving the session untouched, when the draft is blank
    /// or input is not enabled (loading, blocked, or a request in flight).
    pub fn begin(&self, session: &mut ChatSession) -> Option<OutgoingRequest> {
        if !session.input_enabled() {
            return None;
        }

        let message = session.composer().text().trim().to_string();
        if message.is_empty() {
            return None;
        }
        let model = session.selected_model()?.to_string();

        session.push(ChatMessage::user(message.clone()));
        session.composer_mut().clear();
        session.disable_input();

        debug!(model = %model, chars = message.chars().count(), "round trip started");
        Some(OutgoingRequest { message, model })
    }

    pub async fn resolve(&self, request: &OutgoingRequest) -> AssistantReply {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self
            .backend
            .chat_with_ai(&request.message, &request.model)
            .await
        {
            Ok(content) => AssistantReply {
                content,
                origin: ReplyOrigin::Backend,
            },
            Err(e) => {
                warn!(
                    model = %request.model,
                    error = %e,
                    "backend unavailable, using fallback reply"
                );
                self.fallback_reply(request)
            }
        }
    }

    /// Degraded-mode reply for `request`.
    pub fn fallback_reply(&self, request: &OutgoingRequest) -> AssistantReply {
        AssistantReply {
            content: self.fallback.render(&request.model, &request.message),
            origin: ReplyOrigin::Fallback,
        }
    }

    pub fn finish(&self, session: &mut ChatSession, reply: AssistantReply) {
        debug!(origin = ?reply.origin, "round trip finished");
        session.push(ChatMessage::assistant(reply.content));
        session.enable_input();
    }

    /// Run a whole round trip in place. Returns the reply that was appended,
    /// or `None` if nothing was submitted.
    pub async fn submit(&self, session: &mut ChatSession) -> Option<AssistantReply> {
        let request = self.begin(session)?;
        let reply = self.resolve(&request).await;
        self.finish(session, reply.clone());
        Some(reply)
    }
}
