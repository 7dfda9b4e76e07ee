//! Degraded-mode replies, used when the backend cannot answer.

use std::fmt;
use std::sync::Arc;

pub const STATIC_REPLY: &str = "Static reply from AI";

/// A pure function from the user's message to a canned reply.
#[derive(Clone)]
pub struct Fallback {
    reply: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl Fallback {
    pub fn new(reply: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            reply: Arc::new(reply),
        }
    }

    /// Same reply whatever the message.
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| text.clone())
    }

    pub fn reply_for(&self, message: &str) -> String {
        (self.reply)(message)
    }

    /// Assistant text for a failed round trip: `[model] reply`.
    pub fn render(&self, model: &str, message: &str) -> String {
        format!("[{}] {}", model, self.reply_for(message))
    }
}

impl Default for Fallback {
    fn default() -> Self {
        Self::constant(STATIC_REPLY)
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback").finish_non_exhaustive()
    }
}
