pub mod ai;
pub mod backend;
pub mod composer;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fallback;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::OllamaClient;
pub use backend::{ChatBackend, OfflineBackend};
pub use composer::Composer;
pub use config::Config;
pub use dispatcher::{AssistantReply, Dispatcher, OutgoingRequest, ReplyOrigin};
pub use error::BackendError;
pub use fallback::Fallback;
pub use session::{ChatSession, InputState};
pub use state::{ChatMessage, ChatRole, Transcript};
