use async_trait::async_trait;

use crate::error::BackendError;

/// The two remote calls the chat window depends on.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Names of the models the backend can chat with.
    async fn get_models(&self) -> Result<Vec<String>, BackendError>;

    /// Send one stateless message to `model` and return the reply text.
    async fn chat_with_ai(&self, message: &str, model: &str) -> Result<String, BackendError>;
}

/// Backend used when no model server is wired in. Every call fails with
/// [`BackendError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

#[async_trait]
impl ChatBackend for OfflineBackend {
    async fn get_models(&self) -> Result<Vec<String>, BackendError> {
        Err(BackendError::Unavailable)
    }

    async fn chat_with_ai(&self, _message: &str, _model: &str) -> Result<String, BackendError> {
        Err(BackendError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_backend_rejects_every_call() {
        let backend = OfflineBackend;
        assert!(matches!(backend.get_models().await, Err(BackendError::Unavailable)));
        assert!(matches!(
            backend.chat_with_ai("Hello", "llama2").await,
            Err(BackendError::Unavailable)
        ));
    }
}
