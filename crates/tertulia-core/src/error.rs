use thiserror::Error;

/// Failure of a remote call to the chat backend.
///
/// None of these reach the user as an error: a failed `chat_with_ai` turns
/// into the fallback reply, and a failed `get_models` blocks the session.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No backend is wired in (offline mode).
    #[error("chat backend is not available")]
    Unavailable,

    /// Connection, timeout or transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}
