use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::ChatBackend;
use crate::error::BackendError;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaReplyMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaReplyMessage,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;
        let body = Self::success_body(response).await?;

        let models_response: OllamaModelsResponse = serde_json::from_str(&body)?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }

    /// Single-message chat: no history is sent, each call stands alone.
    pub async fn chat(&self, model: &str, message: &str) -> Result<String, BackendError> {
        let url = format!("{}/api/chat", self.base_url);

        let request = OllamaChatRequest {
            model,
            messages: vec![OllamaMessage {
                role: "user",
                content: message,
            }],
            stream: false,
        };

        debug!(%url, model, "sending chat request");
        let response = self.client.post(&url).json(&request).send().await?;
        let body = Self::success_body(response).await?;

        let chat_response: OllamaChatResponse = serde_json::from_str(&body)?;
        Ok(chat_response.message.content)
    }

    async fn success_body(response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn get_models(&self) -> Result<Vec<String>, BackendError> {
        self.list_models().await
    }

    async fn chat_with_ai(&self, message: &str, model: &str) -> Result<String, BackendError> {
        self.chat(model, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_models_returns_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [
                    { "name": "llama2:latest", "size": 3825819519u64 },
                    { "name": "mistral:7b" }
                ]
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri());
        let models = client.get_models().await.expect("models");
        assert_eq!(models, vec!["llama2:latest", "mistral:7b"]);
    }

    #[tokio::test]
    async fn test_list_models_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "models": [] })),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri());
        assert!(client.get_models().await.expect("models").is_empty());
    }

    #[tokio::test]
    async fn test_chat_sends_single_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(serde_json::json!({
                "model": "llama2",
                "messages": [{ "role": "user", "content": "Hello" }],
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama2",
                "message": { "role": "assistant", "content": "Hi there!" },
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&format!("{}/", server.uri()));
        let reply = client.chat_with_ai("Hello", "llama2").await.expect("reply");
        assert_eq!(reply, "Hi there!");
    }

    #[tokio::test]
    async fn test_chat_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model 'nope' not found"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri());
        match client.chat_with_ai("Hello", "nope").await {
            Err(BackendError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert!(body.contains("not found"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri());
        assert!(matches!(
            client.chat_with_ai("Hello", "llama2").await,
            Err(BackendError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let client = OllamaClient::new("http://127.0.0.1:9");
        assert!(matches!(client.get_models().await, Err(BackendError::Http(_))));
    }
}
