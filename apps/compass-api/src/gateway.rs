//! AI gateway client
//!
//! The gateway speaks the OpenAI chat-completions protocol. Responses are
//! passed through to the caller as raw event-stream bytes.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;

/// Raw response body of a streamed completion
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("AI gateway returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("AI gateway unreachable: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayMessage {
    pub role: String,
    pub content: String,
}

impl GatewayMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ResearchGateway: Send + Sync {
    /// Start a streamed completion over `messages`
    async fn stream_chat(&self, messages: Vec<GatewayMessage>) -> Result<ByteStream, GatewayError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [GatewayMessage],
    stream: bool,
}

pub struct OpenAiGateway {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiGateway {
    pub fn new(url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ResearchGateway for OpenAiGateway {
    async fn stream_chat(&self, messages: Vec<GatewayMessage>) -> Result<ByteStream, GatewayError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            stream: true,
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| GatewayError::Transport(e.to_string())))
            .boxed())
    }
}
