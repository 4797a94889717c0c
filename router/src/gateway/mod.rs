//! Model gateway trait and shared message types.
//!
//! The [`ChatGateway`] trait decouples the pipeline from the concrete
//! provider API (currently a local Ollama-compatible server or the remote
//! ZAI GLM endpoint). Which adapter is wired in is decided once at startup
//! from configuration, never branched on inside pipeline logic. Tests use
//! scripted gateways that return predetermined replies without touching the
//! network.

mod ollama;
mod zai;

pub use ollama::OllamaGateway;
pub use zai::ZaiGateway;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-request timeout for provider calls.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Message author role, serialized lowercase for OpenAI-style payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single role-tagged message sent to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Failures surfaced by provider adapters.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection failure, timeout, or non-2xx status.
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// A 2xx reply whose body does not carry the generated text.
    #[error("unexpected {provider} response: missing {field}")]
    MalformedResponse {
        provider: &'static str,
        field: &'static str,
    },
}

/// Abstraction over model provider backends.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send role-tagged messages to `model` and return the raw generated text.
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GatewayError>;
}
