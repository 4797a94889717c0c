//! Adapter for the remote ZAI GLM endpoint (OpenAI-style chat completions).
//!
//! Intentionally minimal; swapping this adapter in or out is a configuration
//! change, not a code change.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{ChatGateway, ChatMessage, GatewayError, REQUEST_TIMEOUT};

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ZaiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

impl ZaiGateway {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ChatGateway for ZaiGateway {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model,
            messages,
            temperature,
            stream: false,
        };

        debug!(model, url = %url, temperature, "calling zai");

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        let payload: Value = response.json().await.map_err(transport)?;
        extract_completion_text(&payload)
    }
}

fn transport(source: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        provider: "zai",
        source,
    }
}

/// Pull the generated text out of `choices[0].message.content`.
fn extract_completion_text(payload: &Value) -> Result<String, GatewayError> {
    payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(GatewayError::MalformedResponse {
            provider: "zai",
            field: "choices[0].message.content",
        })
}
