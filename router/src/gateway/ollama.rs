//! Adapter for an Ollama-compatible `/api/generate` endpoint.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{ChatGateway, ChatMessage, GatewayError, REQUEST_TIMEOUT};

/// Client for a local Ollama-compatible model server.
#[derive(Debug, Clone)]
pub struct OllamaGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

impl OllamaGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatGateway for OllamaGateway {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt: flatten_messages(messages),
            stream: false,
            options: GenerateOptions { temperature },
        };

        debug!(model, url = %url, temperature, "calling ollama");

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        let payload: Value = response.json().await.map_err(transport)?;
        extract_response_text(&payload)
    }
}

fn transport(source: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        provider: "ollama",
        source,
    }
}

/// Flatten chat messages into the single-prompt form `/api/generate` expects:
/// upper-cased role headers, blank-line separated, ending with an open
/// `ASSISTANT:` turn for the model to complete.
fn flatten_messages(messages: &[ChatMessage]) -> String {
    let mut prompt = messages
        .iter()
        .map(|message| {
            format!(
                "{}:\n{}",
                message.role.as_str().to_uppercase(),
                message.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    prompt.push_str("\n\nASSISTANT:\n");
    prompt
}

/// Pull the generated text out of an `/api/generate` reply.
fn extract_response_text(payload: &Value) -> Result<String, GatewayError> {
    payload
        .get("response")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(GatewayError::MalformedResponse {
            provider: "ollama",
            field: "response",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_messages_with_role_headers() {
        let messages = vec![
            ChatMessage::system("Return JSON."),
            ChatMessage::user("write hello world"),
        ];
        let prompt = flatten_messages(&messages);
        assert_eq!(
            prompt,
            "SYSTEM:\nReturn JSON.\n\nUSER:\nwrite hello world\n\nASSISTANT:\n"
        );
    }

    #[test]
    fn extracts_response_field() {
        let payload = json!({"response": "{\"files\":[]}", "done": true});
        let text = extract_response_text(&payload).expect("text");
        assert_eq!(text, "{\"files\":[]}");
    }

    #[test]
    fn missing_response_field_is_malformed() {
        let payload = json!({"done": true});
        let err = extract_response_text(&payload).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
        assert!(err.to_string().contains("response"));
    }

    #[test]
    fn request_body_matches_wire_contract() {
        let body = GenerateRequest {
            model: "qwen2.5-coder:7b-instruct",
            prompt: "USER:\nhi\n\nASSISTANT:\n".to_string(),
            stream: false,
            options: GenerateOptions { temperature: 0.5 },
        };
        let encoded = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            encoded,
            json!({
                "model": "qwen2.5-coder:7b-instruct",
                "prompt": "USER:\nhi\n\nASSISTANT:\n",
                "stream": false,
                "options": {"temperature": 0.5}
            })
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway = OllamaGateway::new("http://ollama:11434/");
        assert_eq!(gateway.base_url, "http://ollama:11434");
    }
}
