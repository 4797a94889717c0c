//! Shared helpers for unit and integration tests.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::RouterConfig;
use crate::gateway::{ChatGateway, ChatMessage, GatewayError};

/// One recorded gateway invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// Scripted gateway yielding canned replies first-to-last, one per call.
///
/// Records every invocation so tests can assert on models, prompts, and
/// temperatures without a network in sight.
pub struct ScriptedGateway {
    replies: Mutex<Vec<Result<String, GatewayError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<String, GatewayError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for all-successful scripts.
    pub fn replying<I>(replies: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GatewayError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature,
        });
        let mut replies = self.replies.lock().expect("replies lock");
        if replies.is_empty() {
            return Err(GatewayError::MalformedResponse {
                provider: "scripted",
                field: "reply",
            });
        }
        replies.remove(0)
    }
}

/// Default config pointed at a test workspace root.
pub fn test_config(workspace_dir: &Path) -> RouterConfig {
    RouterConfig {
        workspace_dir: workspace_dir.to_path_buf(),
        ..RouterConfig::default()
    }
}

/// Fresh workspace root for store-backed tests; removed on drop.
pub fn temp_workspace() -> tempfile::TempDir {
    tempfile::tempdir().expect("create temp workspace")
}
