//! Shared application state for request handlers.

use std::sync::Arc;

use tracing::info;

use router::config::RouterConfig;
use router::gateway::{ChatGateway, OllamaGateway, ZaiGateway};
use router::store::RunStore;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RouterConfig>,
    pub store: RunStore,
    pub gateway: Arc<dyn ChatGateway>,
}

impl AppState {
    /// Wire the provider adapter once at startup from configuration; the
    /// pipeline never branches on providers again.
    pub fn new(config: RouterConfig) -> Self {
        let gateway: Arc<dyn ChatGateway> = if config.author_uses_remote() {
            info!(model = %config.glm_model, "author stage wired to remote GLM endpoint");
            Arc::new(ZaiGateway::new(&config.zai_base_url, &config.zai_api_key))
        } else {
            info!(model = %config.author_model, "author stage wired to local ollama");
            Arc::new(OllamaGateway::new(&config.ollama_base_url))
        };
        Self::with_gateway(config, gateway)
    }

    /// Build state around an explicit gateway. Tests inject scripted
    /// gateways here.
    pub fn with_gateway(config: RouterConfig, gateway: Arc<dyn ChatGateway>) -> Self {
        let store = RunStore::new(config.workspace_dir.clone());
        Self {
            config: Arc::new(config),
            store,
            gateway,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_roots_the_store_at_the_workspace_dir() {
        let config = RouterConfig {
            workspace_dir: "/tmp/router-test-ws".into(),
            ..RouterConfig::default()
        };
        let state = AppState::new(config);
        assert_eq!(
            state.store.root(),
            std::path::Path::new("/tmp/router-test-ws")
        );
        // Default config has no API key, so the local adapter is selected.
        assert!(!state.config.author_uses_remote());
    }
}
