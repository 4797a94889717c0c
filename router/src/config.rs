//! Router configuration resolved once at startup.
//!
//! Every recognized option comes from an environment-style key/value lookup
//! so the whole struct is test-injectable. Components receive the config by
//! reference; nothing reads the environment after startup.

use std::path::PathBuf;

use anyhow::{Result, anyhow};

/// Runtime configuration for the router and its provider adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Port the HTTP server listens on (`ROUTER_PORT`).
    pub port: u16,

    /// Base URL of the local Ollama-compatible server (`OLLAMA_BASE_URL`).
    pub ollama_base_url: String,

    /// Model driving the author and verify stages locally (`GWEN_MODEL`).
    pub author_model: String,
    /// Model reserved for the reproduce stage (`REPRO_MODEL`).
    pub reproduce_model: String,
    /// Model reserved for the security stage (`SECURITY_MODEL`).
    pub security_model: String,

    /// Base URL of the remote ZAI endpoint (`ZAI_BASE_URL`).
    pub zai_base_url: String,
    /// Bearer token for the remote endpoint (`ZAI_API_KEY`). Empty disables it.
    pub zai_api_key: String,
    /// Model used when the author stage is remote (`GLM_MODEL`).
    pub glm_model: String,

    /// Prefer the remote endpoint for the author stage (`AUTHOR_IS_REMOTE`).
    pub author_is_remote: bool,
    /// Keep final artifacts on the local workspace only (`FINAL_OUTPUT_LOCAL_ONLY`).
    pub final_output_local_only: bool,

    /// Project the dashboard shows when none is requested (`DEFAULT_PROJECT`).
    pub default_project: String,
    /// Root of the status/project/run-id tree (`WORKSPACE_DIR`).
    pub workspace_dir: PathBuf,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            port: 8010,
            ollama_base_url: "http://ollama:11434".to_string(),
            author_model: "qwen2.5-coder:7b-instruct".to_string(),
            reproduce_model: "qwen2.5:7b-instruct".to_string(),
            security_model: "qwen2.5:7b-instruct".to_string(),
            zai_base_url: "https://api.z.ai/v1".to_string(),
            zai_api_key: String::new(),
            glm_model: "glm-4.6".to_string(),
            author_is_remote: true,
            final_output_local_only: true,
            default_project: "system-34".to_string(),
            workspace_dir: PathBuf::from("/app/workspace"),
        }
    }
}

impl RouterConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary lookup function.
    ///
    /// Missing keys fall back to the defaults above; present keys always win,
    /// even when empty (an empty model name then fails validation).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("ROUTER_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid ROUTER_PORT '{raw}'"))?,
            None => defaults.port,
        };

        let config = Self {
            port,
            ollama_base_url: string_or(&lookup, "OLLAMA_BASE_URL", defaults.ollama_base_url),
            author_model: string_or(&lookup, "GWEN_MODEL", defaults.author_model),
            reproduce_model: string_or(&lookup, "REPRO_MODEL", defaults.reproduce_model),
            security_model: string_or(&lookup, "SECURITY_MODEL", defaults.security_model),
            zai_base_url: string_or(&lookup, "ZAI_BASE_URL", defaults.zai_base_url),
            zai_api_key: string_or(&lookup, "ZAI_API_KEY", defaults.zai_api_key),
            glm_model: string_or(&lookup, "GLM_MODEL", defaults.glm_model),
            author_is_remote: bool_or(&lookup, "AUTHOR_IS_REMOTE", defaults.author_is_remote),
            final_output_local_only: bool_or(
                &lookup,
                "FINAL_OUTPUT_LOCAL_ONLY",
                defaults.final_output_local_only,
            ),
            default_project: string_or(&lookup, "DEFAULT_PROJECT", defaults.default_project),
            workspace_dir: lookup("WORKSPACE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_dir),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.author_model.trim().is_empty() {
            return Err(anyhow!("GWEN_MODEL must not be empty"));
        }
        if self.reproduce_model.trim().is_empty() {
            return Err(anyhow!("REPRO_MODEL must not be empty"));
        }
        if self.security_model.trim().is_empty() {
            return Err(anyhow!("SECURITY_MODEL must not be empty"));
        }
        if self.glm_model.trim().is_empty() {
            return Err(anyhow!("GLM_MODEL must not be empty"));
        }
        if self.workspace_dir.as_os_str().is_empty() {
            return Err(anyhow!("WORKSPACE_DIR must not be empty"));
        }
        Ok(())
    }

    /// Whether the author stage talks to the remote GLM endpoint.
    ///
    /// Remote requires both the flag and a non-empty API key, so the default
    /// configuration (empty key) still selects the local server.
    pub fn author_uses_remote(&self) -> bool {
        self.author_is_remote && !self.zai_api_key.is_empty()
    }

    /// Model identifier the author and verify stages run against.
    pub fn active_author_model(&self) -> &str {
        if self.author_uses_remote() {
            &self.glm_model
        } else {
            &self.author_model
        }
    }
}

fn string_or<F>(lookup: &F, key: &str, default: String) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or(default)
}

/// Booleans parse case-insensitively from `"true"`; anything else is false.
fn bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().eq_ignore_ascii_case("true"),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_key: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_lookup_yields_defaults() {
        let config = RouterConfig::from_lookup(none).expect("config");
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.port, 8010);
        assert_eq!(config.workspace_dir, PathBuf::from("/app/workspace"));
    }

    #[test]
    fn lookup_overrides_take_effect() {
        let config = RouterConfig::from_lookup(|key| match key {
            "ROUTER_PORT" => Some("9000".to_string()),
            "GWEN_MODEL" => Some("test-model".to_string()),
            "WORKSPACE_DIR" => Some("/tmp/ws".to_string()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.port, 9000);
        assert_eq!(config.author_model, "test-model");
        assert_eq!(config.workspace_dir, PathBuf::from("/tmp/ws"));
    }

    #[test]
    fn booleans_parse_case_insensitively() {
        let config = RouterConfig::from_lookup(|key| match key {
            "AUTHOR_IS_REMOTE" => Some("TrUe".to_string()),
            "FINAL_OUTPUT_LOCAL_ONLY" => Some("no".to_string()),
            _ => None,
        })
        .expect("config");
        assert!(config.author_is_remote);
        assert!(!config.final_output_local_only);
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = RouterConfig::from_lookup(|key| match key {
            "ROUTER_PORT" => Some("not-a-port".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("ROUTER_PORT"));
    }

    #[test]
    fn empty_model_fails_validation() {
        let err = RouterConfig::from_lookup(|key| match key {
            "GWEN_MODEL" => Some("  ".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("GWEN_MODEL"));
    }

    #[test]
    fn remote_author_requires_api_key() {
        let mut config = RouterConfig::default();
        assert!(config.author_is_remote);
        assert!(!config.author_uses_remote());
        assert_eq!(config.active_author_model(), "qwen2.5-coder:7b-instruct");

        config.zai_api_key = "secret".to_string();
        assert!(config.author_uses_remote());
        assert_eq!(config.active_author_model(), "glm-4.6");
    }
}
