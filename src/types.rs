//! Core configuration and model-selection types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GeminiMcpError, Result};
use crate::gemini::GenerationBackend;

/// Model used when no override is configured or the override is not recognized
pub const FALLBACK_MODEL: &str = "gemini-2.5-flash";

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable holding the optional model override
pub const MODEL_ENV: &str = "GEMINI_MODEL";

/// Server configuration, assembled once at startup
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Gemini API key (required)
    pub api_key: String,
    /// Model override; validated against the provider's model list at startup
    #[serde(default)]
    pub model: Option<String>,
    /// API base URL override (proxies, test servers)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl ServerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Build from optional raw values, failing when the credential is absent.
    /// Blank strings count as absent.
    pub fn from_parts(
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let api_key = non_blank(api_key).ok_or_else(|| {
            GeminiMcpError::Config(format!(
                "{} is not set. Export your Gemini API key before starting the server.",
                API_KEY_ENV
            ))
        })?;

        if timeout_secs == 0 {
            return Err(GeminiMcpError::Config(
                "timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            model: non_blank(model),
            base_url: non_blank(base_url),
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Which model the server uses and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    /// Model used when a call does not name one
    pub active: String,
    /// Model requested through configuration, if any
    pub configured: Option<String>,
    /// Hardcoded fallback
    pub fallback: String,
}

impl ModelSelection {
    /// Selection without startup validation: configured model if any, else fallback
    pub fn unchecked(configured: Option<String>) -> Self {
        Self {
            active: configured.clone().unwrap_or_else(|| FALLBACK_MODEL.to_string()),
            configured,
            fallback: FALLBACK_MODEL.to_string(),
        }
    }

    /// Validate the configured override against the provider's model list.
    ///
    /// An unlisted override is replaced by the fallback with a warning. When
    /// the list itself cannot be fetched the override is kept, since the
    /// failure says nothing about the model name.
    pub async fn resolve(backend: &dyn GenerationBackend, configured: Option<String>) -> Self {
        let Some(requested) = configured.clone() else {
            tracing::info!("No model override configured, using {}", FALLBACK_MODEL);
            return Self::unchecked(None);
        };

        let wanted = requested.strip_prefix("models/").unwrap_or(&requested);
        match backend.list_models().await {
            Ok(models) => {
                if models.iter().any(|m| m.short_name() == wanted) {
                    tracing::info!("Using configured model {}", wanted);
                    Self {
                        active: wanted.to_string(),
                        configured,
                        fallback: FALLBACK_MODEL.to_string(),
                    }
                } else {
                    tracing::warn!(
                        "Configured model '{}' is not available ({} models listed); falling back to {}",
                        requested,
                        models.len(),
                        FALLBACK_MODEL
                    );
                    Self {
                        active: FALLBACK_MODEL.to_string(),
                        configured,
                        fallback: FALLBACK_MODEL.to_string(),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Could not list Gemini models to validate '{}': {}; keeping configured model",
                    requested,
                    e.user_message()
                );
                Self {
                    active: wanted.to_string(),
                    configured,
                    fallback: FALLBACK_MODEL.to_string(),
                }
            }
        }
    }

    /// Whether the configured override was replaced by the fallback
    pub fn is_fallback(&self) -> bool {
        match &self.configured {
            Some(configured) => {
                let configured = configured.strip_prefix("models/").unwrap_or(configured);
                self.active == self.fallback && configured != self.fallback
            }
            None => false,
        }
    }
}
