//! Error types for the Gemini MCP server

use std::fmt;

use thiserror::Error;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, GeminiMcpError>;

/// Main error type for the server
///
/// `Config`, `DuplicateTool` and `Io` are fatal at startup. Everything else is
/// a per-call failure that the dispatcher folds into an error envelope.
#[derive(Error, Debug)]
pub enum GeminiMcpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Gemini API error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    EmptyResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GeminiMcpError {
    /// Get error code for the JSON-RPC layer
    pub fn code(&self) -> i64 {
        match self {
            GeminiMcpError::UnknownTool(_) => -32601,
            GeminiMcpError::InvalidInput(_) => -32602,
            GeminiMcpError::Serialization(_) => -32700,
            _ => -32000,
        }
    }

    /// Classification of an upstream failure, if this is one
    pub fn upstream_kind(&self) -> Option<UpstreamErrorKind> {
        match self {
            GeminiMcpError::Upstream { message, .. } => Some(UpstreamErrorKind::classify(message)),
            GeminiMcpError::Http(e) if e.is_timeout() => Some(UpstreamErrorKind::Timeout),
            GeminiMcpError::Http(e) => Some(UpstreamErrorKind::classify(&e.to_string())),
            _ => None,
        }
    }

    /// One-line, actionable message suitable for an error envelope
    pub fn user_message(&self) -> String {
        match self {
            GeminiMcpError::Upstream { message, .. } => {
                UpstreamErrorKind::classify(message).describe(message)
            }
            GeminiMcpError::Http(e) => {
                let raw = e.to_string();
                let kind = if e.is_timeout() {
                    UpstreamErrorKind::Timeout
                } else {
                    UpstreamErrorKind::classify(&raw)
                };
                kind.describe(&raw)
            }
            other => other.to_string(),
        }
    }
}

/// Sub-kinds of a failed call to the generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    InvalidCredential,
    QuotaExceeded,
    PermissionDenied,
    NotFound,
    Timeout,
    Unclassified,
}

impl UpstreamErrorKind {
    /// Classify a raw failure message. Checks run in a fixed order so that
    /// e.g. an invalid-key message mentioning "permission" is still a
    /// credential problem.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&[
            "api key not valid",
            "api_key_invalid",
            "invalid api key",
            "unauthenticated",
        ]) {
            UpstreamErrorKind::InvalidCredential
        } else if has(&["quota", "rate limit", "resource_exhausted", "too many requests"]) {
            UpstreamErrorKind::QuotaExceeded
        } else if has(&["permission", "forbidden", "private", "restricted"]) {
            UpstreamErrorKind::PermissionDenied
        } else if has(&["not found", "not_found"]) {
            UpstreamErrorKind::NotFound
        } else if has(&["timeout", "timed out", "deadline"]) {
            UpstreamErrorKind::Timeout
        } else {
            UpstreamErrorKind::Unclassified
        }
    }

    /// Human-readable message for this kind; `raw` is only surfaced when the
    /// failure could not be classified.
    pub fn describe(&self, raw: &str) -> String {
        match self {
            UpstreamErrorKind::InvalidCredential => {
                "Invalid Gemini API key. Check that GEMINI_API_KEY holds a valid key.".to_string()
            }
            UpstreamErrorKind::QuotaExceeded => {
                "Gemini API quota or rate limit exceeded. Wait a moment and retry the request."
                    .to_string()
            }
            UpstreamErrorKind::PermissionDenied => {
                "Permission denied by Gemini. The video may be private or access-restricted."
                    .to_string()
            }
            UpstreamErrorKind::NotFound => {
                "Resource not found. Check the model name or the video URL.".to_string()
            }
            UpstreamErrorKind::Timeout => {
                "The Gemini request timed out. Try a shorter video segment or retry later."
                    .to_string()
            }
            UpstreamErrorKind::Unclassified => format!("Gemini API error: {}", raw),
        }
    }
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpstreamErrorKind::InvalidCredential => "invalid_credential",
            UpstreamErrorKind::QuotaExceeded => "quota_exceeded",
            UpstreamErrorKind::PermissionDenied => "permission_denied",
            UpstreamErrorKind::NotFound => "not_found",
            UpstreamErrorKind::Timeout => "timeout",
            UpstreamErrorKind::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}
