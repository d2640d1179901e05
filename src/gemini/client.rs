//! HTTP client for the Gemini REST API

use std::time::Duration;

use async_trait::async_trait;

use super::types::{
    ApiErrorBody, GenerateContentRequest, GenerateContentResponse, ListModelsResponse, ModelInfo,
};
use crate::error::{GeminiMcpError, Result};

/// Default Gemini API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_VERSION: &str = "v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const MODELS_PAGE_SIZE: &str = "1000";

/// The outbound generation service as seen by tool handlers
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Run one `generateContent` call against `model`
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;

    /// All models visible to the configured credential
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

/// Gemini API client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client. `timeout` bounds each whole request.
    pub fn new(api_key: String, base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gemini-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn model_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, API_VERSION, model
        )
    }

    /// Turn a non-2xx response into an upstream error with the key scrubbed
    async fn error_from_response(&self, response: reqwest::Response) -> GeminiMcpError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => match parsed.error.status {
                Some(code) => format!("{}: {}", code, parsed.error.message),
                None => parsed.error.message,
            },
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            Err(_) => body,
        };

        GeminiMcpError::Upstream {
            status: status.as_u16(),
            message: redact(&message, &self.api_key),
        }
    }

    fn scrub(&self, err: reqwest::Error) -> GeminiMcpError {
        let err = err.without_url();
        if err.is_timeout() {
            return GeminiMcpError::Http(err);
        }
        let message = redact(&error_chain(&err), &self.api_key);
        GeminiMcpError::Upstream {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            message,
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.model_url(model);
        tracing::debug!(model, "POST generateContent");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.scrub(e))?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| self.scrub(e))?;

        if let Some(usage) = &parsed.usage_metadata {
            tracing::debug!(
                model,
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                "Gemini usage"
            );
        }

        Ok(parsed)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/{}/models", self.base_url, API_VERSION);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", MODELS_PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .query(&query)
                .send()
                .await
                .map_err(|e| self.scrub(e))?;

            if !response.status().is_success() {
                return Err(self.error_from_response(response).await);
            }

            let page: ListModelsResponse = response.json().await.map_err(|e| self.scrub(e))?;
            models.extend(page.models);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(models)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .finish()
    }
}

/// `Display` of an error followed by each distinct cause, joined with ": "
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut last = message.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !last.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        last = text;
        source = cause.source();
    }
    message
}

/// Remove every occurrence of the credential from a message
pub fn redact(message: &str, api_key: &str) -> String {
    if api_key.is_empty() {
        return message.to_string();
    }
    message.replace(api_key, "[redacted]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            "test-key".into(),
            base_url.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_model_url() {
        let c = client(None);
        assert_eq!(
            c.model_url("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            c.model_url("models/gemini-2.5-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let c = client(Some("http://localhost:8080/"));
        assert_eq!(
            c.model_url("m"),
            "http://localhost:8080/v1beta/models/m:generateContent"
        );
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("bad key AIzaSecret in request AIzaSecret", "AIzaSecret"),
            "bad key [redacted] in request [redacted]"
        );
        assert_eq!(redact("nothing here", ""), "nothing here");
    }

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl std::fmt::Display for Layer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|e| e as _)
        }
    }

    #[test]
    fn test_error_chain_includes_causes() {
        let err = Layer(
            "error sending request",
            Some(Box::new(Layer(
                "client error (Connect)",
                Some(Box::new(Layer("Connection refused (os error 111)", None))),
            ))),
        );
        assert_eq!(
            error_chain(&err),
            "error sending request: client error (Connect): Connection refused (os error 111)"
        );

        let repeated = Layer("timed out", Some(Box::new(Layer("timed out", None))));
        assert_eq!(error_chain(&repeated), "timed out");
    }

    #[tokio::test]
    async fn test_connect_failure_names_the_cause() {
        // Nothing listens on port 1
        let c = GeminiClient::new(
            "test-key".into(),
            Some("http://127.0.0.1:1".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = c
            .generate_content("m", &GenerateContentRequest::from_prompt("hi"))
            .await
            .unwrap_err();

        let message = err.user_message();
        assert!(message.to_lowercase().contains("connect"), "{}", message);
        assert!(!message.contains("test-key"));
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", client(None));
        assert!(!rendered.contains("test-key"));
    }
}
