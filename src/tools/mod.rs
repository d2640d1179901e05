//! Gemini-backed MCP tools
//!
//! Every tool follows the same shape: deserialize the validated arguments into
//! a typed parameter struct, build one `generateContent` request, make one
//! call through the [`GenerationBackend`], and post-process the text.

pub mod chat;
pub mod generate;
pub mod search;
pub mod status;
pub mod video;

use std::sync::Arc;

use crate::error::{GeminiMcpError, Result};
use crate::gemini::{GenerateContentRequest, GenerateContentResponse, GenerationBackend};
use crate::mcp::ToolRegistry;
use crate::schema::FieldSpec;
use crate::types::ModelSelection;

/// Process-wide state shared by every tool handler
pub struct ToolContext {
    pub backend: Arc<dyn GenerationBackend>,
    pub models: ModelSelection,
    pub api_key_configured: bool,
}

impl ToolContext {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        models: ModelSelection,
        api_key_configured: bool,
    ) -> Self {
        Self {
            backend,
            models,
            api_key_configured,
        }
    }

    /// Model for one call: the caller's choice, else the active model
    pub fn model_for<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.models.active)
    }

    /// Make the single outbound call for a tool invocation
    pub(crate) async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        self.backend.generate_content(model, request).await
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("models", &self.models)
            .field("api_key_configured", &self.api_key_configured)
            .finish_non_exhaustive()
    }
}

/// Register every tool against a shared context
pub fn register_all(registry: &mut ToolRegistry, ctx: Arc<ToolContext>) -> Result<()> {
    registry.register(generate::definition(Arc::clone(&ctx)))?;
    registry.register(chat::definition(Arc::clone(&ctx)))?;
    registry.register(search::definition(Arc::clone(&ctx)))?;
    registry.register(video::definition(Arc::clone(&ctx)))?;
    registry.register(status::definition(ctx))?;
    Ok(())
}

/// Build the complete registry for the server
pub fn build_registry(ctx: Arc<ToolContext>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_all(&mut registry, ctx)?;
    Ok(registry)
}

/// Answer text of a response, or the reason there is none
pub(crate) fn response_text(response: &GenerateContentResponse) -> Result<String> {
    if let Some(text) = response.text() {
        return Ok(text);
    }
    if let Some(reason) = response.block_reason() {
        return Err(GeminiMcpError::EmptyResponse(format!(
            "Response blocked by Gemini: {}",
            reason
        )));
    }
    Err(GeminiMcpError::EmptyResponse(format!(
        "Gemini returned an empty response (finish reason: {})",
        response.finish_reason().unwrap_or("unknown")
    )))
}

// Argument fields shared across tools

pub(crate) fn model_field() -> FieldSpec {
    FieldSpec::string()
        .non_empty()
        .describe("Gemini model to use. Defaults to the server's active model.")
}

pub(crate) fn temperature_field() -> FieldSpec {
    FieldSpec::number()
        .range(0.0, 2.0)
        .describe("Sampling temperature (0-2). Higher values are more creative.")
}

pub(crate) fn max_output_tokens_field() -> FieldSpec {
    FieldSpec::integer()
        .range(1.0, u32::MAX as f64)
        .describe("Maximum number of tokens to generate")
}

pub(crate) fn top_p_field() -> FieldSpec {
    FieldSpec::number()
        .range(0.0, 1.0)
        .describe("Nucleus sampling threshold (0-1)")
}

pub(crate) fn top_k_field() -> FieldSpec {
    FieldSpec::integer()
        .range(1.0, u32::MAX as f64)
        .describe("Sample from the k most likely tokens")
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording backend for handler tests

    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::gemini::ModelInfo;

    #[derive(Default)]
    pub struct MockBackend {
        pub response: Mutex<Option<Result<GenerateContentResponse>>>,
        pub calls: Mutex<Vec<(String, GenerateContentRequest)>>,
    }

    impl MockBackend {
        pub fn replying(response: GenerateContentResponse) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(Ok(response))),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(err: GeminiMcpError) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(Err(err))),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn last_call(&self) -> (String, GenerateContentRequest) {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerationBackend for MockBackend {
        async fn generate_content(
            &self,
            model: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), request.clone()));
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(GenerateContentResponse::default()))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    pub fn text_response(text: &str) -> GenerateContentResponse {
        serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap()
    }

    pub fn context(backend: Arc<MockBackend>) -> Arc<ToolContext> {
        Arc::new(ToolContext::new(backend, ModelSelection::unchecked(None), true))
    }
}
