//! Single-prompt text generation

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    max_output_tokens_field, model_field, response_text, temperature_field, top_k_field,
    top_p_field, ToolContext,
};
use crate::error::Result;
use crate::gemini::{GenerateContentRequest, GenerationConfig};
use crate::mcp::{ToolAnnotations, ToolContent, ToolDefinition, ToolHandler};
use crate::schema::{FieldSpec, Schema, ValidatedArgs};

pub const NAME: &str = "generate";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GenerateParams {
    prompt: String,
    model: Option<String>,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
    top_p: Option<f64>,
    top_k: Option<u32>,
}

pub fn schema() -> Schema {
    Schema::new()
        .field(
            "prompt",
            FieldSpec::string()
                .non_empty()
                .required()
                .describe("The prompt to send to Gemini"),
        )
        .field("model", model_field())
        .field("temperature", temperature_field())
        .field("max_output_tokens", max_output_tokens_field())
        .field("top_p", top_p_field())
        .field("top_k", top_k_field())
}

pub fn definition(ctx: Arc<ToolContext>) -> ToolDefinition {
    ToolDefinition::new(
        NAME,
        "Generate text from a single prompt with Google Gemini",
        schema(),
        GenerateTool { ctx },
    )
    .with_title("Gemini Generate")
    .with_annotations(ToolAnnotations {
        title: Some("Gemini Generate".to_string()),
        read_only_hint: Some(true),
        idempotent_hint: Some(false),
        open_world_hint: Some(true),
        ..Default::default()
    })
}

struct GenerateTool {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for GenerateTool {
    async fn call(&self, args: ValidatedArgs) -> Result<Vec<ToolContent>> {
        let params: GenerateParams = args.into_typed()?;
        let model = self.ctx.model_for(params.model.as_deref());

        let request = GenerateContentRequest::from_prompt(params.prompt).with_generation_config(
            GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
                top_p: params.top_p,
                top_k: params.top_k,
            },
        );

        let response = self.ctx.generate(model, &request).await?;
        Ok(vec![ToolContent::text(response_text(&response)?)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{ToolInvocation, ToolRegistry};
    use crate::tools::testing::*;
    use serde_json::json;

    async fn call(
        backend: Arc<MockBackend>,
        args: serde_json::Value,
    ) -> crate::mcp::ToolCallResult {
        let mut registry = ToolRegistry::new();
        registry.register(definition(context(backend))).unwrap();
        registry.dispatch(ToolInvocation::new(NAME, args)).await
    }

    #[tokio::test]
    async fn test_forwards_sampling_parameters() {
        let backend = MockBackend::replying(text_response("Once upon a time"));
        let result = call(
            Arc::clone(&backend),
            json!({
                "prompt": "Tell a story",
                "model": "gemini-2.5-pro",
                "temperature": 0.9,
                "max_output_tokens": 512,
                "top_p": 0.95,
                "top_k": 40
            }),
        )
        .await;

        assert!(!result.is_error());
        assert_eq!(result.first_text(), Some("Once upon a time"));

        let (model, request) = backend.last_call();
        assert_eq!(model, "gemini-2.5-pro");
        assert_eq!(
            request.generation_config,
            Some(GenerationConfig {
                temperature: Some(0.9),
                max_output_tokens: Some(512),
                top_p: Some(0.95),
                top_k: Some(40),
            })
        );
        assert_eq!(
            request.contents[0].parts[0].text.as_deref(),
            Some("Tell a story")
        );
    }

    #[tokio::test]
    async fn test_defaults_to_active_model_without_config() {
        let backend = MockBackend::replying(text_response("ok"));
        call(Arc::clone(&backend), json!({"prompt": "hi"})).await;

        let (model, request) = backend.last_call();
        assert_eq!(model, crate::types::FALLBACK_MODEL);
        assert!(request.generation_config.is_none());
    }

    #[tokio::test]
    async fn test_rejects_unknown_field_without_calling_upstream() {
        let backend = MockBackend::replying(text_response("ok"));
        let result = call(Arc::clone(&backend), json!({"prompt": "hi", "foo": 1})).await;

        assert!(result.is_error());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_temperature_bounds() {
        for (temperature, ok) in [(json!(0), true), (json!(2), true), (json!(2.0001), false)] {
            let backend = MockBackend::replying(text_response("ok"));
            let result = call(backend, json!({"prompt": "hi", "temperature": temperature})).await;
            assert_eq!(!result.is_error(), ok, "temperature {temperature}");
        }
    }
}
