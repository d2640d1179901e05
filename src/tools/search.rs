//! Web-search-grounded generation with citations

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{max_output_tokens_field, model_field, response_text, temperature_field, ToolContext};
use crate::error::Result;
use crate::gemini::{GenerateContentRequest, GenerationConfig, GroundingMetadata, Tool};
use crate::mcp::{ToolAnnotations, ToolContent, ToolDefinition, ToolHandler};
use crate::schema::{FieldSpec, Schema, ValidatedArgs};

pub const NAME: &str = "search";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchParams {
    query: String,
    model: Option<String>,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
}

pub fn schema() -> Schema {
    Schema::new()
        .field(
            "query",
            FieldSpec::string()
                .non_empty()
                .required()
                .describe("Question or topic to research on the web"),
        )
        .field("model", model_field())
        .field("temperature", temperature_field())
        .field("max_output_tokens", max_output_tokens_field())
}

pub fn definition(ctx: Arc<ToolContext>) -> ToolDefinition {
    ToolDefinition::new(
        NAME,
        "Answer a question with Gemini grounded in live Google Search results. Returns the answer followed by the search queries used and the cited sources.",
        schema(),
        SearchTool { ctx },
    )
    .with_title("Gemini Search")
    .with_annotations(ToolAnnotations {
        title: Some("Gemini Search".to_string()),
        read_only_hint: Some(true),
        idempotent_hint: Some(false),
        open_world_hint: Some(true),
        ..Default::default()
    })
}

struct SearchTool {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for SearchTool {
    async fn call(&self, args: ValidatedArgs) -> Result<Vec<ToolContent>> {
        let params: SearchParams = args.into_typed()?;
        let model = self.ctx.model_for(params.model.as_deref());

        let request = GenerateContentRequest::from_prompt(params.query)
            .with_generation_config(GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
                ..Default::default()
            })
            .with_tool(Tool::google_search());

        let response = self.ctx.generate(model, &request).await?;
        let text = response_text(&response)?;

        Ok(vec![ToolContent::text(format_grounded(
            &text,
            response.grounding_metadata(),
        ))])
    }
}

/// Append "Search Queries" and then "Sources" sections for whatever
/// citation data is present. Without metadata the text is returned as-is.
pub fn format_grounded(text: &str, grounding: Option<&GroundingMetadata>) -> String {
    let mut out = text.to_string();
    let Some(grounding) = grounding else {
        return out;
    };

    let queries: Vec<&str> = grounding
        .web_search_queries
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .collect();
    if !queries.is_empty() {
        out.push_str("\n\n**Search Queries:**");
        for query in queries {
            let _ = write!(out, "\n- {}", query);
        }
    }

    let sources: Vec<(&str, &str)> = grounding
        .grounding_chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter(|web| !web.uri.is_empty())
        .map(|web| {
            let title = web
                .title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(&web.uri);
            (title, web.uri.as_str())
        })
        .collect();
    if !sources.is_empty() {
        out.push_str("\n\n**Sources:**");
        for (i, (title, uri)) in sources.iter().enumerate() {
            let _ = write!(out, "\n{}. [{}]({})", i + 1, title, uri);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{GroundingChunk, WebSource};
    use crate::mcp::{ToolInvocation, ToolRegistry};
    use crate::tools::testing::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn metadata(queries: &[&str], sources: &[(&str, Option<&str>)]) -> GroundingMetadata {
        GroundingMetadata {
            web_search_queries: queries.iter().map(|q| q.to_string()).collect(),
            grounding_chunks: sources
                .iter()
                .map(|(uri, title)| GroundingChunk {
                    web: Some(WebSource {
                        uri: uri.to_string(),
                        title: title.map(str::to_string),
                    }),
                })
                .collect(),
        }
    }

    #[test]
    fn test_plain_text_without_metadata() {
        assert_eq!(format_grounded("answer", None), "answer");
        assert_eq!(
            format_grounded("answer", Some(&GroundingMetadata::default())),
            "answer"
        );
    }

    #[test]
    fn test_queries_before_sources() {
        let formatted = format_grounded(
            "Rust 1.85 shipped the 2024 edition.",
            Some(&metadata(
                &["rust 2024 edition release"],
                &[
                    ("https://blog.rust-lang.org/2025/02/20", Some("Rust Blog")),
                    ("https://doc.rust-lang.org/edition-guide", None),
                ],
            )),
        );

        assert_eq!(
            formatted,
            "Rust 1.85 shipped the 2024 edition.\n\n\
             **Search Queries:**\n\
             - rust 2024 edition release\n\n\
             **Sources:**\n\
             1. [Rust Blog](https://blog.rust-lang.org/2025/02/20)\n\
             2. [https://doc.rust-lang.org/edition-guide](https://doc.rust-lang.org/edition-guide)"
        );
        let queries_at = formatted.find("**Search Queries:**").unwrap();
        let sources_at = formatted.find("**Sources:**").unwrap();
        assert!(queries_at < sources_at);
    }

    #[test]
    fn test_sources_only() {
        let formatted = format_grounded(
            "text",
            Some(&metadata(&[], &[("https://example.com", Some("Example"))])),
        );
        assert!(!formatted.contains("Search Queries"));
        assert!(formatted.ends_with("**Sources:**\n1. [Example](https://example.com)"));
    }

    #[tokio::test]
    async fn test_attaches_google_search_tool() {
        let response = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "It is sunny."}]},
                "groundingMetadata": {
                    "webSearchQueries": ["weather today"],
                    "groundingChunks": [
                        {"web": {"uri": "https://weather.example", "title": "Weather"}}
                    ]
                }
            }]
        }))
        .unwrap();
        let backend = MockBackend::replying(response);

        let mut registry = ToolRegistry::new();
        registry
            .register(definition(context(Arc::clone(&backend))))
            .unwrap();
        let result = registry
            .dispatch(ToolInvocation::new(NAME, json!({"query": "weather today?"})))
            .await;

        assert!(!result.is_error());
        assert!(result.first_text().unwrap().starts_with("It is sunny."));
        assert!(result.first_text().unwrap().contains("- weather today"));

        let (_, request) = backend.last_call();
        assert_eq!(request.tools, vec![Tool::google_search()]);
    }
}
