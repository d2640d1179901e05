//! Multi-turn chat
//!
//! The conversation is stateless on the server: callers send the full history
//! on every call, ending with the turn they want answered.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    max_output_tokens_field, model_field, response_text, temperature_field, top_k_field,
    top_p_field, ToolContext,
};
use crate::error::Result;
use crate::gemini::{Content, GenerateContentRequest, GenerationConfig, Part};
use crate::mcp::{ToolAnnotations, ToolContent, ToolDefinition, ToolHandler};
use crate::schema::{FieldSpec, Schema, ValidatedArgs};

pub const NAME: &str = "chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    User,
    Assistant,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChatMessage {
    role: Role,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChatParams {
    messages: Vec<ChatMessage>,
    model: Option<String>,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
    top_p: Option<f64>,
    top_k: Option<u32>,
}

fn message_schema() -> Schema {
    Schema::new()
        .field(
            "role",
            FieldSpec::string()
                .one_of(&["user", "assistant"])
                .required()
                .describe("Who sent the message"),
        )
        .field(
            "content",
            FieldSpec::string()
                .non_empty()
                .required()
                .describe("Message text"),
        )
}

pub fn schema() -> Schema {
    Schema::new()
        .field(
            "messages",
            FieldSpec::array(FieldSpec::object(message_schema()))
                .min_items(1)
                .required()
                .describe("Conversation so far, oldest first"),
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
        "Continue a multi-turn conversation with Google Gemini. Pass the full message history on every call.",
        schema(),
        ChatTool { ctx },
    )
    .with_title("Gemini Chat")
    .with_annotations(ToolAnnotations {
        title: Some("Gemini Chat".to_string()),
        read_only_hint: Some(true),
        idempotent_hint: Some(false),
        open_world_hint: Some(true),
        ..Default::default()
    })
}

struct ChatTool {
    ctx: Arc<ToolContext>,
}

fn to_content(message: ChatMessage) -> Content {
    let parts = vec![Part::text(message.content)];
    match message.role {
        Role::User => Content::user(parts),
        Role::Assistant => Content::model(parts),
    }
}

#[async_trait]
impl ToolHandler for ChatTool {
    async fn call(&self, args: ValidatedArgs) -> Result<Vec<ToolContent>> {
        let params: ChatParams = args.into_typed()?;
        let model = self.ctx.model_for(params.model.as_deref());

        let request = GenerateContentRequest {
            contents: params.messages.into_iter().map(to_content).collect(),
            ..Default::default()
        }
        .with_generation_config(GenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
            top_p: params.top_p,
            top_k: params.top_k,
        });

        let response = self.ctx.generate(model, &request).await?;
        Ok(vec![ToolContent::text(response_text(&response)?)])
    }
}
