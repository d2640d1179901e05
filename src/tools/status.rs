//! Server status report

use std::sync::Arc;

use async_trait::async_trait;

use super::ToolContext;
use crate::error::Result;
use crate::mcp::{ToolAnnotations, ToolContent, ToolDefinition, ToolHandler};
use crate::schema::{Schema, ValidatedArgs};

pub const NAME: &str = "status";

/// Takes no arguments; any supplied field is rejected
pub fn schema() -> Schema {
    Schema::new()
}

pub fn definition(ctx: Arc<ToolContext>) -> ToolDefinition {
    ToolDefinition::new(
        NAME,
        "Report which Gemini model the server is using and whether an API key is configured",
        schema(),
        StatusTool { ctx },
    )
    .with_title("Gemini Server Status")
    .with_annotations(ToolAnnotations {
        title: Some("Gemini Server Status".to_string()),
        read_only_hint: Some(true),
        idempotent_hint: Some(true),
        open_world_hint: Some(false),
        ..Default::default()
    })
}

struct StatusTool {
    ctx: Arc<ToolContext>,
}

/// Plain-text status report; never includes the credential itself
pub fn render_status(ctx: &ToolContext) -> String {
    let models = &ctx.models;
    let mut lines = vec![
        format!("Gemini MCP server v{}", crate::VERSION),
        format!("Active model: {}", models.active),
        format!(
            "Configured model: {}",
            models.configured.as_deref().unwrap_or("(none)")
        ),
        format!("Fallback model: {}", models.fallback),
        format!(
            "API key configured: {}",
            if ctx.api_key_configured { "yes" } else { "no" }
        ),
    ];
    if models.is_fallback() {
        lines.push(
            "Note: the configured model was not recognized, so the fallback model is in use."
                .to_string(),
        );
    }
    lines.join("\n")
}

#[async_trait]
impl ToolHandler for StatusTool {
    async fn call(&self, _args: ValidatedArgs) -> Result<Vec<ToolContent>> {
        Ok(vec![ToolContent::text(render_status(&self.ctx))])
    }
}
