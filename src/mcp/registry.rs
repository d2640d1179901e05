//! Tool registry and dispatcher
//!
//! The registry is populated once at startup and then shared read-only. Every
//! `tools/call` goes through [`ToolRegistry::dispatch`]:
//!
//! ```text
//! lookup → validate → invoke handler → normalize into ToolCallResult
//! ```
//!
//! Dispatch never fails at the protocol level. Unknown tools, invalid
//! arguments and handler failures all come back as `isError: true` envelopes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::protocol::{ToolAnnotations, ToolCallResult, ToolContent, ToolInfo};
use crate::error::{GeminiMcpError, Result};
use crate::schema::{Schema, ValidatedArgs};

/// Executes a tool once its arguments have passed schema validation
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ValidatedArgs) -> Result<Vec<ToolContent>>;
}

/// A named tool: schema, handler and advisory metadata
pub struct ToolDefinition {
    pub name: String,
    pub title: Option<String>,
    pub description: String,
    pub input_schema: Schema,
    pub annotations: Option<ToolAnnotations>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Schema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: description.into(),
            input_schema,
            annotations: None,
            handler: Arc::new(handler),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Public metadata advertised through `tools/list`
    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.to_json_schema(),
            annotations: self.annotations.clone(),
        }
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// A single `tools/call` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(Map::new())
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Name → tool mapping, in registration order
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A name collision is a startup configuration error.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<()> {
        if self.index.contains_key(&definition.name) {
            return Err(GeminiMcpError::DuplicateTool(definition.name));
        }
        tracing::debug!("Registered tool {}", definition.name);
        self.index.insert(definition.name.clone(), self.tools.len());
        self.tools.push(definition);
        Ok(())
    }

    /// Snapshot of every tool's public metadata, in registration order
    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(ToolDefinition::info).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Route one invocation and normalize its outcome
    pub async fn dispatch(&self, invocation: ToolInvocation) -> ToolCallResult {
        let started = Instant::now();
        let ToolInvocation { name, arguments } = invocation;

        let Some(tool) = self.get(&name) else {
            tracing::warn!(tool = %name, "Unknown tool requested");
            return ToolCallResult::error(GeminiMcpError::UnknownTool(name).to_string());
        };

        let arguments = match arguments {
            Value::Null => empty_arguments(),
            other => other,
        };

        let args = match tool.input_schema.validate(&arguments) {
            Ok(args) => args,
            Err(e) => {
                tracing::info!(
                    tool = %name,
                    violations = e.violations().len(),
                    "Rejected arguments: {}",
                    e
                );
                let detail = e
                    .first()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| e.to_string());
                return ToolCallResult::error(format!("Invalid arguments for {}: {}", name, detail));
            }
        };

        match tool.handler.call(args).await {
            Ok(content) => {
                tracing::info!(
                    tool = %name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                ToolCallResult::success(content)
            }
            Err(e) => {
                let kind = e
                    .upstream_kind()
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "local".to_string());
                tracing::warn!(
                    tool = %name,
                    kind = %kind,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call failed: {}",
                    e.user_message()
                );
                ToolCallResult::error(e.user_message())
            }
        }
    }
}
