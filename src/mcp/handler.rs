//! JSON-RPC method routing on top of the tool registry

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::protocol::{codes, methods, InitializeResult, McpHandler, McpRequest, McpResponse};
use super::registry::{ToolInvocation, ToolRegistry};
use crate::error::GeminiMcpError;

/// MCP request handler serving a frozen tool registry
#[derive(Debug, Clone)]
pub struct ToolServer {
    registry: Arc<ToolRegistry>,
}

impl ToolServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

#[async_trait]
impl McpHandler for ToolServer {
    async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        if request.is_notification() {
            match request.method.as_str() {
                methods::INITIALIZED => tracing::info!("Client initialized"),
                methods::CANCELLED => tracing::debug!("Client cancelled a request"),
                other => tracing::debug!("Ignoring notification {}", other),
            }
            return None;
        }

        if request.jsonrpc != "2.0" {
            return Some(McpResponse::error(
                request.id,
                codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        let response = match request.method.as_str() {
            methods::INITIALIZE => {
                let result = InitializeResult::default();
                McpResponse::success(request.id, json!(result))
            }
            methods::PING => McpResponse::success(request.id, json!({})),
            methods::LIST_TOOLS => {
                let tools = self.registry.list();
                McpResponse::success(request.id, json!({ "tools": tools }))
            }
            methods::CALL_TOOL => {
                let invocation: ToolInvocation = match serde_json::from_value(request.params) {
                    Ok(invocation) => invocation,
                    Err(e) => {
                        let err = GeminiMcpError::InvalidInput(format!("tools/call params: {}", e));
                        return Some(McpResponse::from_error(request.id, err));
                    }
                };
                let result = self.registry.dispatch(invocation).await;
                McpResponse::success(request.id, json!(result))
            }
            _ => McpResponse::error(
                request.id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };

        Some(response)
    }
}
