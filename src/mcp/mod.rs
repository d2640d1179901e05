//! MCP (Model Context Protocol) server implementation
//!
//! JSON-RPC over stdio for AI tool integration.

pub mod handler;
pub mod protocol;
pub mod registry;

pub use handler::ToolServer;
pub use protocol::{
    codes, methods, InitializeResult, McpHandler, McpRequest, McpResponse, McpServer,
    ToolAnnotations, ToolCallResult, ToolContent, ToolInfo,
};
pub use registry::{ToolDefinition, ToolHandler, ToolInvocation, ToolRegistry};
