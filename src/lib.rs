//! Gemini MCP - Google Gemini as MCP tools
//!
//! Exposes text generation, multi-turn chat, search-grounded answers and video
//! analysis over MCP's JSON-RPC stdio transport. Tool arguments are checked
//! against closed schemas before any outbound call is made.

pub mod error;
pub mod gemini;
pub mod mcp;
pub mod observability;
pub mod schema;
pub mod tools;
pub mod types;

pub use error::{GeminiMcpError, Result};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
