//! Gemini MCP Server
//!
//! Run with: gemini-mcp-server

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use gemini_mcp::gemini::{GeminiClient, GenerationBackend};
use gemini_mcp::mcp::{McpServer, ToolServer};
use gemini_mcp::observability::{init_tracing, LogFormat};
use gemini_mcp::tools::{build_registry, ToolContext};
use gemini_mcp::{ModelSelection, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "gemini-mcp-server")]
#[command(about = "MCP server exposing Google Gemini as tools", version)]
struct Args {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model override (validated against the provider's model list at startup)
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_BASE_URL")]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "GEMINI_TIMEOUT_SECS", default_value = "120")]
    timeout_secs: u64,

    /// Log output format (logs always go to stderr)
    #[arg(long, env = "GEMINI_MCP_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging to stderr (stdout is for MCP protocol)
    init_tracing(args.log_format);

    let config =
        ServerConfig::from_parts(args.api_key, args.model, args.base_url, args.timeout_secs)
            .context("invalid configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let client = GeminiClient::new(
        config.api_key.clone(),
        config.base_url.clone(),
        config.timeout(),
    )
    .context("failed to build Gemini HTTP client")?;
    let backend: Arc<dyn GenerationBackend> = Arc::new(client);

    let models = ModelSelection::resolve(backend.as_ref(), config.model.clone()).await;

    let ctx = Arc::new(ToolContext::new(backend, models, true));
    let registry = build_registry(ctx).context("failed to register tools")?;
    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(ToolServer::new(Arc::new(registry)));

    tracing::info!("Gemini MCP server starting...");
    server.run().await.context("MCP transport failed")?;
    tracing::info!("Input closed, shutting down");

    Ok(())
}
