//! Performance benchmarks for argument validation and tool dispatch

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

use gemini_mcp::gemini::{
    GenerateContentRequest, GenerateContentResponse, GenerationBackend, ModelInfo,
};
use gemini_mcp::mcp::{McpHandler, McpRequest, ToolInvocation, ToolServer};
use gemini_mcp::tools::{build_registry, chat, generate, video, ToolContext};
use gemini_mcp::{ModelSelection, Result};

/// Backend that answers instantly so only local overhead is measured
struct EchoBackend {
    reply: GenerateContentResponse,
}

#[async_trait]
impl GenerationBackend for EchoBackend {
    async fn generate_content(
        &self,
        _model: &str,
        _request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        Ok(self.reply.clone())
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}

fn tool_server() -> ToolServer {
    let reply = serde_json::from_value(json!({
        "candidates": [{"content": {"parts": [{"text": "benchmark reply"}]}}]
    }))
    .unwrap();
    let ctx = Arc::new(ToolContext::new(
        Arc::new(EchoBackend { reply }),
        ModelSelection::unchecked(None),
        true,
    ));
    ToolServer::new(Arc::new(build_registry(ctx).unwrap()))
}

fn chat_arguments(turns: usize) -> Value {
    let messages: Vec<Value> = (0..turns)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            json!({"role": role, "content": format!("Turn {} of the conversation", i)})
        })
        .collect();
    json!({"messages": messages, "temperature": 0.7, "max_output_tokens": 512})
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    let generate_schema = generate::schema();
    let args = json!({"prompt": "Explain ownership in Rust", "temperature": 0.4, "top_k": 40});
    group.bench_function("generate_valid", |b| {
        b.iter(|| generate_schema.validate(black_box(&args)))
    });

    let bad = json!({"prompt": "", "temperature": 3.5, "foo": 1, "bar": [1, 2]});
    group.bench_function("generate_invalid", |b| {
        b.iter(|| generate_schema.validate(black_box(&bad)))
    });

    let chat_schema = chat::schema();
    for turns in [1, 10, 100] {
        let args = chat_arguments(turns);
        group.throughput(Throughput::Elements(turns as u64));
        group.bench_with_input(BenchmarkId::new("chat", turns), &args, |b, args| {
            b.iter(|| chat_schema.validate(black_box(args)))
        });
    }

    group.finish();
}

fn bench_video_url(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_video_url");

    let inputs = [
        ("bare_id", "dQw4w9WgXcQ"),
        ("short_link", "https://youtu.be/dQw4w9WgXcQ?t=30"),
        ("watch", "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=1"),
        ("passthrough", "https://storage.example.com/clips/intro.mp4"),
    ];
    for (name, input) in inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| video::normalize_video_url(black_box(input)))
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = tool_server();

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    group.bench_function("status", |b| {
        b.iter(|| {
            runtime.block_on(
                server
                    .registry()
                    .dispatch(ToolInvocation::new("status", json!({}))),
            )
        })
    });

    group.bench_function("generate", |b| {
        b.iter(|| {
            runtime.block_on(server.registry().dispatch(ToolInvocation::new(
                "generate",
                json!({"prompt": "Say hi", "temperature": 0.2}),
            )))
        })
    });

    group.bench_function("unknown_tool", |b| {
        b.iter(|| {
            runtime.block_on(
                server
                    .registry()
                    .dispatch(ToolInvocation::new("nope", json!({}))),
            )
        })
    });

    group.bench_function("json_rpc_round_trip", |b| {
        let line = json!({
            "jsonrpc": "2.0", "id": 7, "method": "tools/call",
            "params": {"name": "generate", "arguments": {"prompt": "Say hi"}}
        })
        .to_string();
        b.iter(|| {
            let request: McpRequest = serde_json::from_str(black_box(&line)).unwrap();
            let response = runtime.block_on(server.handle_request(request));
            serde_json::to_string(&response).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_validation, bench_video_url, bench_dispatch);
criterion_main!(benches);
