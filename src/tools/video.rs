//! Video analysis for YouTube and other public video URLs

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{max_output_tokens_field, model_field, response_text, temperature_field, ToolContext};
use crate::error::{GeminiMcpError, Result};
use crate::gemini::{Content, GenerateContentRequest, GenerationConfig, Part, VideoMetadata};
use crate::mcp::{ToolAnnotations, ToolContent, ToolDefinition, ToolHandler};
use crate::schema::{FieldSpec, Schema, ValidatedArgs};

pub const NAME: &str = "analyze_video";

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

static BARE_VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid regex"));

static SHORT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:www\.)?youtu\.be/([A-Za-z0-9_-]+)").expect("valid regex")
});

static YOUTUBE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:www\.|m\.|music\.)?youtube(?:-nocookie)?\.com/(?:shorts|embed|live|v)/([A-Za-z0-9_-]+)",
    )
    .expect("valid regex")
});

static YOUTUBE_WATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:www\.|m\.|music\.)?youtube\.com/watch\?(?:[^#]*&)?v=([A-Za-z0-9_-]+)",
    )
    .expect("valid regex")
});

/// Canonical form of a video reference.
///
/// YouTube short links, shorts/embed/live paths, mobile and music hosts, watch
/// URLs with extra parameters and bare video ids all become
/// `https://www.youtube.com/watch?v=<id>`. Other http(s) URLs pass through.
pub fn normalize_video_url(input: &str) -> Result<String> {
    let input = input.trim();

    if BARE_VIDEO_ID.is_match(input) {
        return Ok(format!("{}{}", WATCH_URL_PREFIX, input));
    }

    for pattern in [&*SHORT_LINK, &*YOUTUBE_PATH, &*YOUTUBE_WATCH] {
        if let Some(id) = pattern.captures(input).and_then(|c| c.get(1)) {
            return Ok(format!("{}{}", WATCH_URL_PREFIX, id.as_str()));
        }
    }

    let lower = input.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        return Ok(input.to_string());
    }

    Err(GeminiMcpError::InvalidInput(format!(
        "video_url must be a YouTube URL, a YouTube video id, or an http(s) URL (got \"{}\")",
        input
    )))
}

/// Offset as a protobuf duration string
fn offset(seconds: u64) -> String {
    format!("{}s", seconds)
}

/// "Segment: 30s - 90s" style description, if any offset was given
pub fn describe_segment(start: Option<u64>, end: Option<u64>) -> Option<String> {
    match (start, end) {
        (None, None) => None,
        (start, end) => Some(format!(
            "Segment: {} - {}",
            start.map(offset).unwrap_or_else(|| "start".to_string()),
            end.map(offset).unwrap_or_else(|| "end".to_string()),
        )),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VideoParams {
    video_url: String,
    prompt: String,
    model: Option<String>,
    start_seconds: Option<u64>,
    end_seconds: Option<u64>,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
}

pub fn schema() -> Schema {
    Schema::new()
        .field(
            "video_url",
            FieldSpec::string()
                .non_empty()
                .required()
                .describe("YouTube URL (any form), YouTube video id, or public video URL"),
        )
        .field(
            "prompt",
            FieldSpec::string()
                .non_empty()
                .required()
                .describe("What to do with the video, e.g. summarize or answer a question"),
        )
        .field("model", model_field())
        .field(
            "start_seconds",
            FieldSpec::integer()
                .minimum(0.0)
                .describe("Analyze from this offset, in seconds"),
        )
        .field(
            "end_seconds",
            FieldSpec::integer()
                .minimum(0.0)
                .describe("Analyze up to this offset, in seconds"),
        )
        .field("temperature", temperature_field())
        .field("max_output_tokens", max_output_tokens_field())
}

pub fn definition(ctx: Arc<ToolContext>) -> ToolDefinition {
    ToolDefinition::new(
        NAME,
        "Analyze a YouTube or public video with Gemini: summarize, transcribe, or answer questions, optionally limited to a time segment.",
        schema(),
        VideoTool { ctx },
    )
    .with_title("Gemini Video Analysis")
    .with_annotations(ToolAnnotations {
        title: Some("Gemini Video Analysis".to_string()),
        read_only_hint: Some(true),
        idempotent_hint: Some(false),
        open_world_hint: Some(true),
        ..Default::default()
    })
}

struct VideoTool {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for VideoTool {
    async fn call(&self, args: ValidatedArgs) -> Result<Vec<ToolContent>> {
        let params: VideoParams = args.into_typed()?;

        if let (Some(start), Some(end)) = (params.start_seconds, params.end_seconds) {
            if end <= start {
                return Err(GeminiMcpError::InvalidInput(format!(
                    "end_seconds ({}) must be greater than start_seconds ({})",
                    end, start
                )));
            }
        }

        let video_url = normalize_video_url(&params.video_url)?;
        let model = self.ctx.model_for(params.model.as_deref());

        let clip = (params.start_seconds.is_some() || params.end_seconds.is_some()).then(|| {
            VideoMetadata {
                start_offset: params.start_seconds.map(offset),
                end_offset: params.end_seconds.map(offset),
            }
        });

        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::file(video_url.clone(), None, clip),
                Part::text(params.prompt),
            ])],
            ..Default::default()
        }
        .with_generation_config(GenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
            ..Default::default()
        });

        let response = self.ctx.generate(model, &request).await?;
        let text = response_text(&response)?;

        let mut header = format!("Video: {}", video_url);
        if let Some(segment) = describe_segment(params.start_seconds, params.end_seconds) {
            header.push('\n');
            header.push_str(&segment);
        }

        Ok(vec![ToolContent::text(format!("{}\n\n{}", header, text))])
    }
}
