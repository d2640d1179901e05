//! Google Gemini API access
//!
//! Typed request/response bodies plus the [`GenerationBackend`] seam that tool
//! handlers call through. [`GeminiClient`] is the production implementation.

mod client;
mod types;

pub use client::{redact, GeminiClient, GenerationBackend, DEFAULT_BASE_URL};
pub use types::*;
