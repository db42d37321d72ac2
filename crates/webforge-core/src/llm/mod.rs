//! LLM integration - OpenAI-compatible chat completions
//!
//! This module provides:
//! - HTTP client for chat completions, built from one credential
//! - Request/response types matching the OpenAI chat API
//! - Mapping of HTTP failures to typed errors
//! - The system prompt used for web code generation

mod client;
mod prompt;
mod types;

pub use client::{EMPTY_GENERATION_TEXT, LlmClient, LlmClientBuilder, map_error_response};
pub use prompt::{SYSTEM_PROMPT, project_context, system_prompt};
pub use types::{
    ApiErrorBody, ApiErrorDetail, ChatRequest, ChatResponse, Choice, FinishReason, LlmResponse,
    Message, MessageRole, Usage,
};
