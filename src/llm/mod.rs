//! LLM access: client trait, Gemini client, prompts and answer generation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oraculo::llm::{ClientConfig, GeminiClient, GenerationSettings, LlmAnswerGenerator};
//!
//! let client = GeminiClient::new(
//!     ClientConfig::new("your-api-key").with_default_model("gemini-2.5-pro"),
//! )?;
//! let generator = LlmAnswerGenerator::new(Arc::new(client), GenerationSettings::default());
//!
//! let answer = generator.generate("O que é estágio probatório?", &[]).await?;
//! println!("{} ({:?})", answer.text, answer.self_confidence);
//! ```

mod answer;
mod client;
mod prompt;
mod types;

pub use answer::{
    estimate_self_confidence, AnswerGenerator, GeneratedAnswer, GenerationSettings,
    LlmAnswerGenerator,
};
pub use client::{ClientConfig, GeminiClient, LLMClient};
pub use prompt::{build_user_prompt, format_context, PROMPT_CONTEXT_TURNS, SYSTEM_PROMPT};
pub use types::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, StopReason, TokenUsage,
};
