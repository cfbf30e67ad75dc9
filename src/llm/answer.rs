//! Answer generation on top of an [`LLMClient`].
//!
//! The gate only needs text plus an optional self-reported confidence; this
//! module turns a question and its history into exactly that.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::confidence::extract_citations;
use crate::context::ConversationTurn;
use crate::error::Result;

use super::client::LLMClient;
use super::prompt::{build_user_prompt, SYSTEM_PROMPT};
use super::types::{ChatMessage, CompletionRequest};

/// Raw answer produced for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub text: String,
    /// Self-reported confidence, when the generator provides one
    pub self_confidence: Option<f64>,
}

/// Produces candidate answers.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Answer `question` given prior turns (oldest first).
    async fn generate(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<GeneratedAnswer>;
}

const SELF_CONFIDENCE_BASE: f64 = 0.7;
const SELF_CONFIDENCE_CITATION_BONUS: f64 = 0.15;
const SELF_CONFIDENCE_MARKER_BONUS: f64 = 0.02;
const SELF_CONFIDENCE_UNCERTAINTY_PENALTY: f64 = 0.10;

const CONFIDENCE_MARKERS: &[&str] = &[
    "administração pública",
    "servidor público",
    "estatutário",
    "princípio",
    "lei",
    "decreto",
    "constitucional",
];

const UNCERTAINTY_EXPRESSIONS: &[&str] = &[
    "possivelmente",
    "provavelmente",
    "creio que",
    "não tenho certeza",
    "pode ser que",
];

/// Self-reported confidence for a raw answer, in [0, 1].
pub fn estimate_self_confidence(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut confidence = SELF_CONFIDENCE_BASE;
    if !extract_citations(text).is_empty() {
        confidence += SELF_CONFIDENCE_CITATION_BONUS;
    }
    confidence += CONFIDENCE_MARKERS
        .iter()
        .filter(|m| lower.contains(*m))
        .count() as f64
        * SELF_CONFIDENCE_MARKER_BONUS;
    confidence -= UNCERTAINTY_EXPRESSIONS
        .iter()
        .filter(|e| lower.contains(*e))
        .count() as f64
        * SELF_CONFIDENCE_UNCERTAINTY_PENALTY;
    confidence.clamp(0.0, 1.0)
}

/// Sampling settings for answer generation.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: Option<String>,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.1,
            top_p: 0.8,
            top_k: 40,
            max_tokens: 2048,
        }
    }
}

/// [`AnswerGenerator`] backed by an LLM client.
pub struct LlmAnswerGenerator {
    client: Arc<dyn LLMClient>,
    settings: GenerationSettings,
}

impl LlmAnswerGenerator {
    pub fn new(client: Arc<dyn LLMClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    fn request(&self, question: &str, history: &[ConversationTurn]) -> CompletionRequest {
        let mut request = CompletionRequest::new()
            .with_system(SYSTEM_PROMPT)
            .with_message(ChatMessage::user(build_user_prompt(question, history)))
            .with_max_tokens(self.settings.max_tokens)
            .with_temperature(self.settings.temperature)
            .with_top_p(self.settings.top_p)
            .with_top_k(self.settings.top_k);
        if let Some(model) = &self.settings.model {
            request = request.with_model(model.clone());
        }
        request
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<GeneratedAnswer> {
        let response = self.client.complete(self.request(question, history)).await?;
        let text = response.content.trim().to_string();
        let self_confidence = estimate_self_confidence(&text);
        debug!(
            provider = self.client.provider(),
            model = %response.model,
            output_tokens = response.usage.output_tokens,
            self_confidence,
            "answer generated"
        );
        Ok(GeneratedAnswer {
            text,
            self_confidence: Some(self_confidence),
        })
    }
}
