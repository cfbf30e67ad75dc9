//! # oraculo
//!
//! Confidence-gated answering for the Oráculo de Concursos Públicos chat bot.
//! An LLM drafts an answer to a civil-service exam question; a deterministic
//! rule-based pipeline decides whether that answer is trustworthy enough to
//! deliver, and otherwise replies with a safe refusal.
//!
//! ## Core Components
//!
//! - **Confidence**: pattern library, signals, score composition, risks,
//!   consistency and the decision gate
//! - **Context**: bounded per-(user, channel) conversation history
//! - **LLM**: client trait, Gemini client, prompts and answer generation
//! - **Delivery**: mention stripping, chunking and the sources block
//! - **Orchestrator**: one message in, one verdict and its messages out
//!
//! ## Example
//!
//! ```rust,ignore
//! use oraculo::{DecisionGate, InMemoryContextStore};
//!
//! let gate = DecisionGate::default();
//! let verdict = gate.evaluate(
//!     "O que é estágio probatório?",
//!     "Conforme a Lei 8.112/90, art. 20, ...",
//!     Some(0.93),
//!     &[],
//! );
//! println!("{} -> {}", verdict.state, verdict.final_score);
//! ```

pub mod confidence;
pub mod config;
pub mod context;
pub mod delivery;
pub mod error;
pub mod llm;
pub mod orchestrator;

pub use confidence::{
    generate_report, ConfidenceReport, DecisionGate, HallucinationMonitor, RequestState,
    RiskItem, RiskKind, ScoreComposer, ScoredResponse, SignalExtractor, ThresholdConfig,
    Verdict,
};
pub use config::OraculoConfig;
pub use context::{
    ContextStore, ConversationKey, ConversationTurn, InMemoryContextStore, SqliteContextStore,
};
pub use error::{Error, Result, ScoringError};
pub use llm::{AnswerGenerator, GeminiClient, GeneratedAnswer, LLMClient, LlmAnswerGenerator};
pub use orchestrator::{BotReply, BotRequest, Orchestrator};
