//! Anti-hallucination confidence scoring.
//!
//! A deterministic, rule-based filter that decides whether an LLM answer to a
//! civil-service exam question is trustworthy enough to deliver.
//!
//! # Pipeline
//!
//! 1. **Fast gate**: the LLM's self-reported confidence alone is compared
//!    with the threshold; below it, the request is refused immediately.
//! 2. **Signals**: the pattern library is applied to the answer
//!    ([`SignalExtractor`]).
//! 3. **Composition**: signals become a heuristic score ([`ScoreComposer`]).
//! 4. **Risks**: advisory flags for unsourced numbers, percentages,
//!    categorical claims and contradictions ([`RiskDetector`]).
//! 5. **Consistency**: question/answer keyword overlap ([`check_consistency`]).
//! 6. **Decision**: `0.7 * heuristic + 0.3 * llm`, times the consistency
//!    multiplier, accepted iff `>= threshold` ([`DecisionGate`]).
//!
//! ```rust,ignore
//! use oraculo::confidence::DecisionGate;
//!
//! let gate = DecisionGate::default();
//! let verdict = gate.evaluate(question, answer, Some(0.92), &history);
//! if verdict.accepted() {
//!     send(&verdict.reply);
//! }
//! ```
//!
//! Scoring is pure computation over immutable tables and is safe to call
//! from any number of tasks at once. The threshold is the only mutable
//! value and is updated atomically through [`ThresholdConfig::set`].

pub mod composer;
pub mod consistency;
pub mod gate;
pub mod monitor;
pub mod patterns;
mod proptest;
pub mod report;
pub mod risk;
pub mod signals;
pub mod types;

pub use composer::{compose_signals, ScoreBreakdown, ScoreComposer};
pub use consistency::{check_consistency, check_in_context};
pub use gate::{
    decide, fast_gate, safe_refusal, DecisionGate, ThresholdConfig,
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DISCLAIMER_THRESHOLD,
};
pub use monitor::{HallucinationMonitor, MonitorAlert, MonitorStats};
pub use patterns::{PatternCategory, PatternId};
pub use report::{generate_report, suggest_improvements, ConfidenceReport};
pub use risk::RiskDetector;
pub use signals::{extract_citations, SignalExtractor, Signals};
pub use types::{RequestState, RiskItem, RiskKind, ScoredResponse, Verdict};
