//! Core types for confidence scoring.
//!
//! Everything here is created fresh per request and owned by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::composer::ScoreBreakdown;

/// Kind of advisory risk flagged on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskKind {
    /// Dates or year pairs with no normative source in the text
    UnsourcedNumbers,
    /// Percentages, which go stale as legislation changes
    SpecificPercentages,
    /// Absolute adverbs (sempre, nunca, ...)
    CategoricalClaim,
    /// Antonyms across adjacent sentences
    PossibleContradiction,
}

impl std::fmt::Display for RiskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsourcedNumbers => write!(f, "UNSOURCED_NUMBERS"),
            Self::SpecificPercentages => write!(f, "SPECIFIC_PERCENTAGES"),
            Self::CategoricalClaim => write!(f, "CATEGORICAL_CLAIM"),
            Self::PossibleContradiction => write!(f, "POSSIBLE_CONTRADICTION"),
        }
    }
}

/// An advisory, non-blocking flag raised about an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskItem {
    pub kind: RiskKind,
    pub description: String,
    /// Free-form evidence, e.g. matched substrings
    pub detail: String,
}

impl RiskItem {
    pub fn new(kind: RiskKind, description: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            detail: detail.into(),
        }
    }
}

/// States of a single request through the gate.
///
/// `Received -> FastGateCheck -> {RejectedFast | Scoring}`,
/// `Scoring -> {RejectedFinal | Accepted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Received,
    FastGateCheck,
    RejectedFast,
    Scoring,
    RejectedFinal,
    Accepted,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::RejectedFast | Self::RejectedFinal | Self::Accepted)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::FastGateCheck)
                | (Self::FastGateCheck, Self::RejectedFast)
                | (Self::FastGateCheck, Self::Scoring)
                | (Self::Scoring, Self::RejectedFinal)
                | (Self::Scoring, Self::Accepted)
        )
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "RECEIVED"),
            Self::FastGateCheck => write!(f, "FAST_GATE_CHECK"),
            Self::RejectedFast => write!(f, "REJECTED_FAST"),
            Self::Scoring => write!(f, "SCORING"),
            Self::RejectedFinal => write!(f, "REJECTED_FINAL"),
            Self::Accepted => write!(f, "ACCEPTED"),
        }
    }
}

/// A fully scored candidate answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResponse {
    /// The candidate answer as produced by the LLM
    pub text: String,
    /// Self-reported confidence, if the LLM gave one
    pub llm_confidence: Option<f64>,
    /// Distinct citation-like substrings, in text order, at most 5
    pub cited_sources: Vec<String>,
    pub heuristic_score: f64,
    pub breakdown: ScoreBreakdown,
    /// 1.0, or 0.7 when question and answer share no domain keyword
    pub consistency_multiplier: f64,
    pub final_score: f64,
    pub accepted: bool,
    pub risks: Vec<RiskItem>,
}

/// Outcome of running a request through the decision gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Terminal state reached
    pub state: RequestState,
    /// Text to deliver: the annotated answer or a refusal
    pub reply: String,
    /// Score recorded for this turn
    pub final_score: f64,
    /// Present whenever the heuristic pipeline ran to completion
    pub scored: Option<ScoredResponse>,
    pub decided_at: DateTime<Utc>,
}

impl Verdict {
    pub fn accepted(&self) -> bool {
        self.state == RequestState::Accepted
    }

    /// Cited sources to show next to an accepted answer.
    pub fn sources(&self) -> &[String] {
        match (&self.scored, self.accepted()) {
            (Some(scored), true) => &scored.cited_sources,
            _ => &[],
        }
    }

    pub fn risks(&self) -> &[RiskItem] {
        self.scored.as_ref().map(|s| s.risks.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_transitions() {
        use RequestState::*;
        assert!(Received.can_transition_to(FastGateCheck));
        assert!(FastGateCheck.can_transition_to(RejectedFast));
        assert!(FastGateCheck.can_transition_to(Scoring));
        assert!(Scoring.can_transition_to(Accepted));
        assert!(Scoring.can_transition_to(RejectedFinal));
        assert!(!Received.can_transition_to(Scoring));
        assert!(!Accepted.can_transition_to(Scoring));
        assert!(RejectedFast.is_terminal());
        assert!(!Scoring.is_terminal());
    }

    #[test]
    fn test_risk_kind_serialization() {
        let json = serde_json::to_string(&RiskKind::CategoricalClaim).unwrap();
        assert_eq!(json, "\"CATEGORICAL_CLAIM\"");
        assert_eq!(RiskKind::UnsourcedNumbers.to_string(), "UNSOURCED_NUMBERS");
    }

    #[test]
    fn test_rejected_verdict_has_no_sources() {
        let verdict = Verdict {
            state: RequestState::RejectedFast,
            reply: "recusa".to_string(),
            final_score: 0.5,
            scored: None,
            decided_at: Utc::now(),
        };
        assert!(!verdict.accepted());
        assert!(verdict.sources().is_empty());
        assert!(verdict.risks().is_empty());
    }
}
