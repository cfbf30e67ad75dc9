//! Heuristic score composition.
//!
//! The score is a pure sum of independent terms clamped to [0, 1]:
//!
//! | term | value |
//! |---|---|
//! | base | 0.50 |
//! | each high-confidence pattern *type* present | +0.15 |
//! | each hedge pattern *type* present | -0.20 |
//! | technical terms | +0.02 each, at most +0.20 |
//! | cited sources | +0.03 each, at most +0.15 |
//! | each cited source naming a trusted instrument | +0.05 |
//! | list formatting | +0.05 |
//! | explanatory / practical / distinction markers | +0.03 each |
//! | 100..=2000 chars | +0.05 |
//! | < 50 chars | -0.10 |
//!
//! Pattern terms count each type once no matter how often it occurs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ScoringError;

use super::patterns::{PatternCategory, StructuralMarker, TRUSTED_SOURCES};
use super::signals::{SignalExtractor, Signals};

pub const BASE_SCORE: f64 = 0.5;
pub const HIGH_CONFIDENCE_BONUS: f64 = 0.15;
pub const HEDGE_PENALTY: f64 = 0.20;
pub const TECHNICAL_TERM_BONUS: f64 = 0.02;
pub const TECHNICAL_TERM_CAP: f64 = 0.20;
pub const CITATION_BONUS: f64 = 0.03;
pub const CITATION_CAP: f64 = 0.15;
pub const TRUSTED_SOURCE_BONUS: f64 = 0.05;
pub const LIST_FORMATTING_BONUS: f64 = 0.05;
pub const MARKER_BONUS: f64 = 0.03;
pub const LENGTH_BONUS: f64 = 0.05;
pub const SHORT_ANSWER_PENALTY: f64 = 0.10;

/// Every term of a composed score, kept for reports and debugging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub high_confidence: f64,
    pub hedge_penalty: f64,
    pub technical_terms: f64,
    pub citations: f64,
    pub trusted_sources: f64,
    pub structure: f64,
    pub length: f64,
}

impl ScoreBreakdown {
    /// Unclamped sum of all terms.
    pub fn raw(&self) -> f64 {
        self.base + self.high_confidence - self.hedge_penalty
            + self.technical_terms
            + self.citations
            + self.trusted_sources
            + self.structure
            + self.length
    }

    /// Final heuristic score in [0, 1].
    pub fn total(&self) -> f64 {
        self.raw().clamp(0.0, 1.0)
    }
}

/// Combines extracted signals into a heuristic confidence value.
#[derive(Debug, Clone, Default)]
pub struct ScoreComposer {
    extractor: SignalExtractor,
}

impl ScoreComposer {
    pub fn new(extractor: SignalExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &SignalExtractor {
        &self.extractor
    }

    /// Score an answer given its cited sources.
    pub fn compose(&self, text: &str, cited_sources: &[String]) -> Result<f64, ScoringError> {
        Ok(self.breakdown(text, cited_sources)?.total())
    }

    /// Score an answer and keep every term.
    pub fn breakdown(
        &self,
        text: &str,
        cited_sources: &[String],
    ) -> Result<ScoreBreakdown, ScoringError> {
        let signals = self.extractor.extract(text)?;
        Ok(compose_signals(&signals, cited_sources))
    }
}

/// Compose a breakdown from already-extracted signals.
pub fn compose_signals(signals: &Signals, cited_sources: &[String]) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown {
        base: BASE_SCORE,
        ..ScoreBreakdown::default()
    };

    for id in signals.matched_types(PatternCategory::HighConfidence) {
        debug!(pattern = %id, "high-confidence pattern present");
        breakdown.high_confidence += HIGH_CONFIDENCE_BONUS;
    }

    for id in signals.matched_types(PatternCategory::Hedge) {
        debug!(pattern = %id, "hedge pattern present");
        breakdown.hedge_penalty += HEDGE_PENALTY;
    }

    breakdown.technical_terms =
        (signals.technical_term_hits as f64 * TECHNICAL_TERM_BONUS).min(TECHNICAL_TERM_CAP);

    if !cited_sources.is_empty() {
        breakdown.citations = (cited_sources.len() as f64 * CITATION_BONUS).min(CITATION_CAP);
        breakdown.trusted_sources = cited_sources
            .iter()
            .filter(|source| is_trusted_source(source))
            .count() as f64
            * TRUSTED_SOURCE_BONUS;
    }

    for marker in StructuralMarker::ALL {
        if signals.structure.is_set(marker) {
            breakdown.structure += match marker {
                StructuralMarker::ListFormatting => LIST_FORMATTING_BONUS,
                _ => MARKER_BONUS,
            };
        }
    }

    breakdown.length = if (100..=2000).contains(&signals.char_count) {
        LENGTH_BONUS
    } else if signals.char_count < 50 {
        -SHORT_ANSWER_PENALTY
    } else {
        0.0
    };

    breakdown
}

/// Whether a cited source names one of the trusted instruments.
pub fn is_trusted_source(source: &str) -> bool {
    let lower = source.to_lowercase();
    TRUSTED_SOURCES.iter().any(|trusted| lower.contains(trusted))
}
