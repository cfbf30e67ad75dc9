//! Per-answer confidence report and improvement suggestions.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::composer::ScoreBreakdown;
use super::gate::{unknown_laws, DecisionGate};
use super::patterns::StructuralMarker;
use super::signals::Signals;
use super::types::RiskItem;

/// Heuristic score under which the generic suggestions are added.
pub const SUGGESTION_SCORE_FLOOR: f64 = 0.7;

/// Answers shorter than this (chars) are asked to expand.
pub const SUGGESTION_MIN_CHARS: usize = 100;

/// Measured facts about the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetails {
    pub cited_sources: usize,
    pub technical_terms: usize,
    pub length: usize,
    pub organised_structure: bool,
}

/// Everything known about one answer's heuristic confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    /// Heuristic score, before blending with LLM confidence
    pub score: f64,
    /// Whether the heuristic score alone meets the threshold
    pub approved: bool,
    pub timestamp: DateTime<Utc>,
    pub details: ReportDetails,
    pub breakdown: ScoreBreakdown,
    pub risks: Vec<RiskItem>,
    pub suggestions: Vec<String>,
    /// Cited law numbers missing from the known-statute table
    pub unknown_laws: Vec<String>,
    pub threshold: f64,
}

/// Build a report for `answer` using the gate's pipeline and current threshold.
pub fn generate_report(
    gate: &DecisionGate,
    question: &str,
    answer: &str,
    llm_confidence: Option<f64>,
) -> Result<ConfidenceReport> {
    let threshold = gate.threshold().get();
    let signals = gate.composer().extractor().extract(answer)?;
    let scored = gate.score_with_threshold(question, answer, llm_confidence, &[], threshold)?;
    let score = scored.heuristic_score;

    Ok(ConfidenceReport {
        score,
        approved: score >= threshold,
        timestamp: Utc::now(),
        details: ReportDetails {
            cited_sources: scored.cited_sources.len(),
            technical_terms: signals.technical_term_hits,
            length: signals.char_count,
            organised_structure: signals.structure.is_set(StructuralMarker::ListFormatting),
        },
        breakdown: scored.breakdown,
        risks: scored.risks,
        suggestions: suggest_improvements(answer, &signals, score),
        unknown_laws: unknown_laws(answer),
        threshold,
    })
}

/// Suggestions for raising an answer's confidence.
pub fn suggest_improvements(answer: &str, signals: &Signals, score: f64) -> Vec<String> {
    let mut suggestions = Vec::new();

    if score < SUGGESTION_SCORE_FLOOR {
        suggestions.push("Adicionar citações específicas de leis ou regulamentos".to_string());
        suggestions.push("Incluir exemplos práticos da aplicação".to_string());
        suggestions.push("Organizar informações em tópicos ou listas".to_string());
    }

    if !LEGAL_BASIS.is_match(answer) {
        suggestions.push("Referenciar base legal específica".to_string());
    }

    if signals.char_count < SUGGESTION_MIN_CHARS {
        suggestions.push("Expandir explicação com mais detalhes".to_string());
    }

    if signals.has_hedging() {
        suggestions.push("Remover expressões de incerteza ou qualificar melhor".to_string());
    }

    suggestions
}

static LEGAL_BASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:lei|decreto|artigo)").expect("invalid regex"));
