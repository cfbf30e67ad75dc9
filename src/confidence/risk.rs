//! Advisory risk detection.
//!
//! Risks never block an answer; they are attached to the scored response
//! for review. Note the asymmetry with the composer: categorical adverbs are
//! reported once per occurrence, not once per pattern type.

use super::patterns::{
    categorical_patterns, CONTRADICTION_PAIRS, DATE_PATTERN, PERCENTAGE_PATTERN,
    SENTENCE_BOUNDARY, SOURCE_KEYWORD_PATTERN,
};
use super::types::{RiskItem, RiskKind};

/// Scans answers for hallucination-prone content.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskDetector;

impl RiskDetector {
    pub fn new() -> Self {
        Self
    }

    /// All risks in an answer, in a fixed order: numbers, percentages,
    /// categorical claims, contradiction.
    pub fn detect(&self, text: &str) -> Vec<RiskItem> {
        let mut risks = Vec::new();

        let dates: Vec<&str> = DATE_PATTERN.find_iter(text).map(|m| m.as_str()).collect();
        if !dates.is_empty() && !SOURCE_KEYWORD_PATTERN.is_match(text) {
            risks.push(RiskItem::new(
                RiskKind::UnsourcedNumbers,
                "Números específicos mencionados sem citação de fonte",
                format!("Números encontrados: {}", dates.join(", ")),
            ));
        }

        let percentages: Vec<&str> = PERCENTAGE_PATTERN
            .find_iter(text)
            .map(|m| m.as_str())
            .collect();
        if !percentages.is_empty() {
            risks.push(RiskItem::new(
                RiskKind::SpecificPercentages,
                "Percentuais específicos que podem não estar atualizados",
                format!("Percentuais: {}", percentages.join(", ")),
            ));
        }

        for (word, re) in categorical_patterns() {
            for found in re.find_iter(text) {
                risks.push(RiskItem::new(
                    RiskKind::CategoricalClaim,
                    "Afirmação muito categórica que pode ter exceções",
                    format!("Padrão encontrado: {} (posição {})", word, found.start()),
                ));
            }
        }

        if let Some((first, second)) = find_contradiction(text) {
            risks.push(RiskItem::new(
                RiskKind::PossibleContradiction,
                "Possível contradição interna detectada",
                format!(
                    "'{}' / '{}' em frases consecutivas; verificação manual recomendada",
                    first, second
                ),
            ));
        }

        risks
    }
}

/// First antonym pair found across adjacent sentences, if any.
pub fn find_contradiction(text: &str) -> Option<(&'static str, &'static str)> {
    let sentences: Vec<String> = SENTENCE_BOUNDARY
        .split(text)
        .map(|s| s.to_lowercase())
        .collect();

    for pair in sentences.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        for &(a, b) in CONTRADICTION_PAIRS {
            if current.contains(a) && next.contains(b) {
                return Some((a, b));
            }
            if current.contains(b) && next.contains(a) {
                return Some((b, a));
            }
        }
    }
    None
}
