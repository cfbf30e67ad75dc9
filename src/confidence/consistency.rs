//! Contextual consistency between a question and its answer.
//!
//! A binary gate: either the answer shares a domain keyword with the
//! question, or the final score is multiplied by [`INCONSISTENCY_MULTIPLIER`].

use std::collections::BTreeSet;

use tracing::warn;

use crate::context::ConversationTurn;

use super::patterns::DOMAIN_KEYWORDS;

/// Multiplier applied when question and answer share no domain keyword.
pub const INCONSISTENCY_MULTIPLIER: f64 = 0.7;

/// Multiplier for consistent (or keyword-free) questions.
pub const CONSISTENT_MULTIPLIER: f64 = 1.0;

/// Domain keywords present as whitespace tokens of `text`, lowercased.
pub fn domain_keywords(text: &str) -> BTreeSet<&'static str> {
    let lower = text.to_lowercase();
    let tokens: BTreeSet<&str> = lower.split_whitespace().collect();
    DOMAIN_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| tokens.contains(kw))
        .collect()
}

/// Keyword gate between a question and an answer: 0.7 or 1.0.
pub fn check_consistency(question: &str, answer: &str) -> f64 {
    multiplier_for(&domain_keywords(question), answer)
}

/// Like [`check_consistency`], but a follow-up question without domain
/// keywords borrows them from the most recent prior question that has any.
///
/// `window` is ordered oldest first.
pub fn check_in_context(question: &str, answer: &str, window: &[ConversationTurn]) -> f64 {
    let mut question_keywords = domain_keywords(question);
    if question_keywords.is_empty() {
        if let Some(previous) = window
            .iter()
            .rev()
            .map(|turn| domain_keywords(&turn.question))
            .find(|kws| !kws.is_empty())
        {
            question_keywords = previous;
        }
    }
    multiplier_for(&question_keywords, answer)
}

fn multiplier_for(question_keywords: &BTreeSet<&'static str>, answer: &str) -> f64 {
    if question_keywords.is_empty() {
        return CONSISTENT_MULTIPLIER;
    }
    let answer_keywords = domain_keywords(answer);
    if question_keywords.is_disjoint(&answer_keywords) {
        warn!(
            question_keywords = ?question_keywords,
            "answer shares no domain keyword with the question"
        );
        INCONSISTENCY_MULTIPLIER
    } else {
        CONSISTENT_MULTIPLIER
    }
}
