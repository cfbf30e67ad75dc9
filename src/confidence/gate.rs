//! Decision gate: the two-stage accept/reject policy.
//!
//! Stage one (fast gate) compares the LLM's self-reported confidence alone
//! against the threshold and rejects before any heuristic work. Stage two
//! blends the heuristic score with the LLM confidence, applies the
//! consistency multiplier and compares the result with the threshold.
//!
//! Accepted answers below the disclaimer threshold get a "verify with
//! official sources" footer; rejected answers are replaced by a fixed
//! refusal picked from the question's wording.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::context::ConversationTurn;
use crate::error::{Result, ScoringError};

use super::composer::{compose_signals, ScoreComposer};
use super::consistency::check_in_context;
use super::patterns::{known_law, LAW_NUMBER_PATTERN};
use super::risk::RiskDetector;
use super::signals::extract_citations;
use super::types::{RequestState, ScoredResponse, Verdict};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.9;
pub const MIN_CONFIDENCE_THRESHOLD: f64 = 0.5;
pub const MAX_CONFIDENCE_THRESHOLD: f64 = 1.0;
pub const DEFAULT_DISCLAIMER_THRESHOLD: f64 = 0.95;

/// Weight of the heuristic score in the blend.
pub const HEURISTIC_WEIGHT: f64 = 0.7;
/// Weight of the LLM's self-reported confidence in the blend.
pub const LLM_WEIGHT: f64 = 0.3;

/// Score recorded when scoring fails.
pub const ERROR_SCORE: f64 = 0.1;

pub const INTERNAL_ERROR_MESSAGE: &str = "❌ Erro interno na validação da resposta.";

pub const DISCLAIMER: &str = "\n\n⚠️ *Sempre confira informações em fontes oficiais antes de estudar ou tomar decisões baseadas nesta resposta.*";

const LEGISLATION_REFUSAL: &str = "📚 Para essa questão específica, recomendo consultar a legislação oficial ou materiais especializados.";
const UNCERTAIN_REFUSAL: &str = "🤔 Não tenho certeza suficiente para responder essa pergunta com a precisão necessária para concursos públicos.";
const GENERIC_REFUSAL: &str =
    "⚠️ Prefiro não responder a essa pergunta pois não tenho confiança suficiente na resposta.";

/// Process-wide confidence threshold.
///
/// Stored as raw `f64` bits so reads and writes are single atomic operations.
#[derive(Debug)]
pub struct ThresholdConfig {
    bits: AtomicU64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            bits: AtomicU64::new(DEFAULT_CONFIDENCE_THRESHOLD.to_bits()),
        }
    }
}

impl ThresholdConfig {
    /// Create with an initial value, falling back to the default when out of range.
    pub fn new(initial: f64) -> Self {
        let config = Self::default();
        config.set(initial);
        config
    }

    pub fn is_valid(value: f64) -> bool {
        (MIN_CONFIDENCE_THRESHOLD..=MAX_CONFIDENCE_THRESHOLD).contains(&value)
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Replace the threshold. Out-of-range values leave it unchanged and
    /// return `false`.
    pub fn set(&self, value: f64) -> bool {
        if !Self::is_valid(value) {
            warn!(
                requested = value,
                current = self.get(),
                "confidence threshold outside [0.5, 1.0]; keeping current value"
            );
            return false;
        }
        let previous = f64::from_bits(self.bits.swap(value.to_bits(), Ordering::Relaxed));
        info!(previous, current = value, "confidence threshold updated");
        true
    }
}

/// Fast preliminary gate: does the self-reported confidence alone pass?
///
/// Absent confidence always passes; the blended gate decides.
pub fn fast_gate(llm_confidence: Option<f64>, threshold: f64) -> bool {
    match llm_confidence {
        Some(confidence) => confidence >= threshold,
        None => true,
    }
}

/// Blended gate: returns `(accepted, final_score)`.
///
/// Missing LLM confidence contributes 0.0.
pub fn decide(
    heuristic_score: f64,
    llm_confidence: Option<f64>,
    consistency_multiplier: f64,
    threshold: f64,
) -> (bool, f64) {
    let blended =
        heuristic_score * HEURISTIC_WEIGHT + llm_confidence.unwrap_or(0.0) * LLM_WEIGHT;
    let final_score = (blended * consistency_multiplier).clamp(0.0, 1.0);
    (final_score >= threshold, final_score)
}

/// Refusal message chosen by keyword sniffing on the question.
pub fn safe_refusal(question: &str) -> &'static str {
    let lower = question.to_lowercase();
    if ["lei", "artigo", "legislação"]
        .iter()
        .any(|w| lower.contains(w))
    {
        LEGISLATION_REFUSAL
    } else if ["como", "quando", "onde"].iter().any(|w| lower.contains(w)) {
        UNCERTAIN_REFUSAL
    } else {
        GENERIC_REFUSAL
    }
}

/// Law numbers cited in `text` that are not in the known-statute table.
pub fn unknown_laws(text: &str) -> Vec<String> {
    let mut unknown: Vec<String> = Vec::new();
    for caps in LAW_NUMBER_PATTERN.captures_iter(text) {
        let Some(number) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if known_law(number).is_none() && !unknown.iter().any(|n| n == number) {
            unknown.push(number.to_string());
        }
    }
    unknown
}

fn validate_confidence(confidence: Option<f64>) -> std::result::Result<(), ScoringError> {
    match confidence {
        Some(c) if !c.is_finite() || !(0.0..=1.0).contains(&c) => {
            Err(ScoringError::InvalidConfidence(c))
        }
        _ => Ok(()),
    }
}

/// Runs the scoring pipeline and applies the accept/reject policy.
#[derive(Debug)]
pub struct DecisionGate {
    composer: ScoreComposer,
    detector: RiskDetector,
    threshold: ThresholdConfig,
    disclaimer_threshold: f64,
}

impl Default for DecisionGate {
    fn default() -> Self {
        Self::new(ScoreComposer::default(), ThresholdConfig::default())
    }
}

impl DecisionGate {
    pub fn new(composer: ScoreComposer, threshold: ThresholdConfig) -> Self {
        Self {
            composer,
            detector: RiskDetector::new(),
            threshold,
            disclaimer_threshold: DEFAULT_DISCLAIMER_THRESHOLD,
        }
    }

    pub fn with_disclaimer_threshold(mut self, disclaimer_threshold: f64) -> Self {
        self.disclaimer_threshold = disclaimer_threshold;
        self
    }

    pub fn threshold(&self) -> &ThresholdConfig {
        &self.threshold
    }

    pub fn disclaimer_threshold(&self) -> f64 {
        self.disclaimer_threshold
    }

    pub fn composer(&self) -> &ScoreComposer {
        &self.composer
    }

    /// Append the disclaimer footer when `score` is below the disclaimer threshold.
    pub fn apply_disclaimer(&self, text: &str, score: f64) -> String {
        if score < self.disclaimer_threshold {
            format!("{}{}", text, DISCLAIMER)
        } else {
            text.to_string()
        }
    }

    /// Full heuristic pipeline against an explicit threshold.
    pub fn score_with_threshold(
        &self,
        question: &str,
        answer: &str,
        llm_confidence: Option<f64>,
        window: &[ConversationTurn],
        threshold: f64,
    ) -> Result<ScoredResponse> {
        validate_confidence(llm_confidence)?;

        let signals = self.composer.extractor().extract(answer)?;
        let cited_sources = extract_citations(answer);
        let breakdown = compose_signals(&signals, &cited_sources);
        let heuristic_score = breakdown.total();
        let risks = self.detector.detect(answer);
        let consistency_multiplier = check_in_context(question, answer, window);
        let (accepted, final_score) = decide(
            heuristic_score,
            llm_confidence,
            consistency_multiplier,
            threshold,
        );

        for number in unknown_laws(answer) {
            warn!(law = %number, "answer cites a law outside the known-statute table");
        }

        debug!(
            heuristic_score,
            final_score,
            consistency_multiplier,
            risks = risks.len(),
            "answer scored"
        );

        Ok(ScoredResponse {
            text: answer.to_string(),
            llm_confidence,
            cited_sources,
            heuristic_score,
            breakdown,
            consistency_multiplier,
            final_score,
            accepted,
            risks,
        })
    }

    /// Full heuristic pipeline against the current threshold.
    pub fn score(
        &self,
        question: &str,
        answer: &str,
        llm_confidence: Option<f64>,
        window: &[ConversationTurn],
    ) -> Result<ScoredResponse> {
        self.score_with_threshold(question, answer, llm_confidence, window, self.threshold.get())
    }

    /// Drive one request through the state machine. Never fails: scoring
    /// errors end in `RejectedFinal` with [`ERROR_SCORE`].
    pub fn evaluate(
        &self,
        question: &str,
        answer: &str,
        llm_confidence: Option<f64>,
        window: &[ConversationTurn],
    ) -> Verdict {
        let threshold = self.threshold.get();
        let mut state = RequestState::Received;
        state = self.advance(state, RequestState::FastGateCheck);

        let valid_confidence = llm_confidence.filter(|c| validate_confidence(Some(*c)).is_ok());
        if !fast_gate(valid_confidence, threshold) {
            state = self.advance(state, RequestState::RejectedFast);
            let score = valid_confidence.unwrap_or(0.0);
            info!(llm_confidence = score, threshold, "rejected by fast gate");
            return Verdict {
                state,
                reply: safe_refusal(question).to_string(),
                final_score: score,
                scored: None,
                decided_at: Utc::now(),
            };
        }

        state = self.advance(state, RequestState::Scoring);
        match self.score_with_threshold(question, answer, llm_confidence, window, threshold) {
            Ok(scored) => {
                let (next, reply) = if scored.accepted {
                    (
                        RequestState::Accepted,
                        self.apply_disclaimer(&scored.text, scored.final_score),
                    )
                } else {
                    (RequestState::RejectedFinal, safe_refusal(question).to_string())
                };
                state = self.advance(state, next);
                info!(
                    state = %state,
                    final_score = scored.final_score,
                    threshold,
                    "verdict reached"
                );
                Verdict {
                    state,
                    reply,
                    final_score: scored.final_score,
                    scored: Some(scored),
                    decided_at: Utc::now(),
                }
            }
            Err(e) => {
                error!(error = %e, "failed to score answer");
                state = self.advance(state, RequestState::RejectedFinal);
                Verdict {
                    state,
                    reply: INTERNAL_ERROR_MESSAGE.to_string(),
                    final_score: ERROR_SCORE,
                    scored: None,
                    decided_at: Utc::now(),
                }
            }
        }
    }

    fn advance(&self, from: RequestState, to: RequestState) -> RequestState {
        debug_assert!(from.can_transition_to(to), "{} -> {}", from, to);
        debug!(from = %from, to = %to, "request state transition");
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::types::RiskKind;
    use pretty_assertions::assert_eq;

    const EPS: f64 = 1e-9;

    const STRONG_ANSWER: &str = "Segundo a Constituição Federal (CF/88), art. 41, a Lei 8.112/90, \
        o Decreto 1.171/94, a CLT e o Estatuto do Servidor, no regime jurídico único, \
        a estabilidade, a moralidade e a legalidade orientam o servidor público.";

    const STRONG_QUESTION: &str = "Qual lei garante a estabilidade do servidor público?";

    #[test]
    fn test_threshold_setter_validates() {
        let config = ThresholdConfig::default();
        assert_eq!(config.get(), DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(!config.set(0.4));
        assert!(!config.set(1.2));
        assert!(!config.set(f64::NAN));
        assert_eq!(config.get(), DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(config.set(0.75));
        assert_eq!(config.get(), 0.75);
        assert!(config.set(0.5));
        assert!(config.set(1.0));
    }

    #[test]
    fn test_threshold_new_falls_back() {
        assert_eq!(ThresholdConfig::new(0.2).get(), DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(ThresholdConfig::new(0.8).get(), 0.8);
    }

    #[test]
    fn test_fast_gate() {
        assert!(!fast_gate(Some(0.5), 0.9));
        assert!(fast_gate(Some(0.9), 0.9));
        assert!(fast_gate(None, 0.9));
    }

    #[test]
    fn test_decide_blend_and_multiplier() {
        let (accepted, score) = decide(0.8, Some(1.0), 1.0, 0.9);
        assert!((score - 0.86).abs() < EPS);
        assert!(!accepted);

        let (_, penalised) = decide(0.8, Some(1.0), 0.7, 0.5);
        assert!((penalised - 0.86 * 0.7).abs() < EPS);

        let (_, no_llm) = decide(1.0, None, 1.0, 0.5);
        assert!((no_llm - 0.7).abs() < EPS);
    }

    #[test]
    fn test_decide_accepts_at_exact_threshold() {
        let (_, score) = decide(0.85, Some(0.95), 1.0, 0.5);
        let (accepted, again) = decide(0.85, Some(0.95), 1.0, score);
        assert_eq!(score, again);
        assert!(accepted);
    }

    #[test]
    fn test_disclaimer_cutoff() {
        let gate = DecisionGate::default();
        assert!(gate.apply_disclaimer("Resposta", 0.94).ends_with(DISCLAIMER));
        assert_eq!(gate.apply_disclaimer("Resposta", 0.95), "Resposta");
    }

    #[test]
    fn test_safe_refusal_selection() {
        assert_eq!(safe_refusal("O que diz o artigo 37?"), LEGISLATION_REFUSAL);
        assert_eq!(safe_refusal("Qual a LEI do servidor?"), LEGISLATION_REFUSAL);
        assert_eq!(safe_refusal("Quando abre o edital?"), UNCERTAIN_REFUSAL);
        assert_eq!(safe_refusal("Vale a pena estudar?"), GENERIC_REFUSAL);
    }

    #[test]
    fn test_fast_rejection_skips_scoring() {
        let gate = DecisionGate::default();
        // An empty answer would fail scoring; the fast gate must never get there.
        let verdict = gate.evaluate("Como funciona a posse?", "", Some(0.5), &[]);
        assert_eq!(verdict.state, RequestState::RejectedFast);
        assert_eq!(verdict.reply, UNCERTAIN_REFUSAL);
        assert_eq!(verdict.final_score, 0.5);
        assert!(verdict.scored.is_none());
    }

    #[test]
    fn test_strong_answer_accepted_without_disclaimer() {
        let gate = DecisionGate::default();
        let verdict = gate.evaluate(STRONG_QUESTION, STRONG_ANSWER, Some(0.9), &[]);
        assert_eq!(verdict.state, RequestState::Accepted);
        assert_eq!(verdict.reply, STRONG_ANSWER);
        let scored = verdict.scored.as_ref().unwrap();
        assert_eq!(scored.heuristic_score, 1.0);
        assert_eq!(scored.consistency_multiplier, 1.0);
        assert!((verdict.final_score - 0.97).abs() < EPS);
        assert!(!verdict.sources().is_empty());
    }

    #[test]
    fn test_risks_do_not_block_acceptance() {
        let answer = format!(
            "{} A estabilidade sempre exige aprovação em avaliação especial, com nota mínima de 70%.",
            STRONG_ANSWER
        );
        let gate = DecisionGate::default();
        let verdict = gate.evaluate(STRONG_QUESTION, &answer, Some(0.9), &[]);

        assert_eq!(verdict.state, RequestState::Accepted);
        let kinds: Vec<RiskKind> = verdict.risks().iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&RiskKind::CategoricalClaim));
        assert!(kinds.contains(&RiskKind::SpecificPercentages));
        assert!((verdict.final_score - 0.97).abs() < EPS);
    }

    #[test]
    fn test_accepted_near_threshold_gets_disclaimer() {
        let gate = DecisionGate::new(ScoreComposer::default(), ThresholdConfig::new(0.6));
        let verdict = gate.evaluate(STRONG_QUESTION, STRONG_ANSWER, None, &[]);
        assert_eq!(verdict.state, RequestState::Accepted);
        assert!((verdict.final_score - 0.7).abs() < EPS);
        assert_eq!(verdict.reply, format!("{}{}", STRONG_ANSWER, DISCLAIMER));
    }

    #[test]
    fn test_hedged_answer_rejected_final() {
        let gate = DecisionGate::default();
        let answer = "Talvez a lei preveja isso, e possivelmente há exceções a considerar.";
        let verdict = gate.evaluate("Qual lei trata disso?", answer, Some(0.95), &[]);
        assert_eq!(verdict.state, RequestState::RejectedFinal);
        assert_eq!(verdict.reply, LEGISLATION_REFUSAL);
        assert!(verdict.scored.is_some());
        assert!(verdict.sources().is_empty());
    }

    #[test]
    fn test_scoring_error_maps_to_rejected_final() {
        let gate = DecisionGate::default();
        let verdict = gate.evaluate("Pergunta?", "   ", None, &[]);
        assert_eq!(verdict.state, RequestState::RejectedFinal);
        assert_eq!(verdict.reply, INTERNAL_ERROR_MESSAGE);
        assert_eq!(verdict.final_score, ERROR_SCORE);
    }

    #[test]
    fn test_invalid_confidence_maps_to_rejected_final() {
        let gate = DecisionGate::default();
        let verdict = gate.evaluate(STRONG_QUESTION, STRONG_ANSWER, Some(f64::NAN), &[]);
        assert_eq!(verdict.state, RequestState::RejectedFinal);
        assert_eq!(verdict.final_score, ERROR_SCORE);

        let err = gate.score(STRONG_QUESTION, STRONG_ANSWER, Some(1.5), &[]);
        assert!(err.unwrap_err().is_scoring());
    }

    #[test]
    fn test_inconsistent_answer_penalised() {
        let gate = DecisionGate::new(ScoreComposer::default(), ThresholdConfig::new(0.5));
        let scored = gate
            .score(
                "Qual a diferença entre lei e decreto?",
                STRONG_ANSWER,
                Some(1.0),
                &[],
            )
            .unwrap();
        // STRONG_ANSWER tokenises "lei" too, so it passes
        assert_eq!(scored.consistency_multiplier, 1.0);

        let off_topic = "Um regula o outro, sendo hierarquicamente superior na prática.";
        let scored = gate
            .score("Qual a diferença entre lei e decreto?", off_topic, Some(1.0), &[])
            .unwrap();
        assert_eq!(scored.consistency_multiplier, 0.7);
    }

    #[test]
    fn test_unknown_laws() {
        let text = "A Lei 8.112/90 e a Lei 99.999/20 tratam disso; de novo a Lei 99.999/20.";
        assert_eq!(unknown_laws(text), vec!["99.999/20".to_string()]);
    }
}
