//! Signal extraction from answer text.
//!
//! Applies the pattern library to an answer and reports raw counts. No
//! weighting happens here; see [`super::composer`] for that.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ScoringError;

use super::patterns::{
    pattern_table, PatternCategory, PatternId, StructuralMarker, CITATION_PATTERNS,
    TECHNICAL_TERMS,
};

/// Maximum number of cited sources kept per answer.
pub const MAX_CITED_SOURCES: usize = 5;

/// Default cap on the answer size the scorer accepts (chars).
pub const DEFAULT_MAX_ANSWER_CHARS: usize = 16_000;

/// Coarse answer length bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthCategory {
    /// Fewer than 50 chars
    TooShort,
    /// 50 to 2000 chars
    Normal,
    /// More than 2000 chars
    Long,
}

impl LengthCategory {
    pub fn from_chars(chars: usize) -> Self {
        if chars < 50 {
            Self::TooShort
        } else if chars <= 2000 {
            Self::Normal
        } else {
            Self::Long
        }
    }
}

/// Structural probes, each a plain boolean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralFlags {
    pub list_formatting: bool,
    pub explanatory_connective: bool,
    pub practical_example: bool,
    pub distinction: bool,
}

impl StructuralFlags {
    pub fn is_set(&self, marker: StructuralMarker) -> bool {
        match marker {
            StructuralMarker::ListFormatting => self.list_formatting,
            StructuralMarker::ExplanatoryConnective => self.explanatory_connective,
            StructuralMarker::PracticalExample => self.practical_example,
            StructuralMarker::Distinction => self.distinction,
        }
    }
}

/// Raw signals extracted from one answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    /// Occurrences per matched pattern type (types with zero hits are absent)
    pub pattern_hits: BTreeMap<PatternId, usize>,
    /// Non-overlapping high-confidence matches across the whole text
    pub citation_matches: usize,
    /// Non-overlapping hedge matches across the whole text
    pub hedge_matches: usize,
    /// Distinct technical terms present
    pub technical_term_hits: usize,
    pub structure: StructuralFlags,
    /// Length in chars
    pub char_count: usize,
    pub length_category: LengthCategory,
}

impl Default for LengthCategory {
    fn default() -> Self {
        Self::TooShort
    }
}

impl Signals {
    /// Pattern types of one category that matched at least once, in table order.
    pub fn matched_types(&self, category: PatternCategory) -> Vec<PatternId> {
        self.pattern_hits
            .keys()
            .copied()
            .filter(|id| id.category() == category)
            .collect()
    }

    pub fn has_hedging(&self) -> bool {
        self.hedge_matches > 0
    }
}

/// Extracts [`Signals`] from answer text.
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    max_chars: usize,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalExtractor {
    pub fn new() -> Self {
        Self {
            max_chars: DEFAULT_MAX_ANSWER_CHARS,
        }
    }

    /// Set the largest answer (in chars) that will be scored.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Reject input the scorer should not look at.
    pub fn validate(&self, text: &str) -> Result<usize, ScoringError> {
        if text.trim().is_empty() {
            return Err(ScoringError::EmptyAnswer);
        }
        let len = text.chars().count();
        if len > self.max_chars {
            return Err(ScoringError::InputTooLong {
                len,
                max: self.max_chars,
            });
        }
        Ok(len)
    }

    /// Extract signals from an answer.
    pub fn extract(&self, text: &str) -> Result<Signals, ScoringError> {
        let char_count = self.validate(text)?;
        let mut signals = Signals {
            char_count,
            length_category: LengthCategory::from_chars(char_count),
            ..Signals::default()
        };

        for entry in pattern_table() {
            let hits = entry.regex.find_iter(text).count();
            if hits == 0 {
                continue;
            }
            signals.pattern_hits.insert(entry.id, hits);
            match entry.category {
                PatternCategory::HighConfidence => signals.citation_matches += hits,
                PatternCategory::Hedge => signals.hedge_matches += hits,
            }
        }

        signals.technical_term_hits = count_technical_terms(text);

        signals.structure = StructuralFlags {
            list_formatting: StructuralMarker::ListFormatting.regex().is_match(text),
            explanatory_connective: StructuralMarker::ExplanatoryConnective
                .regex()
                .is_match(text),
            practical_example: StructuralMarker::PracticalExample.regex().is_match(text),
            distinction: StructuralMarker::Distinction.regex().is_match(text),
        };

        Ok(signals)
    }
}

/// Distinct technical terms present in the text (case-insensitive).
pub fn count_technical_terms(text: &str) -> usize {
    let lower = text.to_lowercase();
    TECHNICAL_TERMS
        .iter()
        .filter(|term| lower.contains(*term))
        .count()
}

/// Pull distinct citation-like substrings out of an answer.
///
/// Matches are ordered by their position in the text; exact duplicates are
/// dropped and at most [`MAX_CITED_SOURCES`] are kept.
pub fn extract_citations(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = CITATION_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.as_str())))
        .collect();
    found.sort_by_key(|(start, _)| *start);

    let mut sources: Vec<String> = Vec::new();
    for (_, citation) in found {
        if sources.len() == MAX_CITED_SOURCES {
            break;
        }
        let citation = citation.trim();
        if !sources.iter().any(|s| s == citation) {
            sources.push(citation.to_string());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_every_occurrence() {
        let extractor = SignalExtractor::new();
        let text = "A Lei 8.112/90 e a Lei 9.784/99 tratam do tema. Veja o art. 5 e o art. 37.";
        let signals = extractor.extract(text).unwrap();

        assert_eq!(signals.pattern_hits.get(&PatternId::LawCitation), Some(&2));
        assert_eq!(signals.pattern_hits.get(&PatternId::ArticleMarker), Some(&2));
        assert_eq!(signals.citation_matches, 4);
        assert_eq!(
            signals.matched_types(PatternCategory::HighConfidence),
            vec![PatternId::LawCitation, PatternId::ArticleMarker]
        );
    }

    #[test]
    fn test_hedge_counts() {
        let extractor = SignalExtractor::new();
        let signals = extractor
            .extract("Talvez seja isso. Talvez não. Possivelmente depende.")
            .unwrap();
        assert_eq!(signals.hedge_matches, 3);
        assert_eq!(signals.matched_types(PatternCategory::Hedge).len(), 2);
        assert!(signals.has_hedging());
    }

    #[test]
    fn test_technical_terms_once_per_term() {
        let text = "Estabilidade, estabilidade e mais ESTABILIDADE; também moralidade.";
        assert_eq!(count_technical_terms(text), 2);
    }

    #[test]
    fn test_length_categories() {
        assert_eq!(LengthCategory::from_chars(10), LengthCategory::TooShort);
        assert_eq!(LengthCategory::from_chars(50), LengthCategory::Normal);
        assert_eq!(LengthCategory::from_chars(2000), LengthCategory::Normal);
        assert_eq!(LengthCategory::from_chars(2001), LengthCategory::Long);
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let extractor = SignalExtractor::new();
        let signals = extractor.extract("ção").unwrap();
        assert_eq!(signals.char_count, 3);
    }

    #[test]
    fn test_structural_flags() {
        let extractor = SignalExtractor::new();
        let text = "- item um\nOu seja, na prática isso é diferente.";
        let signals = extractor.extract(text).unwrap();
        assert!(signals.structure.list_formatting);
        assert!(signals.structure.explanatory_connective);
        assert!(signals.structure.practical_example);
        assert!(signals.structure.distinction);
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let extractor = SignalExtractor::new().with_max_chars(10);
        assert_eq!(extractor.extract("   "), Err(ScoringError::EmptyAnswer));
        assert_eq!(
            extractor.extract("texto longo demais"),
            Err(ScoringError::InputTooLong { len: 18, max: 10 })
        );
    }

    #[test]
    fn test_extract_citations_in_text_order() {
        let text = "Art. 41 da Constituição Federal e Lei 8.112/90; de novo a Lei 8.112/90.";
        let citations = extract_citations(text);
        assert_eq!(
            citations,
            vec!["Art. 41", "Constituição Federal", "Lei 8.112/90"]
        );
    }

    #[test]
    fn test_extract_citations_capped() {
        let text = "Lei 1, Lei 2, Lei 3, Lei 4, Lei 5, Lei 6, Lei 7.";
        let citations = extract_citations(text);
        assert_eq!(citations.len(), MAX_CITED_SOURCES);
        assert_eq!(citations[0], "Lei 1");
        assert_eq!(citations[4], "Lei 5");
    }

    #[test]
    fn test_no_citations() {
        assert!(extract_citations("Sem referências aqui.").is_empty());
    }
}
