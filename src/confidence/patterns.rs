//! Pattern library: the fixed, hand-curated data the scorer runs on.
//!
//! Everything here is immutable and compiled once on first use. Confidence
//! patterns live in a typed table keyed by [`PatternId`] so that the
//! once-per-type counting rule of the composer can be audited per entry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Which way a confidence pattern pushes the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    /// Legal citations and named statutes
    HighConfidence,
    /// Hedging / first-person uncertainty
    Hedge,
}

/// Identifier of one confidence pattern type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternId {
    // High confidence
    LawCitation,
    DecreeCitation,
    ArticleMarker,
    FederalConstitution,
    ConstitutionAbbrev,
    LaborCode,
    ServantStatute,
    UnifiedLegalRegime,
    // Hedges
    AcreditoQue,
    Possivelmente,
    Provavelmente,
    CreioQue,
    NaoTenhoCerteza,
    PodeSerQue,
    Talvez,
    SuponhoQue,
    ImaginoQue,
    Geralmente,
    Normalmente,
    CostumaSer,
}

impl PatternId {
    /// Every pattern type, high-confidence entries first.
    pub const ALL: [PatternId; 20] = [
        Self::LawCitation,
        Self::DecreeCitation,
        Self::ArticleMarker,
        Self::FederalConstitution,
        Self::ConstitutionAbbrev,
        Self::LaborCode,
        Self::ServantStatute,
        Self::UnifiedLegalRegime,
        Self::AcreditoQue,
        Self::Possivelmente,
        Self::Provavelmente,
        Self::CreioQue,
        Self::NaoTenhoCerteza,
        Self::PodeSerQue,
        Self::Talvez,
        Self::SuponhoQue,
        Self::ImaginoQue,
        Self::Geralmente,
        Self::Normalmente,
        Self::CostumaSer,
    ];

    pub fn category(self) -> PatternCategory {
        match self {
            Self::LawCitation
            | Self::DecreeCitation
            | Self::ArticleMarker
            | Self::FederalConstitution
            | Self::ConstitutionAbbrev
            | Self::LaborCode
            | Self::ServantStatute
            | Self::UnifiedLegalRegime => PatternCategory::HighConfidence,
            _ => PatternCategory::Hedge,
        }
    }

    /// Regex source for this pattern type.
    pub fn source(self) -> &'static str {
        match self {
            Self::LawCitation => r"(?i)\blei\s+(?:nº\s*)?\d+(?:\.\d+)*(?:/\d+)?",
            Self::DecreeCitation => r"(?i)\bdecreto\s+(?:nº\s*)?\d+(?:\.\d+)*(?:/\d+)?",
            Self::ArticleMarker => r"(?i)\bart(?:igo)?\.\s*\d+",
            Self::FederalConstitution => r"(?i)constituição\s+federal",
            Self::ConstitutionAbbrev => r"(?i)\bcf(?:/88)?\b",
            Self::LaborCode => r"(?i)\bclt\b",
            Self::ServantStatute => r"(?i)estatuto\s+(?:do\s+)?servidor",
            Self::UnifiedLegalRegime => r"(?i)regime\s+jurídico\s+único",
            Self::AcreditoQue => r"(?i)acredito\s+que",
            Self::Possivelmente => r"(?i)possivelmente",
            Self::Provavelmente => r"(?i)provavelmente",
            Self::CreioQue => r"(?i)creio\s+que",
            Self::NaoTenhoCerteza => r"(?i)não\s+tenho\s+certeza",
            Self::PodeSerQue => r"(?i)pode\s+ser\s+que",
            Self::Talvez => r"(?i)talvez",
            Self::SuponhoQue => r"(?i)suponho\s+que",
            Self::ImaginoQue => r"(?i)imagino\s+que",
            Self::Geralmente => r"(?i)\b(?:em\s+)?geral(?:mente)?\b",
            Self::Normalmente => r"(?i)normalmente",
            Self::CostumaSer => r"(?i)costuma\s+ser",
        }
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LawCitation => "law_citation",
            Self::DecreeCitation => "decree_citation",
            Self::ArticleMarker => "article_marker",
            Self::FederalConstitution => "federal_constitution",
            Self::ConstitutionAbbrev => "constitution_abbrev",
            Self::LaborCode => "labor_code",
            Self::ServantStatute => "servant_statute",
            Self::UnifiedLegalRegime => "unified_legal_regime",
            Self::AcreditoQue => "acredito_que",
            Self::Possivelmente => "possivelmente",
            Self::Provavelmente => "provavelmente",
            Self::CreioQue => "creio_que",
            Self::NaoTenhoCerteza => "nao_tenho_certeza",
            Self::PodeSerQue => "pode_ser_que",
            Self::Talvez => "talvez",
            Self::SuponhoQue => "suponho_que",
            Self::ImaginoQue => "imagino_que",
            Self::Geralmente => "geralmente",
            Self::Normalmente => "normalmente",
            Self::CostumaSer => "costuma_ser",
        };
        write!(f, "{}", name)
    }
}

/// A compiled entry of the confidence pattern table.
#[derive(Debug)]
pub struct PatternEntry {
    pub id: PatternId,
    pub category: PatternCategory,
    pub regex: Regex,
}

static PATTERN_TABLE: LazyLock<Vec<PatternEntry>> = LazyLock::new(|| {
    PatternId::ALL
        .iter()
        .map(|&id| PatternEntry {
            id,
            category: id.category(),
            regex: Regex::new(id.source()).expect("invalid regex"),
        })
        .collect()
});

/// The full confidence pattern table.
pub fn pattern_table() -> &'static [PatternEntry] {
    &PATTERN_TABLE
}

/// Entries of one category, in table order.
pub fn patterns_in(category: PatternCategory) -> impl Iterator<Item = &'static PatternEntry> {
    PATTERN_TABLE.iter().filter(move |e| e.category == category)
}

/// Domain nouns whose presence suggests a competent answer.
pub const TECHNICAL_TERMS: &[&str] = &[
    "administração pública",
    "servidor público",
    "estatutário",
    "celetista",
    "regime jurídico",
    "estabilidade",
    "efetividade",
    "concurso público",
    "processo seletivo",
    "cargo público",
    "função pública",
    "remuneração",
    "subsídio",
    "gratificação",
    "licença",
    "afastamento",
    "aposentadoria",
    "pensão",
    "moralidade",
    "legalidade",
    "impessoalidade",
    "publicidade",
    "eficiência",
    "supremacia do interesse público",
    "auto-executoriedade",
    "presunção de legitimidade",
];

/// Canonical short names of authoritative instruments (lowercase).
pub const TRUSTED_SOURCES: &[&str] = &[
    "constituição federal",
    "cf/88",
    "lei 8.112/90",
    "lei 8.429/92",
    "decreto-lei 5.452/43",
    "clt",
    "súmula",
    "jurisprudência",
    "stf",
    "stj",
    "tcu",
];

/// Antonym pairs used by the adjacent-sentence contradiction probe.
pub const CONTRADICTION_PAIRS: &[(&str, &str)] = &[
    ("obrigatório", "opcional"),
    ("permitido", "proibido"),
    ("deve", "não deve"),
    ("sim", "não"),
    ("sempre", "nunca"),
];

/// Keywords shared by exam questions and their answers.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "direito",
    "lei",
    "constituição",
    "servidor",
    "concurso",
    "público",
    "administrativo",
    "constitucional",
    "penal",
    "civil",
    "processo",
    "licitação",
    "contrato",
    "cargo",
    "função",
    "estabilidade",
];

/// Absolute adverbs flagged as categorical claims.
pub const CATEGORICAL_ADVERBS: &[&str] = &[
    "sempre",
    "nunca",
    "todos",
    "nenhum",
    "jamais",
    "invariavelmente",
];

static CATEGORICAL_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    CATEGORICAL_ADVERBS
        .iter()
        .map(|&word| {
            let re = Regex::new(&format!(r"(?i)\b{}", regex::escape(word))).expect("invalid regex");
            (word, re)
        })
        .collect()
});

/// Compiled categorical-adverb probes, one per adverb.
pub fn categorical_patterns() -> &'static [(&'static str, Regex)] {
    &CATEGORICAL_PATTERNS
}

/// Statutes the bot is expected to cite, keyed by digits-only number.
pub const KNOWN_LAWS: &[(&str, &str)] = &[
    ("8112", "Lei 8.112/90 - Estatuto dos Servidores Públicos"),
    ("811290", "Lei 8.112/90 - Estatuto dos Servidores Públicos"),
    ("8429", "Lei 8.429/92 - Improbidade Administrativa"),
    ("842992", "Lei 8.429/92 - Improbidade Administrativa"),
    ("8666", "Lei 8.666/93 - Licitações e Contratos"),
    ("866693", "Lei 8.666/93 - Licitações e Contratos"),
    ("9784", "Lei 9.784/99 - Processo Administrativo Federal"),
    ("978499", "Lei 9.784/99 - Processo Administrativo Federal"),
    ("12527", "Lei 12.527/11 - Lei de Acesso à Informação"),
    ("1252711", "Lei 12.527/11 - Lei de Acesso à Informação"),
    ("13709", "Lei 13.709/18 - Lei Geral de Proteção de Dados"),
    ("1370918", "Lei 13.709/18 - Lei Geral de Proteção de Dados"),
    ("14133", "Lei 14.133/21 - Nova Lei de Licitações"),
    ("1413321", "Lei 14.133/21 - Nova Lei de Licitações"),
    ("13105", "Código de Processo Civil - Lei 13.105/15"),
    ("10406", "Código Civil - Lei 10.406/02"),
];

/// Look up a law number (any punctuation) in [`KNOWN_LAWS`].
///
/// Falls back to the part before the year (`14.133/2021` -> `14133`).
pub fn known_law(number: &str) -> Option<&'static str> {
    let lookup = |s: &str| {
        let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
        KNOWN_LAWS
            .iter()
            .find(|(key, _)| *key == digits)
            .map(|(_, name)| *name)
    };
    lookup(number).or_else(|| number.split('/').next().and_then(lookup))
}

/// Patterns that pull citation-like substrings out of an answer.
pub static CITATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let with_article = |id: PatternId| format!(r"{}(?:\s*,?\s*art\.\s*\d+)?", id.source());
    [
        PatternId::LawCitation.source().to_string(),
        PatternId::DecreeCitation.source().to_string(),
        PatternId::ArticleMarker.source().to_string(),
        with_article(PatternId::ConstitutionAbbrev),
        PatternId::FederalConstitution.source().to_string(),
        with_article(PatternId::LaborCode),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid regex"))
    .collect()
});

/// Captures the number of a law citation.
pub static LAW_NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blei\s+(?:nº\s*)?(\d+(?:[./]\d+)*)").expect("invalid regex")
});

/// Structural markers probed independently of one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralMarker {
    /// Leading numeral or bullet
    ListFormatting,
    /// "ou seja", "isto é", ...
    ExplanatoryConnective,
    /// "na prática", "exemplo", ...
    PracticalExample,
    /// "diferente", "não confundir", ...
    Distinction,
}

impl StructuralMarker {
    pub const ALL: [StructuralMarker; 4] = [
        Self::ListFormatting,
        Self::ExplanatoryConnective,
        Self::PracticalExample,
        Self::Distinction,
    ];

    pub fn regex(self) -> &'static Regex {
        match self {
            Self::ListFormatting => &LIST_PATTERN,
            Self::ExplanatoryConnective => &EXPLANATORY_PATTERN,
            Self::PracticalExample => &PRACTICAL_PATTERN,
            Self::Distinction => &DISTINCTION_PATTERN,
        }
    }
}

static LIST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\n|^)[\d\-\*•]\s*").expect("invalid regex"));

static EXPLANATORY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:ou seja|isto é|em outras palavras|por exemplo)").expect("invalid regex")
});

static PRACTICAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:na prática|aplicação|exemplo|caso)").expect("invalid regex")
});

static DISTINCTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:diferente|distinto|não confundir|ao contrário)").expect("invalid regex")
});

/// `DD/DD/DDDD` dates and `DDDD/DDDD` year pairs.
pub static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}/\d{4}\b|\b\d{1,2}/\d{1,2}/\d{4}\b").expect("invalid regex")
});

/// Any mention of a normative instrument that could source a number.
pub static SOURCE_KEYWORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:lei|decreto|portaria)").expect("invalid regex"));

pub static PERCENTAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:,\d+)?%").expect("invalid regex"));

pub static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("invalid regex"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_complete_and_ordered() {
        let table = pattern_table();
        assert_eq!(table.len(), PatternId::ALL.len());
        assert_eq!(patterns_in(PatternCategory::HighConfidence).count(), 8);
        assert_eq!(patterns_in(PatternCategory::Hedge).count(), 12);
        for (entry, id) in table.iter().zip(PatternId::ALL) {
            assert_eq!(entry.id, id);
        }
    }

    #[test]
    fn test_high_confidence_patterns_match_examples() {
        let cases = [
            (PatternId::LawCitation, "conforme a Lei nº 8.112/90"),
            (PatternId::DecreeCitation, "o Decreto 9.094/2017"),
            (PatternId::ArticleMarker, "Art. 37 da CF"),
            (PatternId::ArticleMarker, "artigo. 5"),
            (PatternId::FederalConstitution, "a Constituição Federal prevê"),
            (PatternId::ConstitutionAbbrev, "segundo a CF/88"),
            (PatternId::LaborCode, "regido pela CLT"),
            (PatternId::ServantStatute, "o Estatuto do Servidor"),
            (PatternId::UnifiedLegalRegime, "regime jurídico único"),
        ];
        for (id, text) in cases {
            assert!(id.category() == PatternCategory::HighConfidence);
            let re = Regex::new(id.source()).unwrap();
            assert!(re.is_match(text), "{} should match {:?}", id, text);
        }
    }

    #[test]
    fn test_abbreviations_need_word_boundaries() {
        let cf = Regex::new(PatternId::ConstitutionAbbrev.source()).unwrap();
        assert!(!cf.is_match("cfop"));
        let clt = Regex::new(PatternId::LaborCode.source()).unwrap();
        assert!(!clt.is_match("ecltico"));
    }

    #[test]
    fn test_hedges_are_case_insensitive() {
        let re = Regex::new(PatternId::NaoTenhoCerteza.source()).unwrap();
        assert!(re.is_match("NÃO TENHO CERTEZA disso"));
        let re = Regex::new(PatternId::Talvez.source()).unwrap();
        assert!(re.is_match("Talvez sim"));
    }

    #[test]
    fn test_known_law_lookup_ignores_punctuation() {
        assert!(known_law("8.112").is_some());
        assert!(known_law("8.112/90").is_some());
        assert!(known_law("14.133/21").is_some());
        assert!(known_law("14.133/2021").is_some());
        assert!(known_law("99.999").is_none());
    }

    #[test]
    fn test_structural_markers() {
        assert!(StructuralMarker::ListFormatting.regex().is_match("Itens:\n- primeiro"));
        assert!(StructuralMarker::ListFormatting.regex().is_match("1. primeiro"));
        assert!(StructuralMarker::ExplanatoryConnective.regex().is_match("Ou seja, não"));
        assert!(StructuralMarker::PracticalExample.regex().is_match("Na prática"));
        assert!(StructuralMarker::Distinction.regex().is_match("Não confundir com"));
    }

    #[test]
    fn test_display_uses_snake_case() {
        assert_eq!(PatternId::NaoTenhoCerteza.to_string(), "nao_tenho_certeza");
        for id in PatternId::ALL {
            let serialized = serde_json::to_value(id).unwrap();
            assert_eq!(serialized.as_str(), Some(id.to_string().as_str()));
        }
    }

    #[test]
    fn test_citation_patterns_share_table_sources() {
        for id in [
            PatternId::LawCitation,
            PatternId::DecreeCitation,
            PatternId::ArticleMarker,
            PatternId::ConstitutionAbbrev,
            PatternId::FederalConstitution,
            PatternId::LaborCode,
        ] {
            assert!(
                CITATION_PATTERNS
                    .iter()
                    .any(|re| re.as_str().starts_with(id.source())),
                "{} has no citation pattern",
                id
            );
        }
        assert!(CITATION_PATTERNS
            .iter()
            .filter_map(|re| re.find("conforme a CF/88, art. 37"))
            .any(|m| m.as_str() == "CF/88, art. 37"));
    }
}
