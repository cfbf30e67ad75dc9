//! Turning verdicts into chat messages.
//!
//! Mention stripping on the way in; chunking, the Discord size limit and
//! the sources block on the way out.

use std::sync::LazyLock;

use regex::Regex;

/// Chunk size used for incremental delivery (chars).
pub const STREAM_CHUNK_CHARS: usize = 200;

/// Hard per-message limit of the chat platform (chars).
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Sources shown under an answer.
pub const MAX_DISPLAYED_SOURCES: usize = 5;

pub const HELP_TEXT: &str = "🔮 **Oráculo de Concursos - Como usar**
Sou seu assistente especializado em concursos públicos brasileiros!

💡 **Como fazer perguntas**
Me mencione (@Oráculo) seguido da sua dúvida sobre concursos públicos

📖 **Exemplos de uso**
• @Oráculo O que é regime jurídico estatutário?
• @Oráculo Explique os princípios da administração pública
• @Oráculo Como funciona a estabilidade do servidor público?

🎯 **Especialidades**
Direito Administrativo, Constitucional, Legislação específica, Regimes jurídicos, Processos seletivos e muito mais!

💪 Desenvolvido para sua aprovação em concursos públicos!";

static MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?\d+>").expect("invalid regex"));

/// Remove user mentions (`<@id>`, `<@!id>`) and surrounding whitespace.
pub fn strip_mentions(text: &str) -> String {
    MENTION_PATTERN.replace_all(text, "").trim().to_string()
}

/// Split on spaces into chunks of at most `chunk_chars`.
///
/// Newlines stay inside their word. A single word longer than the chunk
/// size becomes its own chunk.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    if text.chars().count() <= chunk_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split(' ').filter(|w| !w.is_empty()) {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= chunk_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Cut `text` into pieces of at most `limit` chars, on char boundaries.
pub fn split_for_limit(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(limit)
        .map(|piece| piece.iter().collect())
        .collect()
}

/// Numbered "Fontes Consultadas" block; empty when there are no sources.
pub fn render_sources(sources: &[String]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut out = String::from(
        "📚 **Fontes Consultadas**\nInformações baseadas nas seguintes fontes:\n",
    );
    for (i, source) in sources.iter().take(MAX_DISPLAYED_SOURCES).enumerate() {
        out.push_str(&format!("Fonte {}: {}\n", i + 1, source));
    }
    out
}

/// Messages to send for a reply: stream chunks, each within the platform
/// limit, followed by the sources block when present.
pub fn render_messages(reply: &str, sources: &[String]) -> Vec<String> {
    let mut messages: Vec<String> = chunk_text(reply, STREAM_CHUNK_CHARS)
        .into_iter()
        .flat_map(|chunk| split_for_limit(&chunk, DISCORD_MESSAGE_LIMIT))
        .collect();
    let block = render_sources(sources);
    if !block.is_empty() {
        messages.extend(split_for_limit(&block, DISCORD_MESSAGE_LIMIT));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_mentions() {
        assert_eq!(strip_mentions("<@123> O que é CLT?"), "O que é CLT?");
        assert_eq!(strip_mentions("<@!456>   "), "");
        assert_eq!(strip_mentions("oi <@1> e <@!2>"), "oi  e");
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("curto", 200), vec!["curto"]);
    }

    #[test]
    fn test_chunks_respect_word_boundaries() {
        let text = "aaaa bbbb cccc dddd";
        assert_eq!(chunk_text(text, 9), vec!["aaaa bbbb", "cccc dddd"]);
        for chunk in chunk_text(&"palavra ".repeat(100), 200) {
            assert!(chunk.chars().count() <= 200);
        }
    }

    #[test]
    fn test_oversized_word_kept_whole() {
        let long = "x".repeat(12);
        assert_eq!(chunk_text(&format!("ab {}", long), 5), vec!["ab".to_string(), long]);
    }

    #[test]
    fn test_split_for_limit_counts_chars() {
        let pieces = split_for_limit("çççç", 3);
        assert_eq!(pieces, vec!["ççç", "ç"]);
    }

    #[test]
    fn test_sources_capped() {
        let sources: Vec<String> = (1..=7).map(|i| format!("Lei {}", i)).collect();
        let block = render_sources(&sources);
        assert!(block.contains("Fonte 5: Lei 5"));
        assert!(!block.contains("Fonte 6"));
        assert_eq!(render_sources(&[]), "");
    }

    #[test]
    fn test_render_messages() {
        let messages = render_messages("Resposta curta.", &["Lei 8.112/90".to_string()]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "Resposta curta.");
        assert!(messages[1].starts_with("📚 **Fontes Consultadas**"));
    }
}
