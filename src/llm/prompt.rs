//! Prompt construction for exam questions.

use crate::context::ConversationTurn;

/// Number of prior turns rendered into the prompt.
pub const PROMPT_CONTEXT_TURNS: usize = 3;

pub const SYSTEM_PROMPT: &str = "Você é o Oráculo de Concursos Públicos, um assistente especializado em preparação para concursos públicos brasileiros.

DIRETRIZES FUNDAMENTAIS:
- Responda APENAS quando tiver 90% ou mais de confiança na resposta
- Se não tiver certeza, seja honesto e diga \"Não tenho certeza suficiente para responder\"
- Foque exclusivamente em conteúdo relacionado a concursos públicos brasileiros
- Sempre cite fontes quando possível (leis, decretos, jurisprudência)
- Use linguagem clara e didática
- Forneça exemplos práticos quando apropriado

ÁREAS DE ESPECIALIZAÇÃO:
- Direito Constitucional, Administrativo, Civil, Penal, Trabalhista
- Legislação específica de órgãos públicos
- Técnicas de estudo e preparação
- Resolução de questões de concurso
- Dicas de prova e gestão de tempo
- Português para concursos
- Matemática e Raciocínio Lógico
- Conhecimentos Gerais e Atualidades

FORMATO DE RESPOSTA:
- Seja conciso mas completo
- Use estrutura clara com tópicos quando necessário
- Inclua referências legais quando aplicável
- Termine sempre com uma dica prática

Lembre-se: Qualidade e precisão são mais importantes que velocidade de resposta.";

/// Render the last [`PROMPT_CONTEXT_TURNS`] turns; empty when there are none.
///
/// `history` is ordered oldest first.
pub fn format_context(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let start = history.len().saturating_sub(PROMPT_CONTEXT_TURNS);
    let mut out = String::from("\n=== CONTEXTO DA CONVERSA ===\n");
    for turn in &history[start..] {
        out.push_str(&format!("USUÁRIO: {}\n", turn.question));
        out.push_str(&format!("ASSISTENTE: {}\n\n", turn.answer));
    }
    out.push_str("=== NOVA PERGUNTA ===\n");
    out
}

/// The user-turn prompt: context, question and answering instructions.
pub fn build_user_prompt(question: &str, history: &[ConversationTurn]) -> String {
    format!(
        "{}\nPERGUNTA DO USUÁRIO: {}\n\n\
         Por favor, responda de forma especializada, precisa e didática sobre concursos públicos brasileiros.\n\
         Inclua fontes legais sempre que possível e seja explícito sobre o nível de confiança da informação.\n",
        format_context(history),
        question
    )
}
