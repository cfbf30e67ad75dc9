//! Conversation context types: ConversationKey, ConversationTurn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of turns kept per conversation.
pub const DEFAULT_MAX_HISTORY: usize = 5;

/// Identifies one conversation: a user in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey {
    pub user_id: String,
    pub channel_id: String,
}

impl ConversationKey {
    pub fn new(user_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            channel_id: channel_id.into(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.user_id, self.channel_id)
    }
}

/// A completed question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Question as asked (mentions already stripped)
    pub question: String,
    /// Text that was delivered: the annotated answer or the refusal
    pub answer: String,
    /// Final score recorded for this turn
    pub confidence: f64,
    /// When the turn completed
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, confidence: f64) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            confidence,
            timestamp: Utc::now(),
        }
    }

    /// Set an explicit timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = ConversationKey::new("42", "7");
        assert_eq!(key.to_string(), "42_7");
    }

    #[test]
    fn test_turn_serialization_roundtrip() {
        let turn = ConversationTurn::new("O que é estabilidade?", "É a garantia...", 0.92);
        let json = serde_json::to_string(&turn).unwrap();
        let back: ConversationTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(turn, back);
    }
}
