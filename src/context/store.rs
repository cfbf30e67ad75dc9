//! Conversation context stores.
//!
//! A store keeps, per (user, channel), the most recent N turns in the order
//! they happened. Every append evicts the oldest turns beyond N.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::context::schema::{initialize_schema, is_initialized};
use crate::context::types::{ConversationKey, ConversationTurn, DEFAULT_MAX_HISTORY};
use crate::error::{Error, Result};

/// Bounded, ordered history of turns per conversation.
///
/// Implementations guarantee at most one writer per key at a time, so the
/// FIFO bound holds after every `append`.
pub trait ContextStore: Send + Sync {
    /// Turns for `key`, oldest first, at most [`ContextStore::max_history`].
    fn get(&self, key: &ConversationKey) -> Result<Vec<ConversationTurn>>;

    /// Append a turn and truncate to the bound.
    fn append(&self, key: &ConversationKey, turn: ConversationTurn) -> Result<()>;

    /// Number of turns kept per conversation.
    fn max_history(&self) -> usize;
}

/// In-process store backed by a map of ring buffers.
#[derive(Debug)]
pub struct InMemoryContextStore {
    turns: Mutex<HashMap<ConversationKey, VecDeque<ConversationTurn>>>,
    max_history: usize,
}

impl Default for InMemoryContextStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl InMemoryContextStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            turns: Mutex::new(HashMap::new()),
            max_history: max_history.max(1),
        }
    }
}

impl ContextStore for InMemoryContextStore {
    fn get(&self, key: &ConversationKey) -> Result<Vec<ConversationTurn>> {
        let turns = self
            .turns
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock context map: {}", e)))?;
        Ok(turns
            .get(key)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn append(&self, key: &ConversationKey, turn: ConversationTurn) -> Result<()> {
        let mut turns = self
            .turns
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock context map: {}", e)))?;
        let history = turns.entry(key.clone()).or_default();
        history.push_back(turn);
        while history.len() > self.max_history {
            history.pop_front();
        }
        Ok(())
    }

    fn max_history(&self) -> usize {
        self.max_history
    }
}

/// SQLite-backed store.
pub struct SqliteContextStore {
    conn: Arc<Mutex<Connection>>,
    max_history: usize,
}

impl SqliteContextStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>, max_history: usize) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ContextStore(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| Error::ContextStore(e.to_string()))?;

        if !is_initialized(&conn) {
            initialize_schema(&conn).map_err(|e| Error::ContextStore(e.to_string()))?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            max_history: max_history.max(1),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory(max_history: usize) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::ContextStore(e.to_string()))?;
        initialize_schema(&conn).map_err(|e| Error::ContextStore(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            max_history: max_history.max(1),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock connection: {}", e)))?;
        f(&conn).map_err(|e| Error::ContextStore(e.to_string()))
    }

    /// Number of stored turns for a conversation.
    pub fn count(&self, key: &ConversationKey) -> Result<usize> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM conversation_turns WHERE user_id = ?1 AND channel_id = ?2",
                params![key.user_id, key.channel_id],
                |row| row.get::<_, i64>(0),
            )
        })
        .map(|n| n as usize)
    }
}

impl ContextStore for SqliteContextStore {
    fn get(&self, key: &ConversationKey) -> Result<Vec<ConversationTurn>> {
        let mut turns = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT question, answer, confidence, created_at
                 FROM conversation_turns
                 WHERE user_id = ?1 AND channel_id = ?2
                 ORDER BY seq DESC
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map(
                params![key.user_id, key.channel_id, self.max_history as i64],
                |row| {
                    Ok(ConversationTurn {
                        question: row.get(0)?,
                        answer: row.get(1)?,
                        confidence: row.get(2)?,
                        timestamp: parse_datetime(row.get(3)?),
                    })
                },
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        turns.reverse();
        Ok(turns)
    }

    fn append(&self, key: &ConversationKey, turn: ConversationTurn) -> Result<()> {
        let evicted = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO conversation_turns
                    (user_id, channel_id, question, answer, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key.user_id,
                    key.channel_id,
                    turn.question,
                    turn.answer,
                    turn.confidence,
                    turn.timestamp.to_rfc3339(),
                ],
            )?;
            let evicted = tx.execute(
                "DELETE FROM conversation_turns
                 WHERE user_id = ?1 AND channel_id = ?2 AND seq NOT IN (
                    SELECT seq FROM conversation_turns
                    WHERE user_id = ?1 AND channel_id = ?2
                    ORDER BY seq DESC
                    LIMIT ?3
                 )",
                params![key.user_id, key.channel_id, self.max_history as i64],
            )?;
            tx.commit()?;
            Ok(evicted)
        })?;
        if evicted > 0 {
            debug!(conversation = %key, evicted, "evicted old turns");
        }
        Ok(())
    }

    fn max_history(&self) -> usize {
        self.max_history
    }
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn turn(i: usize) -> ConversationTurn {
        ConversationTurn::new(format!("pergunta {}", i), format!("resposta {}", i), 0.9)
    }

    fn questions(turns: &[ConversationTurn]) -> Vec<String> {
        turns.iter().map(|t| t.question.clone()).collect()
    }

    fn check_fifo(store: &dyn ContextStore) {
        let key = ConversationKey::new("u1", "c1");
        assert!(store.get(&key).unwrap().is_empty());

        for i in 0..7 {
            store.append(&key, turn(i)).unwrap();
        }
        assert_eq!(
            questions(&store.get(&key).unwrap()),
            vec!["pergunta 4", "pergunta 5", "pergunta 6"]
        );

        // Other conversations are untouched
        let other = ConversationKey::new("u1", "c2");
        store.append(&other, turn(99)).unwrap();
        assert_eq!(store.get(&other).unwrap().len(), 1);
        assert_eq!(store.get(&key).unwrap().len(), 3);
    }

    #[test]
    fn test_in_memory_fifo() {
        check_fifo(&InMemoryContextStore::new(3));
    }

    #[test]
    fn test_sqlite_fifo() {
        let store = SqliteContextStore::in_memory(3).unwrap();
        check_fifo(&store);
        assert_eq!(store.count(&ConversationKey::new("u1", "c1")).unwrap(), 3);
    }

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("oraculo.db");
        let key = ConversationKey::new("42", "7");

        {
            let store = SqliteContextStore::open(&path, 5).unwrap();
            store
                .append(&key, ConversationTurn::new("O que é CLT?", "Consolidação...", 0.93))
                .unwrap();
        }

        let store = SqliteContextStore::open(&path, 5).unwrap();
        let turns = store.get(&key).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].question, "O que é CLT?");
        assert_eq!(turns[0].confidence, 0.93);
    }

    #[test]
    fn test_sqlite_keeps_timestamps() {
        let store = SqliteContextStore::in_memory(5).unwrap();
        let key = ConversationKey::new("u", "c");
        let at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        store.append(&key, turn(0).with_timestamp(at)).unwrap();
        assert_eq!(store.get(&key).unwrap()[0].timestamp, at);
    }
}
