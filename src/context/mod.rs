//! Conversation context carried between turns.
//!
//! Each (user, channel) pair owns a bounded FIFO history of completed turns.
//! The scoring core only reads a window of it; the orchestrator appends
//! after every verdict.

mod schema;
mod store;
mod types;

pub use schema::{get_schema_version, initialize_schema, is_initialized, SCHEMA_VERSION};
pub use store::{ContextStore, InMemoryContextStore, SqliteContextStore};
pub use types::{ConversationKey, ConversationTurn, DEFAULT_MAX_HISTORY};
