use crate::logging;
use crate::persona::SEED_MESSAGE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

/// A message before the store stamps it
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub role: Role,
    pub content: String,
}

impl PendingMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A single string-keyed durable slot
pub trait PersistenceSlot: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>>;
    fn write(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

impl<T: PersistenceSlot + ?Sized> PersistenceSlot for Arc<T> {
    fn read(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        (**self).write(key, value)
    }
}

/// Process-lifetime slot, for tests and for running without a database
#[derive(Default)]
pub struct MemorySlot {
    items: Mutex<std::collections::HashMap<String, String>>,
}

impl PersistenceSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn seed_message(id: String) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: SEED_MESSAGE.to_string(),
        id,
        timestamp: Utc::now(),
    }
}

/// Ordered message log, written through to its slot on every change
pub struct SessionStore {
    slot: Box<dyn PersistenceSlot>,
    key: String,
    messages: Vec<ChatMessage>,
}

impl SessionStore {
    /// Reload the log stored under `key`. Missing, unreadable or corrupt data starts a fresh session.
    pub fn load(slot: Box<dyn PersistenceSlot>, key: &str) -> Self {
        let messages = match slot.read(key) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<ChatMessage>>(&json) {
                Ok(messages) if !messages.is_empty() => {
                    logging::log_session(None, &format!("Restored {} messages from '{}'", messages.len(), key));
                    messages
                }
                Ok(_) => vec![seed_message("initial".to_string())],
                Err(e) => {
                    logging::log_error(None, &format!("Stored chat history is corrupt, starting fresh: {}", e));
                    vec![seed_message("initial".to_string())]
                }
            },
            Ok(None) => vec![seed_message("initial".to_string())],
            Err(e) => {
                logging::log_error(None, &format!("Failed to read chat history, starting fresh: {}", e));
                vec![seed_message("initial".to_string())]
            }
        };

        Self {
            slot,
            key: key.to_string(),
            messages,
        }
    }

    /// Stamp, append and persist. Returns the stored message.
    pub fn add_message(&mut self, pending: PendingMessage) -> ChatMessage {
        let message = ChatMessage {
            role: pending.role,
            content: pending.content,
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        };
        self.messages.push(message.clone());
        self.persist();
        message
    }

    /// Replace the log with a single fresh seed message
    pub fn reset_chat(&mut self) {
        self.messages = vec![seed_message(format!("initial-{}", Uuid::new_v4()))];
        self.persist();
        logging::log_session(None, "Chat reset");
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    // Best effort: a failed write leaves the in-memory log authoritative
    fn persist(&self) {
        let json = match serde_json::to_string(&self.messages) {
            Ok(json) => json,
            Err(e) => {
                logging::log_error(None, &format!("Failed to serialize chat history: {}", e));
                return;
            }
        };
        if let Err(e) = self.slot.write(&self.key, &json) {
            logging::log_error(None, &format!("Failed to persist chat history: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    const KEY: &str = "degenRugRatsChat";

    struct BrokenSlot;

    impl PersistenceSlot for BrokenSlot {
        fn read(&self, _key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
            Err("disk on fire".into())
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("disk on fire".into())
        }
    }

    #[test]
    fn test_fresh_store_has_seed() {
        let store = SessionStore::load(Box::new(MemorySlot::default()), KEY);
        assert_eq!(store.len(), 1);
        assert_eq!(store.history()[0].role, Role::Assistant);
        assert_eq!(store.history()[0].id, "initial");
        assert_eq!(store.history()[0].content, SEED_MESSAGE);
    }

    #[test]
    fn test_round_trip_through_slot() {
        let slot = Arc::new(MemorySlot::default());
        let mut store = SessionStore::load(Box::new(slot.clone()), KEY);
        store.add_message(PendingMessage::user("what's the price?"));
        store.add_message(PendingMessage::assistant("cheap, ser"));

        let reloaded = SessionStore::load(Box::new(slot), KEY);
        assert_eq!(reloaded.history(), store.history());
    }

    #[test]
    fn test_reset_leaves_single_assistant_message() {
        let slot = Arc::new(MemorySlot::default());
        let mut store = SessionStore::load(Box::new(slot.clone()), KEY);
        store.add_message(PendingMessage::user("gm"));
        store.add_message(PendingMessage::assistant("gm rat"));

        store.reset_chat();
        assert_eq!(store.len(), 1);
        assert_eq!(store.history()[0].role, Role::Assistant);
        assert!(store.history()[0].id.starts_with("initial-"));

        // Reset is persisted too
        let reloaded = SessionStore::load(Box::new(slot), KEY);
        assert_eq!(reloaded.history(), store.history());
    }

    #[test]
    fn test_reset_ids_are_unique() {
        let mut store = SessionStore::load(Box::new(MemorySlot::default()), KEY);
        store.reset_chat();
        let first = store.history()[0].id.clone();
        store.reset_chat();
        assert_ne!(store.history()[0].id, first);
    }

    #[test]
    fn test_corrupt_data_falls_back_to_seed() {
        let slot = MemorySlot::default();
        slot.write(KEY, "[{\"role\": \"rat\"").unwrap();

        let store = SessionStore::load(Box::new(slot), KEY);
        assert_eq!(store.len(), 1);
        assert_eq!(store.history()[0].content, SEED_MESSAGE);
    }

    #[test]
    fn test_broken_slot_is_never_fatal() {
        let mut store = SessionStore::load(Box::new(BrokenSlot), KEY);
        assert_eq!(store.len(), 1);

        store.add_message(PendingMessage::user("still here?"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_file_backed_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sewerking.db");

        let history = {
            let db = Database::open(&path).unwrap();
            let mut store = SessionStore::load(Box::new(db), KEY);
            store.add_message(PendingMessage::user("wen moon"));
            store.add_message(PendingMessage::assistant("soon"));
            store.history().to_vec()
        };

        let db = Database::open(&path).unwrap();
        let store = SessionStore::load(Box::new(db), KEY);
        assert_eq!(store.history(), history.as_slice());
    }

    #[test]
    fn test_message_serializes_with_lowercase_role() {
        let store = SessionStore::load(Box::new(MemorySlot::default()), KEY);
        let json = serde_json::to_string(&store.history()[0]).unwrap();
        assert!(json.contains("\"role\":\"assistant\""));
    }
}
