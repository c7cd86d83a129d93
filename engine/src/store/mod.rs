//! Conversation Store
//!
//! Holds conversations keyed by identifier for the lifetime of the process.
//! The Orchestrator only sees the [`ConversationStore`] trait, so a durable
//! backend can replace [`InMemoryConversationStore`] without touching it.
//!
//! Each `append` is atomic, but nothing serializes whole turns: two turns
//! submitted concurrently for the same conversation may interleave their
//! user and assistant messages.

use sdk::{Conversation, ConversationSummary, Message, MessageRole};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// Key-value store of conversations
pub trait ConversationStore: Send + Sync {
    /// Snapshot of the conversation, if it exists
    fn get(&self, id: &str) -> Option<Conversation>;

    /// Insert an empty conversation under a freshly generated id
    fn create(&self) -> Conversation;

    /// Append a message to the conversation.
    ///
    /// An unknown `id` is not an error: a new conversation is created and
    /// the message lands there.
    fn append(&self, id: &str, role: MessageRole, content: &str) -> Message;

    /// Summaries of every stored conversation, oldest first
    fn list(&self) -> Vec<ConversationSummary>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Conversation>> {
        self.conversations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Conversation>> {
        self.conversations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn get(&self, id: &str) -> Option<Conversation> {
        self.read().get(id).cloned()
    }

    fn create(&self) -> Conversation {
        let conversation = Conversation::new(Uuid::new_v4().to_string());
        self.write()
            .insert(conversation.id.clone(), conversation.clone());
        debug!(conversation_id = %conversation.id, "Created conversation");
        conversation
    }

    fn append(&self, id: &str, role: MessageRole, content: &str) -> Message {
        let message = Message::new(role, content);
        let mut conversations = self.write();

        match conversations.get_mut(id) {
            Some(conversation) => conversation.push(message.clone()),
            None => {
                let mut conversation = Conversation::new(Uuid::new_v4().to_string());
                warn!(
                    requested_id = %id,
                    conversation_id = %conversation.id,
                    "Unknown conversation on append; created a new one"
                );
                conversation.push(message.clone());
                conversations.insert(conversation.id.clone(), conversation);
            }
        }

        message
    }

    fn list(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> =
            self.read().values().map(ConversationSummary::from).collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let store = InMemoryConversationStore::new();
        let conv = store.create();

        let fetched = store.get(&conv.id).unwrap();
        assert_eq!(fetched.id, conv.id);
        assert!(fetched.messages.is_empty());
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_create_generates_unique_ids() {
        let store = InMemoryConversationStore::new();
        let a = store.create();
        let b = store.create();
        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_append_preserves_order() {
        let store = InMemoryConversationStore::new();
        let conv = store.create();

        store.append(&conv.id, MessageRole::User, "first");
        store.append(&conv.id, MessageRole::Assistant, "second");

        let fetched = store.get(&conv.id).unwrap();
        let contents: Vec<&str> = fetched.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert!(fetched.updated_at >= fetched.created_at);
    }

    #[test]
    fn test_append_to_unknown_id_creates_conversation() {
        let store = InMemoryConversationStore::new();
        let message = store.append("does-not-exist", MessageRole::User, "hello");

        assert_eq!(message.content, "hello");
        assert_eq!(store.len(), 1);
        assert!(store.get("does-not-exist").is_none());

        let summary = &store.list()[0];
        assert_eq!(summary.message_count, 1);
    }

    #[test]
    fn test_get_returns_snapshot() {
        let store = InMemoryConversationStore::new();
        let conv = store.create();
        let snapshot = store.get(&conv.id).unwrap();

        store.append(&conv.id, MessageRole::User, "later");
        assert!(snapshot.messages.is_empty());
        assert_eq!(store.get(&conv.id).unwrap().messages.len(), 1);
    }
}
