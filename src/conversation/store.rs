//! Append-only, session-scoped turn history.

use crate::error::ConversationError;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in the conversation. Fields are private so a turn cannot
/// change after it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    role: Role,
    #[serde(rename = "content")]
    text: String,
    created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Ordered turns for one session. Turns are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
    capacity: Option<usize>,
}

impl ConversationStore {
    /// An unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses appends past `capacity` turns.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            turns: Vec::new(),
            capacity,
        }
    }

    pub fn append(&mut self, turn: Turn) -> Result<(), ConversationError> {
        if let Some(capacity) = self.capacity
            && self.turns.len() >= capacity
        {
            return Err(ConversationError::CapacityReached { capacity });
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Read-only view of every turn in insertion order.
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns that can still be appended, `None` when unbounded.
    pub fn remaining(&self) -> Option<usize> {
        self.capacity
            .map(|capacity| capacity.saturating_sub(self.turns.len()))
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_preserve_insertion_order() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("first")).unwrap();
        store.append(Turn::assistant("second")).unwrap();
        store.append(Turn::user("third")).unwrap();

        let texts: Vec<_> = store.all().iter().map(Turn::text).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(store.all()[1].role(), Role::Assistant);
    }

    #[test]
    fn bounded_store_rejects_past_capacity() {
        let mut store = ConversationStore::with_capacity(Some(2));
        store.append(Turn::user("a")).unwrap();
        assert_eq!(store.remaining(), Some(1));
        store.append(Turn::assistant("b")).unwrap();

        let error = store.append(Turn::user("c")).unwrap_err();
        assert_eq!(error, ConversationError::CapacityReached { capacity: 2 });
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unbounded_store_reports_no_remaining_limit() {
        let store = ConversationStore::new();
        assert!(store.is_empty());
        assert_eq!(store.remaining(), None);
    }

    #[test]
    fn turn_serializes_with_content_key() {
        let value = serde_json::to_value(Turn::user("hello")).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hello");
        assert!(value["created_at"].is_string());
    }
}
