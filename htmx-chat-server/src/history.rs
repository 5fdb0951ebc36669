//! In-memory chat history shown when the page is loaded.
//!
//! The history is bounded: once `capacity` entries are held, each append
//! evicts the oldest entries first.  Nothing survives a restart.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One rendered message on the chat page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub role: Role,
    pub text: String,
}

impl ChatEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

pub struct MessageHistory {
    capacity: usize,
    entries: Mutex<VecDeque<ChatEntry>>,
}

impl std::fmt::Debug for MessageHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessageHistory({}/{} entries)", self.len(), self.capacity)
    }
}

impl MessageHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a user/assistant exchange under a single lock so page loads
    /// never observe half of it.
    pub fn push_exchange(&self, user: ChatEntry, assistant: ChatEntry) {
        self.extend([user, assistant]);
    }

    pub fn extend(&self, new_entries: impl IntoIterator<Item = ChatEntry>) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        for entry in new_entries {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    /// Copy of the current entries, oldest first.
    pub fn snapshot(&self) -> Vec<ChatEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned mutex is still safe to read.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ChatEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
