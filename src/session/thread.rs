//! Widget session: pending outbound messages and the rendered transcript.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::ChatMessage;
use crate::render::Bubble;

/// Default session timeout (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Who produced a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Bot,
}

/// One bubble as it was shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub author: Author,
    pub bubble: Bubble,
    pub at: DateTime<Utc>,
}

/// A single widget session.
///
/// Cloning is cheap; clones share the same state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    /// User messages accepted but not yet sent to the chatbot.
    pending: Mutex<VecDeque<ChatMessage>>,
    transcript: RwLock<Vec<TranscriptEntry>>,
    last_activity: RwLock<DateTime<Utc>>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(SessionInner {
                id,
                pending: Mutex::new(VecDeque::new()),
                transcript: RwLock::new(Vec::new()),
                last_activity: RwLock::new(now),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Queue a user message for the next stream and record its bubble.
    pub fn submit(&self, message: ChatMessage) -> TranscriptEntry {
        let entry = TranscriptEntry {
            author: Author::User,
            bubble: Bubble::text(message.text.clone()),
            at: Utc::now(),
        };
        self.inner.pending.lock().unwrap().push_back(message);
        self.record(entry.clone());
        entry
    }

    /// Take the oldest pending user message.
    pub fn take_pending(&self) -> Option<ChatMessage> {
        let message = self.inner.pending.lock().unwrap().pop_front();
        if message.is_some() {
            self.touch();
        }
        message
    }

    /// Number of messages waiting to be sent.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }

    /// Append a bubble to the transcript.
    pub fn record(&self, entry: TranscriptEntry) {
        self.inner.transcript.write().unwrap().push(entry);
        self.touch();
    }

    /// Everything shown so far, in insertion order.
    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.transcript.read().unwrap().clone()
    }

    fn touch(&self) {
        let mut guard = self.inner.last_activity.write().unwrap();
        *guard = Utc::now();
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self.inner.last_activity.read().unwrap();
        // Negative durations (clock skew) never expire.
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }
}

/// Thread-safe store for sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session and return it.
    #[must_use]
    pub fn create(&self) -> Session {
        self.create_with_id(Uuid::new_v4().to_string())
    }

    /// Create a new session with a specific ID.
    #[must_use]
    pub fn create_with_id(&self, id: impl Into<String>) -> Session {
        let id = id.into();
        let session = Session::new(id.clone());
        self.inner.write().unwrap().insert(id, session.clone());
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner.read().unwrap().get(id).cloned()
    }

    /// Get a session by ID, creating it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> Session {
        if let Some(session) = self.get(id) {
            return session;
        }
        let mut guard = self.inner.write().unwrap();
        guard
            .entry(id.to_string())
            .or_insert_with(|| Session::new(id.to_string()))
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.inner.write().unwrap();
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_and_take_pending() {
        let session = Session::new("s-1".to_string());
        assert_eq!(session.id(), "s-1");

        let entry = session.submit(ChatMessage::new("u-1", "hello"));
        assert_eq!(entry.author, Author::User);
        assert_eq!(entry.bubble, Bubble::text("hello"));
        assert_eq!(session.pending_count(), 1);

        session.submit(ChatMessage::new("u-1", "again"));
        assert_eq!(session.take_pending().unwrap().text, "hello");
        assert_eq!(session.take_pending().unwrap().text, "again");
        assert!(session.take_pending().is_none());

        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn test_session_store() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let session = store.create();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(session.id()).unwrap().id(), session.id());

        let same = store.get_or_create(session.id());
        same.submit(ChatMessage::new("u", "shared"));
        assert_eq!(session.pending_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_cleanup_expired() {
        let store = SessionStore::new();
        let _ = store.create_with_id("a");
        assert_eq!(store.cleanup_expired_with_timeout(DEFAULT_SESSION_TIMEOUT), 0);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.cleanup_expired_with_timeout(Duration::ZERO), 1);
        assert!(store.is_empty());
    }
}
