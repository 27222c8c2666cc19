//! Widget session management.
//!
//! Sessions are identified by UUID. Each one holds the user messages that are
//! waiting for their reply stream and the transcript of every bubble shown.
//!
//! # Example
//!
//! ```rust
//! use concierge_chat::message::ChatMessage;
//! use concierge_chat::session::SessionStore;
//!
//! let store = SessionStore::new();
//! let session = store.create();
//! session.submit(ChatMessage::new("user-1", "Hello!"));
//!
//! assert_eq!(session.pending_count(), 1);
//! assert_eq!(session.transcript().len(), 1);
//! ```

mod thread;

pub use thread::{Author, DEFAULT_SESSION_TIMEOUT, Session, SessionStore, TranscriptEntry};
