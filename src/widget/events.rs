//! Display events pushed to the browser over SSE.
//!
//! # Example
//!
//! ```rust
//! use concierge_chat::widget::{WidgetEvent, event_name};
//!
//! let event = WidgetEvent::BubbleLoading { slot: 0 };
//! assert_eq!(event_name(&event), "bubble.loading");
//! ```

use axum::response::sse::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::render::Bubble;
use crate::session::Author;

/// One operation on the browser-side message list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum WidgetEvent {
    /// Append a loading placeholder occupying `slot`.
    #[serde(rename = "bubble.loading")]
    BubbleLoading { slot: u64 },

    /// Replace the placeholder in `slot` with a rendered bubble.
    #[serde(rename = "bubble.insert")]
    BubbleInsert {
        slot: u64,
        author: Author,
        bubble: Bubble,
        /// Pre-rendered markup for the bubble.
        html: String,
        at: DateTime<Utc>,
    },

    /// The stream could not be served at all.
    #[serde(rename = "error")]
    Error { message: String },

    /// No more events for this reply.
    #[serde(rename = "done")]
    Done,
}

/// Get the SSE event name for a [`WidgetEvent`].
pub fn event_name(evt: &WidgetEvent) -> &'static str {
    match evt {
        WidgetEvent::BubbleLoading { .. } => "bubble.loading",
        WidgetEvent::BubbleInsert { .. } => "bubble.insert",
        WidgetEvent::Error { .. } => "error",
        WidgetEvent::Done => "done",
    }
}

/// Convert a [`WidgetEvent`] into an axum SSE event.
///
/// The `event:` line carries the event name so `EventSource` listeners can
/// subscribe per kind; `data:` holds the JSON payload.
pub fn sse_event(evt: &WidgetEvent) -> Event {
    let json = serde_json::to_string(evt).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "data": { "message": e.to_string() } }).to_string()
    });
    Event::default().event(event_name(evt)).data(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_serialization() {
        let json = serde_json::to_string(&WidgetEvent::BubbleLoading { slot: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"bubble.loading","data":{"slot":3}}"#);
    }

    #[test]
    fn test_insert_serialization() {
        let event = WidgetEvent::BubbleInsert {
            slot: 1,
            author: Author::Bot,
            bubble: Bubble::text("Hi"),
            html: "<div>Hi</div>".to_string(),
            at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "bubble.insert");
        assert_eq!(value["data"]["author"], "bot");
        assert_eq!(value["data"]["bubble"]["kind"], "text");
        assert_eq!(value["data"]["bubble"]["text"], "Hi");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(event_name(&WidgetEvent::Done), "done");
        assert_eq!(
            event_name(&WidgetEvent::Error {
                message: "x".to_string()
            }),
            "error"
        );
    }
}
