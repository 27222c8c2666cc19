//! Response renderer.
//!
//! Turns a [`ResponseEnvelope`] into an ordered list of [`RenderStep`]s. Each
//! step names one bubble and how long to wait after the previous step before
//! inserting it. Playback onto an actual message list lives in
//! [`crate::widget`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::message::{BotMessage, ProductPayload, ResponseEnvelope, StructuredReply};

/// Delay between a product summary and its card.
pub const DEFAULT_CARD_DELAY: Duration = Duration::from_millis(1100);

/// Shown when the backend answered with no messages at all.
pub const EMPTY_REPLY_TEXT: &str = "Sorry, I didn't get a response. Please try again.";

/// One rendered chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bubble {
    /// Plain text.
    Text { text: String },
    /// Product card built from a structured payload.
    Card { card: ProductPayload },
    /// Fallback shown in place of a reply.
    Error { text: String },
}

impl Bubble {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error { text: text.into() }
    }
}

/// A bubble and the delay before it is inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderStep {
    /// Relative to the previous step.
    pub delay: Duration,
    pub bubble: Bubble,
}

impl RenderStep {
    fn now(bubble: Bubble) -> Self {
        Self {
            delay: Duration::ZERO,
            bubble,
        }
    }
}

/// Maps backend payloads to display steps.
#[derive(Debug, Clone, Copy)]
pub struct ResponseRenderer {
    card_delay: Duration,
}

impl Default for ResponseRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_CARD_DELAY)
    }
}

impl ResponseRenderer {
    #[must_use]
    pub fn new(card_delay: Duration) -> Self {
        Self { card_delay }
    }

    /// Render every message of the envelope, in order.
    #[must_use]
    pub fn render(&self, envelope: &ResponseEnvelope) -> Vec<RenderStep> {
        if envelope.messages.is_empty() {
            tracing::warn!(name: "render.empty", "Chatbot returned no messages");
            return vec![RenderStep::now(Bubble::error(EMPTY_REPLY_TEXT))];
        }

        let mut steps = Vec::with_capacity(envelope.messages.len());
        for (index, message) in envelope.messages.iter().enumerate() {
            match message {
                BotMessage::Unstructured { unstructured } => {
                    steps.push(RenderStep::now(Bubble::text(unstructured.text.clone())));
                }
                BotMessage::Structured {
                    structured: StructuredReply::Product { text, payload },
                } => {
                    steps.push(RenderStep::now(Bubble::text(text.clone())));
                    steps.push(RenderStep {
                        delay: self.card_delay,
                        bubble: Bubble::Card {
                            card: payload.clone(),
                        },
                    });
                }
                BotMessage::Structured {
                    structured: StructuredReply::Unsupported,
                }
                | BotMessage::Unsupported => {
                    tracing::info!(
                        name: "render.unsupported",
                        index,
                        "Skipping unsupported message type"
                    );
                }
            }
        }
        steps
    }

    /// A single fallback bubble for a failed call.
    #[must_use]
    pub fn render_failure(&self, err: &ChatError) -> Vec<RenderStep> {
        vec![RenderStep::now(Bubble::error(err.fallback_text()))]
    }
}
