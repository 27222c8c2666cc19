//! Dining Concierge chat widget
//!
//! A chat widget that relays user text to a chatbot backend and plays the
//! bot's reply back into the page: a loading placeholder for every bubble,
//! product cards shortly after their summary, and one fallback bubble for
//! anything that goes wrong.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server; replies are streamed to the page over SSE
//! - **Client**: one HTTP call per user message to the configured chatbot
//! - **Renderer**: turns a response envelope into timed display steps
//! - **Concierge**: a built-in slot-filling dining chatbot on `/chatbot`
//!
//! # Modules
//!
//! - [`message`]: chatbot wire types and envelope decoding
//! - [`render`]: response renderer
//! - [`widget`]: message list, playback and SSE events
//! - [`client`]: outbound chatbot call
//! - [`concierge`]: dining chatbot backend
//! - [`session`]: widget sessions and transcripts

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::map_err_ignore)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod client;
pub mod concierge;
pub mod config;
pub mod error;
pub mod message;
pub mod render;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod ui;
pub mod widget;

use std::sync::Arc;

use crate::client::ChatBackend;
use crate::config::AppConfig;
use crate::render::ResponseRenderer;
use crate::session::SessionStore;
use crate::widget::Pacing;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Widget sessions.
    pub sessions: SessionStore,
    /// Where user messages are relayed.
    pub backend: Arc<dyn ChatBackend>,
    pub renderer: ResponseRenderer,
    pub pacing: Pacing,
}

impl AppState {
    /// State with pacing taken from the widget config.
    #[must_use]
    pub fn new(config: Arc<AppConfig>, backend: Arc<dyn ChatBackend>) -> Self {
        let pacing = config.widget.pacing();
        Self::with_pacing(config, backend, pacing)
    }

    #[must_use]
    pub fn with_pacing(
        config: Arc<AppConfig>,
        backend: Arc<dyn ChatBackend>,
        pacing: Pacing,
    ) -> Self {
        Self {
            config,
            sessions: SessionStore::new(),
            backend,
            renderer: ResponseRenderer::new(pacing.card_delay),
            pacing,
        }
    }
}
