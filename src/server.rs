use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::client::{ChatBackend, HttpChatbot};
use crate::concierge::{self, Catalog, Concierge, LogMailer, SuggestionQueue, SuggestionWorker};
use crate::config::AppConfig;
use crate::message::{ChatMessage, ChatbotRequest};
use crate::session::{Author, TranscriptEntry};
use crate::ui::{bubble_html, chat_content, html_shell};
use crate::widget::{ChannelList, WidgetEvent, play, sse_event};

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let chatbot = config.resolved_chatbot();
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpChatbot::new(&chatbot)?);

    info!(
        name: "chatbot.config.loaded",
        endpoint = %chatbot.endpoint,
        timeout_secs = chatbot.timeout_secs,
        has_api_key = chatbot.api_key.is_some(),
        "Chatbot configuration loaded"
    );

    let concierge = if config.concierge.enabled {
        Some(build_concierge(&config)?)
    } else {
        if config.chatbot.endpoint.trim().is_empty() {
            tracing::warn!(
                name: "chatbot.config.self",
                "No chatbot endpoint configured and the built-in concierge is disabled"
            );
        }
        None
    };

    let state = AppState::new(Arc::clone(&config), backend);
    spawn_session_sweeper(&state);

    let app = build_router(state, concierge);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Load the catalog and start the suggestion worker.
fn build_concierge(config: &AppConfig) -> anyhow::Result<Arc<Concierge>> {
    let settings = &config.concierge;
    let catalog = match settings.catalog_path.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(path) => Catalog::load(path)?,
        None => Catalog::default(),
    };
    info!(
        name: "concierge.catalog.loaded",
        restaurants = catalog.len(),
        "Restaurant catalog loaded"
    );
    let catalog = Arc::new(catalog);

    let (queue, rx) = SuggestionQueue::bounded(settings.queue_capacity);
    SuggestionWorker::new(
        Arc::clone(&catalog),
        Arc::new(LogMailer),
        settings.max_recommendations,
        settings.search_pool_size,
    )
    .spawn(rx);

    Ok(Arc::new(
        Concierge::new(catalog, queue)
            .with_limits(settings.max_recommendations, settings.search_pool_size),
    ))
}

fn spawn_session_sweeper(state: &AppState) {
    let sessions = state.sessions.clone();
    let timeout = state.config.widget.session_timeout();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(timeout);
            if removed > 0 {
                tracing::debug!(name: "session.expired", removed, "Removed idle sessions");
            }
        }
    });
}

/// Widget routes, plus the concierge on `/chatbot` when given.
pub fn build_router(state: AppState, chatbot: Option<Arc<Concierge>>) -> Router {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/chat", post(api_chat))
        .route("/api/chat/stream", get(api_chat_stream))
        .route("/api/sessions/{id}/messages", get(api_get_messages))
        .with_state(state);

    let app = match chatbot {
        Some(chatbot) => app.merge(concierge::router(chatbot)),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
}

// ─────────────────────────────────────────────────────────────────────────────
// Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    let bot_name = &state.config.widget.bot_name;
    Html(html_shell(bot_name, &chat_content(bot_name)))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for chat API.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    /// Browser-local user id; a new one is issued when missing.
    #[serde(default)]
    user_id: Option<String>,
    /// Optional session ID (creates new if not provided).
    #[serde(default)]
    session_id: Option<String>,
}

/// Response from chat API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub user_id: String,
    /// Where to open the SSE stream for the bot reply.
    pub stream_url: String,
    /// Markup for the user's own bubble.
    pub user_bubble: String,
}

/// POST /api/chat - Accept a user message and hand back a stream URL.
async fn api_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let text = req.message.trim();
    if text.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Message must not be empty".to_string(),
        ));
    }

    let user_id = req
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);

    let session = match req.session_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => state.sessions.get_or_create(id),
        _ => state.sessions.create(),
    };

    let entry = session.submit(ChatMessage::new(user_id.clone(), text));
    let session_id = session.id().to_string();
    let stream_url = format!("/api/chat/stream?session_id={session_id}");

    tracing::info!(
        name: "widget.message.accepted",
        session_id = %session_id,
        pending = session.pending_count(),
        "Chat message accepted"
    );

    Ok(Json(ChatResponse {
        session_id,
        user_id,
        stream_url,
        user_bubble: bubble_html(Author::User, &entry.bubble, entry.at),
    }))
}

/// Query parameters for the reply stream.
#[derive(Debug, Deserialize)]
struct StreamQuery {
    session_id: String,
}

/// GET /api/chat/stream - Relay the oldest pending message and play the reply.
async fn api_chat_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let Some(session) = state.sessions.get(&query.session_id) else {
        tracing::error!(session_id = %query.session_id, "Session not found");
        return single_error_sse("Session not found");
    };
    let Some(message) = session.take_pending() else {
        tracing::warn!(session_id = %query.session_id, "No pending message");
        return single_error_sse("No pending message");
    };

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let list = Arc::new(ChannelList::new(tx).with_session(session.clone()));

    let backend = Arc::clone(&state.backend);
    let renderer = state.renderer;
    let loading = state.pacing.loading;
    let request = ChatbotRequest::new(session.id(), message);

    tokio::spawn(async move {
        let steps = match backend.send(&request).await {
            Ok(envelope) => {
                tracing::debug!(
                    name: "chatbot.reply",
                    session_id = ?request.session_id,
                    messages = envelope.messages.len(),
                    "Chatbot replied"
                );
                renderer.render(&envelope)
            }
            Err(e) => {
                tracing::warn!(
                    name: "chatbot.failed",
                    session_id = ?request.session_id,
                    status = ?e.status(),
                    error = %e,
                    "Chatbot call failed"
                );
                renderer.render_failure(&e)
            }
        };
        play(list, steps, loading);
    });

    sse_response(UnboundedReceiverStream::new(rx).chain(stream::once(async { WidgetEvent::Done })))
}

/// GET /api/sessions/{id}/messages - Transcript of a session.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TranscriptEntry>>, StatusCode> {
    match state.sessions.get(&id) {
        Some(session) => Ok(Json(session.transcript())),
        None => Err(StatusCode::NOT_FOUND),
    }
}

fn sse_response<S>(events: S) -> Response
where
    S: Stream<Item = WidgetEvent> + Send + 'static,
{
    let stream = events.map(|evt| Ok::<Event, Infallible>(sse_event(&evt)));
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE))
        .into_response()
}

fn single_error_sse(message: &str) -> Response {
    sse_response(stream::iter([
        WidgetEvent::Error {
            message: message.to_string(),
        },
        WidgetEvent::Done,
    ]))
}
