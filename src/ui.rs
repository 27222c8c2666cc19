//! Server-rendered markup: the page shell, the chat widget and bubbles.

use chrono::{DateTime, Utc};
use url::Url;

use crate::message::ProductPayload;
use crate::render::Bubble;
use crate::session::Author;

/// Escape text for use in HTML content and quoted attributes.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Link target for a card action, if it is safe to follow.
///
/// Absolute `http`/`https` URLs and site-relative paths are accepted.
#[must_use]
pub fn safe_href(action: &str) -> Option<String> {
    let action = action.trim();
    if action.starts_with('/') && !action.starts_with("//") {
        return Some(action.to_string());
    }
    let url = Url::parse(action).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Markup for one product card.
#[must_use]
pub fn card_html(card: &ProductPayload) -> String {
    let label = if card.button_label.trim().is_empty() {
        "View"
    } else {
        card.button_label.as_str()
    };
    let button = match safe_href(&card.click_action) {
        Some(href) => format!(
            r#"<a class="card-action inline-flex items-center justify-center h-9 px-4 rounded-xl bg-primary text-white hover:bg-primaryMuted transition-all" href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
            escape_html(&href),
            escape_html(label)
        ),
        None => format!(
            r#"<button class="card-action h-9 px-4 rounded-xl bg-surfaceVariant text-textMuted" type="button" disabled>{}</button>"#,
            escape_html(label)
        ),
    };
    let image = safe_href(&card.image_url)
        .map(|src| {
            format!(
                r#"<img class="w-full h-32 object-cover" src="{}" alt="{}" loading="lazy">"#,
                escape_html(&src),
                escape_html(&card.name)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="product-card rounded-xl border border-panelBorder bg-panel overflow-hidden shadow-sm max-w-xs">{image}<div class="p-4 space-y-2"><h4 class="font-semibold">{name}</h4><p class="text-sm text-textMuted">{price}</p>{button}</div></div>"#,
        name = escape_html(&card.name),
        price = escape_html(&card.price),
    )
}

/// Markup for one chat bubble, timestamped `HH:MM`.
#[must_use]
pub fn bubble_html(author: Author, bubble: &Bubble, at: DateTime<Utc>) -> String {
    let (side, tone) = match author {
        Author::User => ("justify-end", "bg-primary text-white"),
        Author::Bot => ("justify-start", "bg-surfaceVariant text-textPrimary"),
    };
    let body = match bubble {
        Bubble::Text { text } => format!(
            r#"<p class="whitespace-pre-wrap">{}</p>"#,
            escape_html(text)
        ),
        Bubble::Card { card } => card_html(card),
        Bubble::Error { text } => format!(
            r#"<p class="whitespace-pre-wrap text-danger" role="alert">{}</p>"#,
            escape_html(text)
        ),
    };
    let stamp = at.format("%H:%M");
    let iso = at.to_rfc3339();

    format!(
        r#"<div class="message flex {side}"><div class="bubble max-w-[80%] px-4 py-2 rounded-2xl {tone}">{body}<time class="block text-[10px] opacity-60 mt-1" datetime="{iso}">{stamp}</time></div></div>"#
    )
}

/// Generate the HTML shell for the application.
#[must_use]
pub fn html_shell(title: &str, content: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Dining Concierge chat">
    <title>{title}</title>
    <style>
        .loading-dots::after {{ content: "..."; animation: pulse 1s infinite; }}
        @keyframes pulse {{ 50% {{ opacity: .3; }} }}
    </style>
</head>
<body class="min-h-screen bg-background text-textPrimary antialiased">
    <main id="app" class="container mx-auto px-4 py-4 max-w-3xl">
        {content}
    </main>
</body>
</html>"#
    )
}

/// Chat widget markup and its client script.
#[must_use]
pub fn chat_content(bot_name: &str) -> String {
    let bot_name = escape_html(bot_name);
    format!(
        r#"
    <div class="chat-shell flex flex-col h-[calc(100vh-4rem)] bg-surface rounded-3xl overflow-hidden shadow-lg">
        <header class="flex items-center px-6 py-4 bg-surfaceContainer shrink-0">
            <h2 class="font-semibold text-lg">{bot_name}</h2>
        </header>

        <div id="messages" class="flex-1 overflow-y-auto p-4 space-y-3" aria-live="polite" aria-label="Chat messages"></div>

        <form id="chat-form" class="flex gap-2 p-4 bg-surfaceContainer shrink-0">
            <input name="message" autocomplete="off" placeholder="Type your message..."
                class="flex-1 px-4 py-3 rounded-xl bg-surface focus:outline-none focus:ring-2 focus:ring-primary" required>
            <button type="submit" class="h-12 px-5 rounded-xl bg-primary text-white">Send</button>
        </form>
    </div>
    <script>
    (() => {{
        const list = document.getElementById('messages');
        const form = document.getElementById('chat-form');
        let sessionId = sessionStorage.getItem('concierge.sessionId') || '';

        const scroll = () => {{ list.scrollTop = list.scrollHeight; }};
        const append = (html) => {{ list.insertAdjacentHTML('beforeend', html); scroll(); }};

        form.addEventListener('submit', async (event) => {{
            event.preventDefault();
            const input = form.querySelector('[name=message]');
            const message = input.value.trim();
            if (!message) return;
            input.value = '';

            const resp = await fetch('/api/chat', {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify({{
                    message,
                    session_id: sessionId || null,
                    user_id: localStorage.getItem('concierge.userId'),
                }}),
            }});
            if (!resp.ok) return;
            const chat = await resp.json();
            sessionId = chat.session_id;
            sessionStorage.setItem('concierge.sessionId', sessionId);
            localStorage.setItem('concierge.userId', chat.user_id);
            append(chat.user_bubble);

            const slots = new Map();
            const source = new EventSource(chat.stream_url);
            source.addEventListener('bubble.loading', (e) => {{
                const {{ data }} = JSON.parse(e.data);
                const el = document.createElement('div');
                el.className = 'message flex justify-start';
                el.innerHTML = '<div class="bubble px-4 py-2 rounded-2xl bg-surfaceVariant loading-dots"></div>';
                slots.set(data.slot, el);
                list.appendChild(el);
                scroll();
            }});
            source.addEventListener('bubble.insert', (e) => {{
                const {{ data }} = JSON.parse(e.data);
                const el = slots.get(data.slot);
                if (el) {{ el.outerHTML = data.html; }} else {{ append(data.html); }}
                scroll();
            }});
            source.addEventListener('error', () => source.close());
            source.addEventListener('done', () => source.close());
        }});
    }})();
    </script>
    "#
    )
}
