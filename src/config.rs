use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::widget::Pacing;

/// Prefix for environment overrides, e.g. `CONCIERGE_SERVER__PORT=8000`.
pub const ENV_PREFIX: &str = "CONCIERGE";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Chatbot endpoint the widget relays messages to
    #[arg(long, env = "CHATBOT_ENDPOINT")]
    pub chatbot_endpoint: Option<String>,

    /// API key sent as `x-api-key` to the chatbot endpoint
    #[arg(long, env = "CHATBOT_API_KEY", hide_env_values = true)]
    pub chatbot_api_key: Option<String>,

    /// Serve the built-in Dining Concierge backend on /chatbot
    #[arg(long, env = "CONCIERGE_ENABLED")]
    pub concierge_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chatbot: ChatbotConfig,
    pub widget: WidgetConfig,
    pub concierge: ConciergeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatbotConfig {
    /// Empty means "the built-in concierge on this server".
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    pub bot_name: String,
    pub loading_delay_ms: u64,
    pub card_delay_ms: u64,
    pub session_timeout_secs: u64,
}

impl WidgetConfig {
    #[must_use]
    pub fn pacing(&self) -> Pacing {
        Pacing {
            loading: Duration::from_millis(self.loading_delay_ms),
            card_delay: Duration::from_millis(self.card_delay_ms),
        }
    }

    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConciergeConfig {
    pub enabled: bool,
    /// YAML restaurant catalog; an empty catalog is used when unset.
    pub catalog_path: Option<String>,
    pub max_recommendations: usize,
    pub search_pool_size: usize,
    pub queue_capacity: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        // 1. Defaults
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("chatbot.endpoint", "")?
            .set_default("chatbot.timeout_secs", 10)?
            .set_default("widget.bot_name", "Dining Concierge")?
            .set_default("widget.loading_delay_ms", 500)?
            .set_default("widget.card_delay_ms", 1100)?
            .set_default("widget.session_timeout_secs", 30 * 60)?
            .set_default("concierge.enabled", true)?
            .set_default("concierge.max_recommendations", 3)?
            .set_default("concierge.search_pool_size", 20)?
            .set_default("concierge.queue_capacity", 64)?;

        // 2. Config file: explicit path, else ./config.{yaml,toml,json} if present
        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(Path::new(path)).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Prefixed environment, e.g. CONCIERGE_WIDGET__CARD_DELAY_MS=0
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (and their clap-level env vars) win
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(endpoint) = cli.chatbot_endpoint {
            builder = builder.set_override("chatbot.endpoint", endpoint)?;
        }
        if let Some(key) = cli.chatbot_api_key {
            builder = builder.set_override("chatbot.api_key", key)?;
        }
        if let Some(enabled) = cli.concierge_enabled {
            builder = builder.set_override("concierge.enabled", enabled)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Where the widget sends user messages.
    ///
    /// Falls back to this server's own `/chatbot` route when no endpoint is
    /// configured.
    #[must_use]
    pub fn chatbot_endpoint(&self) -> String {
        let configured = self.chatbot.endpoint.trim();
        if configured.is_empty() {
            format!("http://127.0.0.1:{}/chatbot", self.server.port)
        } else {
            configured.to_string()
        }
    }

    /// Chatbot settings with the endpoint resolved.
    #[must_use]
    pub fn resolved_chatbot(&self) -> ChatbotConfig {
        ChatbotConfig {
            endpoint: self.chatbot_endpoint(),
            ..self.chatbot.clone()
        }
    }
}
