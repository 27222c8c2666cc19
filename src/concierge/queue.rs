//! Suggestion queue and the worker that emails recommendations.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::catalog::{Catalog, Restaurant};
use super::ConciergeError;

pub const EMAIL_SUBJECT: &str = "Your Dining Concierge Recommendations";

const DEFAULT_LOCATION: &str = "manhattan";

/// A completed dining request waiting for suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiningRequest {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub people: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl DiningRequest {
    /// Normalize for searching: lowercase cuisine, trimmed email, default
    /// location. Requests without a cuisine or an email are rejected.
    pub fn normalized(mut self) -> Result<Self, ConciergeError> {
        self.cuisine = self.cuisine.trim().to_lowercase();
        self.email = self.email.trim().to_string();
        self.location = self.location.trim().to_lowercase();
        if self.location.is_empty() {
            self.location = DEFAULT_LOCATION.to_string();
        }
        if self.cuisine.is_empty() || self.email.is_empty() {
            return Err(ConciergeError::InvalidRequest(
                "missing cuisine or email".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Outgoing recommendation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers recommendation emails.
#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug {
    /// Send `email` and return a provider message id.
    async fn send(&self, email: &Email) -> anyhow::Result<String>;
}

/// Mailer that only logs what it would send.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> anyhow::Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            name: "concierge.mail.sent",
            message_id = %id,
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "Recommendation email"
        );
        Ok(id)
    }
}

/// Producer side of the suggestion queue.
#[derive(Debug, Clone)]
pub struct SuggestionQueue {
    tx: mpsc::Sender<DiningRequest>,
}

impl SuggestionQueue {
    /// Create a queue holding at most `capacity` requests.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<DiningRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting.
    pub fn enqueue(&self, request: DiningRequest) -> Result<(), ConciergeError> {
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ConciergeError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ConciergeError::QueueClosed,
        })
    }
}

/// Compose the recommendation email for `request`.
#[must_use]
pub fn compose_email(request: &DiningRequest, restaurants: &[&Restaurant]) -> Email {
    let DiningRequest {
        location,
        cuisine,
        date,
        time,
        people,
        email,
        ..
    } = request;

    let body = if restaurants.is_empty() {
        format!(
            "Hello!\n\n\
             Here are your dining request details:\n\
             - Cuisine: {cuisine}\n\
             - Location: {location}\n\
             - Date: {date}\n\
             - Time: {time}\n\
             - Number of people: {people}\n\n\
             Sorry, we could not find matching restaurants at the moment.\n\
             Please try another cuisine or try again later.\n\n\
             Best,\nDining Concierge Bot\n"
        )
    } else {
        let lines: String = restaurants
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                let address = if r.address.is_empty() { "N/A" } else { &r.address };
                format!(
                    "{}. {}\n   Address: {}\n   Rating: {}\n",
                    idx + 1,
                    r.name,
                    address,
                    r.rating_line()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Hello!\n\n\
             Here are my {cuisine} restaurant suggestions for {people} people, \
             on {date} at {time} in {location}:\n\n\
             {lines}\n\n\
             Enjoy your meal!\n\n\
             Best,\nDining Concierge Bot\n"
        )
    };

    Email {
        to: email.clone(),
        subject: EMAIL_SUBJECT.to_string(),
        body,
    }
}

/// Drains the suggestion queue.
#[derive(Debug)]
pub struct SuggestionWorker {
    catalog: Arc<Catalog>,
    mailer: Arc<dyn Mailer>,
    max_recommendations: usize,
    search_pool_size: usize,
}

impl SuggestionWorker {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        mailer: Arc<dyn Mailer>,
        max_recommendations: usize,
        search_pool_size: usize,
    ) -> Self {
        Self {
            catalog,
            mailer,
            max_recommendations,
            search_pool_size,
        }
    }

    /// Handle one request. Malformed requests are dropped.
    pub async fn process(&self, request: DiningRequest) -> Result<Email, ConciergeError> {
        let request = request.normalized()?;
        let pool = self
            .catalog
            .search_by_cuisine(&request.cuisine, self.search_pool_size);
        let picks: Vec<&Restaurant> = pool.into_iter().take(self.max_recommendations).collect();

        let email = compose_email(&request, &picks);
        let message_id = self
            .mailer
            .send(&email)
            .await
            .map_err(|e| ConciergeError::Delivery(e.to_string()))?;

        tracing::info!(
            name: "concierge.suggestions.sent",
            cuisine = %request.cuisine,
            recommendations = picks.len(),
            message_id = %message_id,
            "Sent dining suggestions"
        );
        Ok(email)
    }

    /// Consume requests until every producer is gone.
    pub fn spawn(self, mut rx: mpsc::Receiver<DiningRequest>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                if let Err(e) = self.process(request).await {
                    tracing::error!(
                        name: "concierge.suggestions.failed",
                        error = %e,
                        "Dropping dining request"
                    );
                }
            }
            tracing::debug!(name: "concierge.worker.stopped", "Suggestion queue closed");
        })
    }
}
