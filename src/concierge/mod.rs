//! Built-in Dining Concierge chatbot backend.
//!
//! Serves `POST /chatbot` with the same wire format the widget speaks, runs a
//! small slot-filling dialog per session and hands finished requests to a
//! background [`SuggestionWorker`] that emails recommendations.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use concierge_chat::concierge::{Catalog, Concierge, LogMailer, SuggestionQueue, SuggestionWorker};
//!
//! # async fn run() {
//! let catalog = Arc::new(Catalog::default());
//! let (queue, rx) = SuggestionQueue::bounded(16);
//! SuggestionWorker::new(catalog.clone(), Arc::new(LogMailer), 3, 20).spawn(rx);
//!
//! let concierge = Concierge::new(catalog, queue);
//! let replies = concierge.respond("session-1", Some("user-1"), "hello").unwrap();
//! assert!(!replies.is_empty());
//! # }
//! ```

pub mod catalog;
pub mod dialog;
pub mod endpoint;
pub mod queue;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

pub use catalog::{Catalog, Restaurant, recommendation_messages, returning_user_message};
pub use dialog::{
    ALL_SET, DialogStore, DiningDialog, GREETING, Intent, LastSearch, NOT_UNDERSTOOD, Slot,
    THANK_YOU, UserStateStore, classify,
};
pub use endpoint::router;
pub use queue::{
    DiningRequest, EMAIL_SUBJECT, Email, LogMailer, Mailer, SuggestionQueue, SuggestionWorker,
    compose_email,
};

use crate::message::BotMessage;

#[derive(Debug, thiserror::Error)]
pub enum ConciergeError {
    #[error("suggestion queue is full")]
    QueueFull,

    #[error("suggestion queue is closed")]
    QueueClosed,

    #[error("invalid dining request: {0}")]
    InvalidRequest(String),

    #[error("failed to deliver suggestions: {0}")]
    Delivery(String),
}

/// Dialog engine shared by every `/chatbot` request.
#[derive(Debug)]
pub struct Concierge {
    catalog: Arc<Catalog>,
    queue: SuggestionQueue,
    dialogs: DialogStore,
    users: UserStateStore,
    max_recommendations: usize,
    search_pool_size: usize,
}

impl Concierge {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, queue: SuggestionQueue) -> Self {
        Self {
            catalog,
            queue,
            dialogs: DialogStore::new(),
            users: UserStateStore::new(),
            max_recommendations: 3,
            search_pool_size: 20,
        }
    }

    /// Limit how many restaurants are recommended and how many are searched.
    #[must_use]
    pub fn with_limits(mut self, max_recommendations: usize, search_pool_size: usize) -> Self {
        self.max_recommendations = max_recommendations;
        self.search_pool_size = search_pool_size;
        self
    }

    /// Answer one utterance.
    pub fn respond(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        text: &str,
    ) -> Result<Vec<BotMessage>, ConciergeError> {
        self.respond_on(session_id, user_id, text, Utc::now().date_naive())
    }

    /// Answer one utterance, resolving relative dates against `today`.
    pub fn respond_on(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        text: &str,
        today: NaiveDate,
    ) -> Result<Vec<BotMessage>, ConciergeError> {
        if let Some(mut dialog) = self.dialogs.get(session_id) {
            if let Err(reprompt) = dialog.answer(text, today) {
                tracing::debug!(name: "concierge.slot.rejected", session_id, "Re-eliciting slot");
                return Ok(vec![BotMessage::text(reprompt)]);
            }
            return self.advance(session_id, user_id, dialog);
        }

        let intent = classify(text);
        tracing::debug!(name: "concierge.intent", session_id, intent = ?intent, "Classified utterance");

        match intent {
            Intent::Greeting => Ok(self.greet(user_id)),
            Intent::ThankYou => Ok(vec![BotMessage::text(THANK_YOU)]),
            Intent::DiningSuggestions => {
                self.advance(session_id, user_id, DiningDialog::from_utterance(text))
            }
            Intent::Unknown => Ok(vec![BotMessage::text(NOT_UNDERSTOOD)]),
        }
    }

    fn greet(&self, user_id: Option<&str>) -> Vec<BotMessage> {
        let mut replies = vec![BotMessage::text(GREETING)];
        let Some(last) = user_id.and_then(|id| self.users.last_search(id)) else {
            return replies;
        };
        let picks: Vec<&Restaurant> = self
            .catalog
            .search_by_cuisine(&last.cuisine, self.search_pool_size)
            .into_iter()
            .take(self.max_recommendations)
            .collect();
        replies.extend(recommendation_messages(&last.location, &last.cuisine, &picks));
        replies
    }

    fn advance(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        mut dialog: DiningDialog,
    ) -> Result<Vec<BotMessage>, ConciergeError> {
        if let Some(prompt) = dialog.elicit_next() {
            self.dialogs.put(session_id, dialog);
            return Ok(vec![BotMessage::text(prompt)]);
        }

        let Some(request) = dialog.to_request(user_id) else {
            return Err(ConciergeError::InvalidRequest("incomplete dialog".to_string()));
        };
        self.queue.enqueue(request.clone())?;
        self.dialogs.remove(session_id);

        if let Some(user_id) = user_id {
            self.users.save(
                user_id,
                LastSearch {
                    location: request.location.clone(),
                    cuisine: request.cuisine.clone(),
                },
            );
        }

        tracing::info!(
            name: "concierge.request.enqueued",
            session_id,
            cuisine = %request.cuisine,
            "Dining request queued"
        );
        Ok(vec![BotMessage::text(ALL_SET)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{StructuredReply, UnstructuredReply};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    fn texts(replies: &[BotMessage]) -> Vec<String> {
        replies
            .iter()
            .filter_map(|m| match m {
                BotMessage::Unstructured {
                    unstructured: UnstructuredReply { text, .. },
                } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn concierge() -> (Concierge, tokio::sync::mpsc::Receiver<DiningRequest>) {
        let catalog = Catalog::from_yaml(
            r"
- business_id: j1
  name: Sushi Nakazawa
  address: 23 Commerce St
  cuisine: japanese
  url: https://example.com/nakazawa
",
        )
        .unwrap();
        let (queue, rx) = SuggestionQueue::bounded(4);
        (Concierge::new(Arc::new(catalog), queue), rx)
    }

    #[test]
    fn test_simple_intents() {
        let (bot, _rx) = concierge();
        assert_eq!(texts(&bot.respond("s", None, "hello").unwrap()), vec![GREETING]);
        assert_eq!(texts(&bot.respond("s", None, "thanks").unwrap()), vec![THANK_YOU]);
        assert_eq!(texts(&bot.respond("s", None, "blue sky").unwrap()), vec![NOT_UNDERSTOOD]);
    }

    #[test]
    fn test_full_dialog_enqueues_once_and_remembers_user() {
        let (bot, mut rx) = concierge();
        let say = |text: &str| texts(&bot.respond_on("s-1", Some("u-1"), text, today()).unwrap());

        assert_eq!(say("I want japanese food"), vec![Slot::Location.prompt()]);
        assert_eq!(
            say("Boston"),
            vec!["Sorry, I can't fulfill requests for Boston. Please enter a valid location in Manhattan."]
        );
        assert_eq!(say("Manhattan"), vec![Slot::DiningDate.prompt()]);
        assert_eq!(say("tomorrow"), vec![Slot::DiningTime.prompt()]);
        assert_eq!(say("8pm"), vec![Slot::NumberOfPeople.prompt()]);
        assert_eq!(say("3"), vec![Slot::Email.prompt()]);
        assert_eq!(say("me@example"), vec![
            "That email address looks invalid. Please provide a valid email address."
        ]);
        assert_eq!(say("me@example.com"), vec![ALL_SET]);

        let request = rx.try_recv().unwrap();
        assert_eq!(request.cuisine, "japanese");
        assert_eq!(request.time, "20:00");
        assert!(rx.try_recv().is_err());

        // The dialog is finished, so the next utterance is classified again.
        assert_eq!(say("thank you"), vec![THANK_YOU]);

        let greeting = bot.respond("s-2", Some("u-1"), "hi").unwrap();
        let lines = texts(&greeting);
        assert_eq!(lines[0], GREETING);
        assert!(lines[1].starts_with(
            "Welcome back! Based on your last search for japanese food in manhattan"
        ));
        assert!(greeting.iter().any(|m| matches!(
            m,
            BotMessage::Structured {
                structured: StructuredReply::Product { .. }
            }
        )));
    }

    #[test]
    fn test_closed_queue_is_an_error() {
        let (bot, rx) = concierge();
        drop(rx);
        for text in ["italian in nyc", "today", "7pm", "2"] {
            bot.respond_on("s", None, text, today()).unwrap();
        }
        let err = bot.respond_on("s", None, "a@b.co", today()).unwrap_err();
        assert!(matches!(err, ConciergeError::QueueClosed));
    }
}
