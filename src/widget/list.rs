//! Message list seam, the insert-message operation and render playback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::WidgetEvent;
use crate::render::{Bubble, DEFAULT_CARD_DELAY, RenderStep};
use crate::session::{Author, Session, TranscriptEntry};
use crate::ui;

/// How long a loading placeholder stays up before its content appears.
pub const DEFAULT_LOADING_DELAY: Duration = Duration::from_millis(500);

/// Position of a bubble in the message list.
pub type SlotId = u64;

/// Fixed UI pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Placeholder lifetime for every inserted bubble.
    pub loading: Duration,
    /// Gap between a product summary and its card.
    pub card_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            loading: DEFAULT_LOADING_DELAY,
            card_delay: DEFAULT_CARD_DELAY,
        }
    }
}

impl Pacing {
    /// No delays at all.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            loading: Duration::ZERO,
            card_delay: Duration::ZERO,
        }
    }
}

/// An append-only list of chat bubbles.
pub trait MessageList: Send + Sync + 'static {
    /// Append a loading placeholder and return its slot.
    fn show_loading(&self) -> SlotId;

    /// Replace the placeholder in `slot` with real content.
    fn fill(&self, slot: SlotId, bubble: Bubble, at: DateTime<Utc>);
}

/// Show a placeholder now and fill it after `loading`.
///
/// The returned handle may be dropped; the fill still happens.
pub fn insert_message<L>(list: &Arc<L>, bubble: Bubble, loading: Duration) -> JoinHandle<()>
where
    L: MessageList + ?Sized,
{
    let slot = list.show_loading();
    let list = Arc::clone(list);
    tokio::spawn(async move {
        if !loading.is_zero() {
            tokio::time::sleep(loading).await;
        }
        list.fill(slot, bubble, Utc::now());
    })
}

/// Insert every step in order, honouring each step's delay.
///
/// Placeholders are reserved in step order, so a later message never lands
/// above an earlier one even when a card delay sits between them.
pub fn play<L>(list: Arc<L>, steps: Vec<RenderStep>, loading: Duration) -> JoinHandle<()>
where
    L: MessageList + ?Sized,
{
    tokio::spawn(async move {
        for step in steps {
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            insert_message(&list, step.bubble, loading);
        }
    })
}

/// A message list that forwards operations to an SSE stream.
///
/// Filled bubbles are also appended to the session transcript. The stream
/// ends once the list and every pending fill have been dropped.
#[derive(Debug)]
pub struct ChannelList {
    next_slot: AtomicU64,
    tx: UnboundedSender<WidgetEvent>,
    session: Option<Session>,
}

impl ChannelList {
    #[must_use]
    pub fn new(tx: UnboundedSender<WidgetEvent>) -> Self {
        Self {
            next_slot: AtomicU64::new(0),
            tx,
            session: None,
        }
    }

    /// Record filled bubbles in `session`.
    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    fn send(&self, event: WidgetEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!(name: "widget.stream.closed", "Client went away, dropping event");
        }
    }
}

impl MessageList for ChannelList {
    fn show_loading(&self) -> SlotId {
        let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
        self.send(WidgetEvent::BubbleLoading { slot });
        slot
    }

    fn fill(&self, slot: SlotId, bubble: Bubble, at: DateTime<Utc>) {
        if let Some(session) = &self.session {
            session.record(TranscriptEntry {
                author: Author::Bot,
                bubble: bubble.clone(),
                at,
            });
        }
        let html = ui::bubble_html(Author::Bot, &bubble, at);
        self.send(WidgetEvent::BubbleInsert {
            slot,
            author: Author::Bot,
            bubble,
            html,
            at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Loading(SlotId),
        Fill(SlotId, Bubble),
    }

    struct RecordingList {
        start: Instant,
        next: AtomicU64,
        ops: Mutex<Vec<(Op, u128)>>,
    }

    impl RecordingList {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                start: Instant::now(),
                next: AtomicU64::new(0),
                ops: Mutex::new(Vec::new()),
            })
        }

        /// Operations with their offset in whole milliseconds.
        fn ops(&self) -> Vec<(Op, u128)> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl MessageList for RecordingList {
        fn show_loading(&self) -> SlotId {
            let slot = self.next.fetch_add(1, Ordering::SeqCst);
            self.ops
                .lock()
                .unwrap()
                .push((Op::Loading(slot), self.start.elapsed().as_millis()));
            slot
        }

        fn fill(&self, slot: SlotId, bubble: Bubble, _at: DateTime<Utc>) {
            self.ops
                .lock()
                .unwrap()
                .push((Op::Fill(slot, bubble), self.start.elapsed().as_millis()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_message_shows_placeholder_first() {
        let list = RecordingList::new();
        let handle = insert_message(&list, Bubble::text("hi"), DEFAULT_LOADING_DELAY);

        assert_eq!(list.ops(), vec![(Op::Loading(0), 0)]);

        handle.await.unwrap();
        assert_eq!(
            list.ops(),
            vec![
                (Op::Loading(0), 0),
                (Op::Fill(0, Bubble::text("hi")), 500),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_product_card_after_delay() {
        let list = RecordingList::new();
        let card = Bubble::Card {
            card: crate::message::ProductPayload::default(),
        };
        let steps = vec![
            RenderStep {
                delay: Duration::ZERO,
                bubble: Bubble::text("summary"),
            },
            RenderStep {
                delay: DEFAULT_CARD_DELAY,
                bubble: card.clone(),
            },
            RenderStep {
                delay: Duration::ZERO,
                bubble: Bubble::text("after"),
            },
        ];

        play(Arc::clone(&list), steps, DEFAULT_LOADING_DELAY)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let mut ops = list.ops();
        ops.sort_by_key(|(_, at)| *at);
        assert_eq!(ops[0], (Op::Loading(0), 0));
        assert_eq!(ops[1], (Op::Fill(0, Bubble::text("summary")), 500));
        assert_eq!(ops[2].1, 1100);
        assert_eq!(ops[3].1, 1100);
        assert!(ops[2..4].contains(&(Op::Loading(1), 1100)));
        assert!(ops[2..4].contains(&(Op::Loading(2), 1100)));
        assert_eq!(ops[4].1, 1600);
        assert_eq!(ops[5].1, 1600);
        assert!(ops[4..6].contains(&(Op::Fill(1, card), 1600)));
        assert!(ops[4..6].contains(&(Op::Fill(2, Bubble::text("after")), 1600)));
    }

    #[tokio::test]
    async fn test_channel_list_emits_events_and_records() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let store = crate::session::SessionStore::new();
        let session = store.create();
        let list = Arc::new(ChannelList::new(tx).with_session(session.clone()));

        play(
            list,
            vec![RenderStep {
                delay: Duration::ZERO,
                bubble: Bubble::text("hello"),
            }],
            Duration::ZERO,
        );

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], WidgetEvent::BubbleLoading { slot: 0 });
        match &events[1] {
            WidgetEvent::BubbleInsert { slot, html, .. } => {
                assert_eq!(*slot, 0);
                assert!(html.contains("hello"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].author, Author::Bot);
    }
}
