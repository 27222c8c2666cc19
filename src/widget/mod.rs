//! Browser-side message list, driven from the server.
//!
//! A reply is rendered to [`RenderStep`](crate::render::RenderStep)s and played
//! onto a [`MessageList`]. The production list, [`ChannelList`], turns every
//! operation into a [`WidgetEvent`] for the page's SSE stream.

mod events;
mod list;

pub use events::{WidgetEvent, event_name, sse_event};
pub use list::{
    ChannelList, DEFAULT_LOADING_DELAY, MessageList, Pacing, SlotId, insert_message, play,
};
