//! Decoded inbound events and the subscription list the adapter publishes to.
//!
//! Components never implement a platform listener interface; they register a
//! callback here and the adapter fans each event out to every subscriber.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::types::{ChannelId, EmojiKey, MessageId, ScopeId, UserId};

/// A text message posted in a guild channel or a DM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub scope: ScopeId,
    pub content: String,
}

/// Someone added a reaction to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub scope: ScopeId,
    pub emoji: EmojiKey,
    pub user_id: Option<UserId>,
}

type Listener<E> = Arc<dyn Fn(E) -> BoxFuture<'static, ()> + Send + Sync>;

/// Registered text and reaction listeners.
#[derive(Clone, Default)]
pub struct EventSubscriptions {
    text: Vec<Listener<TextEvent>>,
    reaction: Vec<Listener<ReactionEvent>>,
}

impl EventSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_text<F, Fut>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(TextEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.text.push(Arc::new(move |event| listener(event).boxed()));
        self
    }

    pub fn on_reaction<F, Fut>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(ReactionEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.reaction.push(Arc::new(move |event| listener(event).boxed()));
        self
    }

    /// Deliver a text event to every listener, in registration order.
    pub async fn publish_text(&self, event: TextEvent) {
        for listener in &self.text {
            listener(event.clone()).await;
        }
    }

    /// Deliver a reaction event to every listener, in registration order.
    pub async fn publish_reaction(&self, event: ReactionEvent) {
        for listener in &self.reaction {
            listener(event.clone()).await;
        }
    }

    pub fn text_listener_count(&self) -> usize {
        self.text.len()
    }

    pub fn reaction_listener_count(&self) -> usize {
        self.reaction.len()
    }
}
