//! `ChatBackend` over the Discord REST API.
//!
//! Holds only `Arc<Http>`, which is not tied to the gateway connection, so one
//! backend stays valid across reconnects.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use serenity::builder::{CreateAttachment, CreateMessage};
use serenity::http::Http;
use serenity::model::channel::{Message, ReactionType};
use tokio_util::io::StreamReader;
use tracing::debug;

use dbhq_core::{
    AttachmentReader, AttachmentRef, BackendError, ChannelId, ChatBackend, EmojiKey, MessageId,
    ReactionCount, ResolvedMessage,
};

pub struct DiscordBackend {
    http: Arc<Http>,
    downloads: reqwest::Client,
}

impl DiscordBackend {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            downloads: reqwest::Client::new(),
        }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Arc::new(Http::new(token)))
    }
}

#[async_trait]
impl ChatBackend for DiscordBackend {
    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<(), BackendError> {
        serenity::model::id::ChannelId::new(channel.0)
            .say(&self.http, text)
            .await
            .map(|_| ())
            .map_err(|e| BackendError::SendFailed(e.to_string()))
    }

    async fn send_file(&self, channel: ChannelId, path: &Path) -> Result<(), BackendError> {
        let file = CreateAttachment::path(path)
            .await
            .map_err(|e| BackendError::SendFailed(format!("{}: {e}", path.display())))?;
        serenity::model::id::ChannelId::new(channel.0)
            .send_message(&self.http, CreateMessage::new().add_file(file))
            .await
            .map(|_| ())
            .map_err(|e| BackendError::SendFailed(e.to_string()))
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<ResolvedMessage, BackendError> {
        let msg = self
            .http
            .get_message(
                serenity::model::id::ChannelId::new(channel.0),
                serenity::model::id::MessageId::new(message.0),
            )
            .await
            .map_err(|e| BackendError::FetchFailed(e.to_string()))?;
        Ok(resolve(&msg))
    }

    async fn open_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<AttachmentReader, BackendError> {
        debug!(file = %attachment.filename, size = attachment.size, "downloading attachment");
        let resp = self
            .downloads
            .get(&attachment.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| BackendError::DownloadFailed(e.to_string()))?;

        let body = resp.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }
}

/// Reduce a fetched message to the reaction counts and attachments we act on.
pub fn resolve(msg: &Message) -> ResolvedMessage {
    ResolvedMessage {
        reactions: msg
            .reactions
            .iter()
            .filter_map(|r| {
                emoji_key(&r.reaction_type).map(|emoji| ReactionCount {
                    emoji,
                    count: r.count,
                })
            })
            .collect(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| AttachmentRef {
                filename: a.filename.clone(),
                url: a.url.clone(),
                size: u64::from(a.size),
            })
            .collect(),
    }
}

/// Custom emoji compare by ID, unicode emoji by text.
pub fn emoji_key(reaction: &ReactionType) -> Option<EmojiKey> {
    match reaction {
        ReactionType::Custom { id, .. } => Some(EmojiKey::Custom(id.get())),
        ReactionType::Unicode(s) => Some(EmojiKey::Unicode(s.clone())),
        _ => None,
    }
}
