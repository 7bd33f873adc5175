use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::types::{ChannelId, EmojiKey, MessageId};

/// Errors surfaced by the messaging backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A message or file could not be delivered.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// A message could not be fetched from the platform.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// An attachment body could not be downloaded.
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte stream of an attachment body.
pub type AttachmentReader = Box<dyn AsyncRead + Send + Unpin>;

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub filename: String,
    pub url: String,
    pub size: u64,
}

impl AttachmentRef {
    /// Lowercased extension after the last `.`, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Number of users who reacted with one emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionCount {
    pub emoji: EmojiKey,
    pub count: u64,
}

/// Snapshot of a message as returned by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMessage {
    pub reactions: Vec<ReactionCount>,
    pub attachments: Vec<AttachmentRef>,
}

impl ResolvedMessage {
    /// Reaction count for `emoji`, 0 when nobody used it.
    pub fn reaction_count(&self, emoji: &EmojiKey) -> u64 {
        self.reactions
            .iter()
            .filter(|r| &r.emoji == emoji)
            .map(|r| r.count)
            .sum()
    }
}

/// Outbound side of the messaging platform, plus the lookups the core needs.
///
/// Implementations must be `Send + Sync`; one instance is shared by the
/// dispatcher, every command worker and the engagement watcher.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Post a plain text message.
    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<(), BackendError>;

    /// Upload a local file as an attachment.
    async fn send_file(&self, channel: ChannelId, path: &Path) -> Result<(), BackendError>;

    /// Fetch the current state of a message (reactions and attachments).
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<ResolvedMessage, BackendError>;

    /// Open an attachment body for streaming.
    async fn open_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<AttachmentReader, BackendError>;
}
