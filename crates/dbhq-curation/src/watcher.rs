//! Reaction-threshold watcher that promotes attachments into the archive.
//!
//! Stateless across events: every matching reaction re-fetches the message
//! and re-evaluates it. Nothing remembers which messages already qualified,
//! so each further reaction on a qualifying message archives its attachments
//! again.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dbhq_core::config::HallOfFameConfig;
use dbhq_core::{AttachmentRef, BackendError, ChatBackend, EmojiKey, ReactionEvent};

use crate::store::{ArchiveEntry, CurationStore};

/// Result of evaluating one reaction event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Reaction used some other emoji.
    OtherEmoji,
    /// Reactions in DMs are never curated.
    DirectMessage,
    BelowThreshold { count: u64 },
    Archived {
        count: u64,
        saved: Vec<ArchiveEntry>,
        failed: usize,
    },
}

pub struct EngagementWatcher {
    backend: Arc<dyn ChatBackend>,
    store: Arc<CurationStore>,
    emoji: EmojiKey,
    threshold: u64,
    extensions: HashSet<String>,
}

impl EngagementWatcher {
    pub fn new(
        config: &HallOfFameConfig,
        backend: Arc<dyn ChatBackend>,
        store: Arc<CurationStore>,
    ) -> Self {
        Self {
            backend,
            store,
            emoji: EmojiKey::parse(&config.emoji),
            threshold: config.threshold,
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn emoji(&self) -> &EmojiKey {
        &self.emoji
    }

    /// Entry point for the adapter. Discards other emoji on the spot and
    /// evaluates matching reactions on a spawned task.
    pub fn handle(self: &Arc<Self>, event: ReactionEvent) -> Option<JoinHandle<()>> {
        if event.emoji != self.emoji {
            return None;
        }
        let watcher = Arc::clone(self);
        Some(tokio::spawn(async move {
            let message_id = event.message_id;
            if let Err(e) = watcher.evaluate(event).await {
                warn!(message = %message_id, error = %e, "failed to resolve reacted message");
            }
        }))
    }

    /// Run the full check for one reaction: emoji, scope, fetch, count, archive.
    pub async fn evaluate(&self, event: ReactionEvent) -> Result<Evaluation, BackendError> {
        if event.emoji != self.emoji {
            return Ok(Evaluation::OtherEmoji);
        }
        if event.scope.is_direct() {
            return Ok(Evaluation::DirectMessage);
        }

        let message = self
            .backend
            .fetch_message(event.channel_id, event.message_id)
            .await?;

        let count = message.reaction_count(&self.emoji);
        if count < self.threshold {
            debug!(
                message = %event.message_id,
                count,
                threshold = self.threshold,
                "below hall of fame threshold"
            );
            return Ok(Evaluation::BelowThreshold { count });
        }

        info!(
            message = %event.message_id,
            scope = %event.scope,
            count,
            "message reached the hall of fame threshold"
        );

        let mut saved = Vec::new();
        let mut failed = 0;
        for attachment in message.attachments.iter().filter(|a| self.is_archivable(a)) {
            match self.archive(&event, attachment).await {
                Ok(entry) => saved.push(entry),
                Err(e) => {
                    failed += 1;
                    warn!(
                        scope = %event.scope,
                        file = %attachment.filename,
                        error = %e,
                        "failed to save attachment"
                    );
                }
            }
        }

        Ok(Evaluation::Archived {
            count,
            saved,
            failed,
        })
    }

    /// Whether the attachment's extension is on the allowlist.
    pub fn is_archivable(&self, attachment: &AttachmentRef) -> bool {
        attachment
            .extension()
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    async fn archive(
        &self,
        event: &ReactionEvent,
        attachment: &AttachmentRef,
    ) -> Result<ArchiveEntry, Box<dyn std::error::Error + Send + Sync>> {
        let mut reader = self.backend.open_attachment(attachment).await?;
        let entry = self
            .store
            .save(&event.scope, &mut reader, &attachment.filename)
            .await?;
        Ok(entry)
    }
}
