pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use backend::{AttachmentReader, AttachmentRef, BackendError, ChatBackend, ReactionCount, ResolvedMessage};
pub use config::DbhqConfig;
pub use error::DbhqError;
pub use events::{EventSubscriptions, ReactionEvent, TextEvent};
pub use types::{ChannelId, EmojiKey, IdentityScopeKey, MessageId, ScopeId, UserId};
