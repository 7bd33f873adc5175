pub mod command;
pub mod error;
pub mod store;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use error::CurationError;
pub use store::{ArchiveEntry, CurationStore};
pub use watcher::{EngagementWatcher, Evaluation};
