pub mod adapter;
pub mod backend;
pub mod cat;
pub mod error;
pub mod handler;

pub use adapter::DiscordAdapter;
pub use backend::DiscordBackend;
pub use error::DiscordError;
