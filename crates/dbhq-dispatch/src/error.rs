use dbhq_core::BackendError;
use thiserror::Error;

/// Failure raised by a command handler.
///
/// Never shown to users verbatim: the dispatcher logs it and replies with a
/// generic message.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Failed(reason.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("command already registered: {name}")]
    Duplicate { name: String },

    #[error("command name must not be empty or contain whitespace: {name:?}")]
    InvalidName { name: String },
}
