//! Command table: lower-cased name to handler closure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{info, warn};

use dbhq_core::{BackendError, ChatBackend, TextEvent};

use crate::error::{CommandError, RegistrationError};

pub type CommandFuture = BoxFuture<'static, Result<(), CommandError>>;
type Handler = Arc<dyn Fn(CommandContext) -> CommandFuture + Send + Sync>;

/// Everything a handler gets to work with. Capabilities are passed in here,
/// never reached through globals.
#[derive(Clone)]
pub struct CommandContext {
    pub event: TextEvent,
    /// Whitespace-separated tokens after the command name.
    pub args: Vec<String>,
    pub backend: Arc<dyn ChatBackend>,
}

impl CommandContext {
    /// Reply in the channel the command came from.
    pub async fn reply(&self, text: &str) -> Result<(), BackendError> {
        self.backend.send_text(self.event.channel_id, text).await
    }
}

/// A named handler.
#[derive(Clone)]
pub struct Command {
    name: String,
    description: String,
    handler: Handler,
}

impl Command {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(move |ctx| handler(ctx).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn invoke(&self, ctx: CommandContext) -> CommandFuture {
        (self.handler)(ctx)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Registered commands, keyed by lower-cased name.
#[derive(Debug, Default, Clone)]
pub struct CommandTable {
    commands: HashMap<String, Command>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. The first registration of a name wins.
    pub fn register(&mut self, command: Command) -> Result<(), RegistrationError> {
        let key = command.name().to_lowercase();
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(RegistrationError::InvalidName {
                name: command.name().to_string(),
            });
        }
        if self.commands.contains_key(&key) {
            warn!(command = %key, "attempted to register a duplicate command");
            return Err(RegistrationError::Duplicate { name: key });
        }
        info!(command = %key, "registered command");
        self.commands.insert(key, command);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All commands, sorted by name.
    pub fn sorted(&self) -> Vec<&Command> {
        let mut all: Vec<&Command> = self.commands.values().collect();
        all.sort_by(|a, b| a.name().to_lowercase().cmp(&b.name().to_lowercase()));
        all
    }
}
