//! Text-command dispatcher: prefix check, tokenize, lookup, admission, submit.
//!
//! `handle` only ever awaits the short replies it sends itself (unknown
//! command, rate-limit notice). Command bodies run on the worker pool.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use dbhq_core::config::CommandsConfig;
use dbhq_core::{ChatBackend, IdentityScopeKey, TextEvent};

use crate::admission::{Admission, AdmissionController};
use crate::command::{CommandContext, CommandTable};
use crate::pool::WorkerPool;

pub const EXECUTION_FAILED_REPLY: &str = "An error occurred while executing the command.";

pub fn unknown_command_reply(name: &str) -> String {
    format!("Command not found: {}", name)
}

pub fn rate_limited_reply(cooldown: Duration) -> String {
    format!(
        "You're being rate-limited. Please wait {} seconds before trying again.",
        cooldown.as_millis() / 1000
    )
}

/// A prefixed message split into a lower-cased name and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// `None` unless `content` starts with `prefix`. A bare prefix yields an empty name.
pub fn parse(prefix: &str, content: &str) -> Option<ParsedCommand> {
    let rest = content.strip_prefix(prefix)?;
    let mut tokens = rest.split_whitespace();
    let name = tokens.next().unwrap_or("").to_lowercase();
    let args = tokens.map(str::to_string).collect();
    Some(ParsedCommand { name, args })
}

/// What `handle` did with an event.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Not a command (no prefix, or a bot author).
    Ignored,
    UnknownCommand { name: String },
    RateLimited { notified: bool },
    /// Queued on the worker pool; the handle resolves once the handler finished.
    Submitted { command: String, job: JoinHandle<()> },
}

pub struct Dispatcher {
    prefix: String,
    commands: CommandTable,
    admission: AdmissionController,
    pool: WorkerPool,
    backend: Arc<dyn ChatBackend>,
}

impl Dispatcher {
    pub fn new(
        config: &CommandsConfig,
        commands: CommandTable,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        let pool = WorkerPool::new(config.worker_count());
        info!(
            prefix = %config.prefix,
            commands = commands.len(),
            workers = pool.size(),
            cooldown_ms = config.base_cooldown_ms,
            "command dispatcher ready"
        );
        Self {
            prefix: config.prefix.clone(),
            commands,
            admission: AdmissionController::new(config.base_cooldown()),
            pool,
            backend,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub async fn handle(&self, event: TextEvent) -> DispatchOutcome {
        self.handle_at(event, Instant::now()).await
    }

    /// `handle` with an explicit clock reading for the admission check.
    pub async fn handle_at(&self, event: TextEvent, now: Instant) -> DispatchOutcome {
        if event.author_is_bot {
            return DispatchOutcome::Ignored;
        }
        let Some(parsed) = parse(&self.prefix, &event.content) else {
            return DispatchOutcome::Ignored;
        };

        let Some(command) = self.commands.get(&parsed.name).cloned() else {
            debug!(command = %parsed.name, author = %event.author_id, "command not found");
            self.send(&event, &unknown_command_reply(&parsed.name)).await;
            return DispatchOutcome::UnknownCommand { name: parsed.name };
        };

        let key = IdentityScopeKey::new(event.author_id.clone(), event.scope.clone());
        match self.admission.check_and_record(&key, now) {
            Admission::Admitted => {}
            Admission::RateLimited {
                cooldown,
                already_notified,
                remaining,
            } => {
                debug!(
                    user = %key.user(),
                    scope = %key.scope(),
                    command = %parsed.name,
                    remaining_ms = remaining.as_millis() as u64,
                    already_notified,
                    "rate-limited"
                );
                if !already_notified {
                    self.send(&event, &rate_limited_reply(cooldown)).await;
                }
                return DispatchOutcome::RateLimited {
                    notified: !already_notified,
                };
            }
        }

        let name = command.name().to_string();
        let backend = Arc::clone(&self.backend);
        let channel = event.channel_id;
        let ctx = CommandContext {
            event,
            args: parsed.args,
            backend: Arc::clone(&self.backend),
        };

        let job_name = name.clone();
        let job = self.pool.submit(async move {
            let run = AssertUnwindSafe(async move { command.invoke(ctx).await }).catch_unwind();
            let failure = match run.await {
                Ok(Ok(())) => {
                    debug!(command = %job_name, "executed command");
                    return;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("handler panicked: {}", panic_message(&*panic)),
            };
            error!(command = %job_name, error = %failure, "error executing command");
            if let Err(e) = backend.send_text(channel, EXECUTION_FAILED_REPLY).await {
                warn!(command = %job_name, error = %e, "failed to send error reply");
            }
        });

        DispatchOutcome::Submitted { command: name, job }
    }

    async fn send(&self, event: &TextEvent, text: &str) {
        if let Err(e) = self.backend.send_text(event.channel_id, text).await {
            warn!(channel = %event.channel_id, error = %e, "failed to send reply");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
