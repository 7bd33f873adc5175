// End-to-end dispatcher behaviour against a recording backend.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use dbhq_core::config::CommandsConfig;
use dbhq_core::{
    AttachmentReader, AttachmentRef, BackendError, ChannelId, ChatBackend, MessageId,
    ResolvedMessage, ScopeId, TextEvent, UserId,
};
use dbhq_dispatch::dispatcher::EXECUTION_FAILED_REPLY;
use dbhq_dispatch::{help, Command, CommandError, CommandTable, DispatchOutcome, Dispatcher};

#[derive(Default)]
struct RecordingBackend {
    sent: Mutex<Vec<(ChannelId, String)>>,
}

impl RecordingBackend {
    fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl ChatBackend for RecordingBackend {
    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<(), BackendError> {
        self.sent.lock().unwrap().push((channel, text.to_string()));
        Ok(())
    }

    async fn send_file(&self, _channel: ChannelId, _path: &Path) -> Result<(), BackendError> {
        Err(BackendError::SendFailed("files not supported".into()))
    }

    async fn fetch_message(
        &self,
        _channel: ChannelId,
        _message: MessageId,
    ) -> Result<ResolvedMessage, BackendError> {
        Err(BackendError::FetchFailed("not supported".into()))
    }

    async fn open_attachment(
        &self,
        _attachment: &AttachmentRef,
    ) -> Result<AttachmentReader, BackendError> {
        Err(BackendError::DownloadFailed("not supported".into()))
    }
}

fn config() -> CommandsConfig {
    CommandsConfig {
        prefix: "!".to_string(),
        base_cooldown_ms: 5000,
        workers: Some(2),
    }
}

fn event(user: u64, scope: ScopeId, content: &str) -> TextEvent {
    TextEvent {
        message_id: MessageId(100),
        channel_id: ChannelId(200),
        author_id: UserId::from(user),
        author_is_bot: false,
        scope,
        content: content.to_string(),
    }
}

fn guild() -> ScopeId {
    ScopeId::guild(300)
}

fn counting(name: &str, counter: &Arc<AtomicUsize>) -> Command {
    let counter = Arc::clone(counter);
    Command::new(name, "counts invocations", move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

async fn finish(outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Submitted { job, .. } => job.await.unwrap(),
        other => panic!("expected a submitted job, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_command_replies_and_consumes_no_admission() {
    let backend = Arc::new(RecordingBackend::default());
    let dispatcher = Dispatcher::new(&config(), CommandTable::new(), backend.clone());

    for _ in 0..3 {
        let outcome = dispatcher.handle(event(1, guild(), "!cat")).await;
        assert!(matches!(outcome, DispatchOutcome::UnknownCommand { ref name } if name == "cat"));
    }

    assert_eq!(backend.texts(), vec!["Command not found: cat"; 3]);
    assert_eq!(dispatcher.admission().tracked_keys(), 0);
}

#[tokio::test]
async fn unknown_command_name_is_lowercased() {
    let backend = Arc::new(RecordingBackend::default());
    let dispatcher = Dispatcher::new(&config(), CommandTable::new(), backend.clone());

    dispatcher.handle(event(1, guild(), "!DoG  extra args")).await;
    dispatcher.handle(event(1, guild(), "!")).await;

    assert_eq!(
        backend.texts(),
        vec!["Command not found: dog", "Command not found: "]
    );
}

#[tokio::test]
async fn unprefixed_and_bot_messages_are_ignored() {
    let backend = Arc::new(RecordingBackend::default());
    let counter = Arc::new(AtomicUsize::new(0));
    let mut table = CommandTable::new();
    table.register(counting("x", &counter)).unwrap();
    let dispatcher = Dispatcher::new(&config(), table, backend.clone());

    assert!(matches!(
        dispatcher.handle(event(1, guild(), "x")).await,
        DispatchOutcome::Ignored
    ));
    let mut from_bot = event(1, guild(), "!x");
    from_bot.author_is_bot = true;
    assert!(matches!(
        dispatcher.handle(from_bot).await,
        DispatchOutcome::Ignored
    ));

    assert!(backend.texts().is_empty());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.admission().tracked_keys(), 0);
}

#[tokio::test]
async fn rate_limit_scenario() {
    let backend = Arc::new(RecordingBackend::default());
    let counter = Arc::new(AtomicUsize::new(0));
    let mut table = CommandTable::new();
    table.register(counting("x", &counter)).unwrap();
    let dispatcher = Dispatcher::new(&config(), table, backend.clone());
    let t0 = Instant::now();
    let at = |ms: u64| t0 + Duration::from_millis(ms);

    finish(dispatcher.handle_at(event(1, guild(), "!x"), at(0)).await).await;

    let second = dispatcher.handle_at(event(1, guild(), "!x"), at(2000)).await;
    assert!(matches!(second, DispatchOutcome::RateLimited { notified: true }));
    assert_eq!(
        backend.texts(),
        vec!["You're being rate-limited. Please wait 5 seconds before trying again."]
    );

    let third = dispatcher.handle_at(event(1, guild(), "!x"), at(2100)).await;
    assert!(matches!(third, DispatchOutcome::RateLimited { notified: false }));
    assert_eq!(backend.texts().len(), 1);

    finish(dispatcher.handle_at(event(1, guild(), "!X"), at(5000)).await).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(backend.texts().len(), 1);
}

#[tokio::test]
async fn distinct_keys_do_not_limit_each_other() {
    let backend = Arc::new(RecordingBackend::default());
    let counter = Arc::new(AtomicUsize::new(0));
    let mut table = CommandTable::new();
    table.register(counting("x", &counter)).unwrap();
    let dispatcher = Dispatcher::new(&config(), table, backend.clone());
    let now = Instant::now();

    finish(dispatcher.handle_at(event(1, guild(), "!x"), now).await).await;
    finish(dispatcher.handle_at(event(2, guild(), "!x"), now).await).await;
    finish(dispatcher.handle_at(event(1, ScopeId::direct(), "!x"), now).await).await;
    finish(dispatcher.handle_at(event(1, ScopeId::guild(301), "!x"), now).await).await;

    assert_eq!(counter.load(Ordering::SeqCst), 4);
    assert!(backend.texts().is_empty());
}

#[tokio::test]
async fn handler_error_becomes_generic_reply() {
    let backend = Arc::new(RecordingBackend::default());
    let mut table = CommandTable::new();
    table
        .register(Command::new("boom", "always fails", |_ctx| async {
            Err(CommandError::failed("database on fire"))
        }))
        .unwrap();
    let dispatcher = Dispatcher::new(&config(), table, backend.clone());

    finish(dispatcher.handle(event(1, guild(), "!boom")).await).await;

    assert_eq!(backend.texts(), vec![EXECUTION_FAILED_REPLY]);
}

#[tokio::test]
async fn handler_panic_is_contained() {
    let backend = Arc::new(RecordingBackend::default());
    let counter = Arc::new(AtomicUsize::new(0));
    let mut table = CommandTable::new();
    table
        .register(Command::new("panic", "panics", |ctx| async move {
            if ctx.args.is_empty() {
                panic!("handler bug");
            }
            Ok(())
        }))
        .unwrap();
    table.register(counting("ok", &counter)).unwrap();
    let dispatcher = Dispatcher::new(&config(), table, backend.clone());

    finish(dispatcher.handle(event(1, guild(), "!panic")).await).await;
    assert_eq!(backend.texts(), vec![EXECUTION_FAILED_REPLY]);

    finish(dispatcher.handle(event(2, guild(), "!ok")).await).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handler_receives_args_and_replies_in_channel() {
    let backend = Arc::new(RecordingBackend::default());
    let mut table = CommandTable::new();
    table
        .register(Command::new("echo", "echoes", |ctx| async move {
            ctx.reply(&ctx.args.join(",")).await?;
            Ok(())
        }))
        .unwrap();
    let dispatcher = Dispatcher::new(&config(), table, backend.clone());

    finish(dispatcher.handle(event(1, guild(), "!echo  a   b\tc")).await).await;

    let sent = backend.sent.lock().unwrap().clone();
    assert_eq!(sent, vec![(ChannelId(200), "a,b,c".to_string())]);
}

#[tokio::test]
async fn dispatch_does_not_wait_for_slow_handlers() {
    let backend = Arc::new(RecordingBackend::default());
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
    let mut table = CommandTable::new();
    table
        .register(Command::new("slow", "waits to be released", move |_ctx| {
            let release_rx = Arc::clone(&release_rx);
            async move {
                if let Some(rx) = release_rx.lock().await.take() {
                    let _ = rx.await;
                }
                Ok(())
            }
        }))
        .unwrap();
    let dispatcher = Dispatcher::new(&config(), table, backend.clone());

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        dispatcher.handle(event(1, guild(), "!slow")),
    )
    .await
    .expect("dispatch blocked on the handler");

    release_tx.send(()).unwrap();
    finish(outcome).await;
}

#[tokio::test]
async fn help_lists_commands_in_plain_text() {
    let backend = Arc::new(RecordingBackend::default());
    let mut table = CommandTable::new();
    table
        .register(Command::new("hall-of-fame", "Posts a saved image.", |_ctx| async {
            Ok(())
        }))
        .unwrap();
    table
        .register(Command::new("cat", "Responds with a random cat picture!", |_ctx| async {
            Ok(())
        }))
        .unwrap();
    help::register(&mut table, "!").unwrap();
    let dispatcher = Dispatcher::new(&config(), table, backend.clone());

    finish(dispatcher.handle(event(1, guild(), "!HELP")).await).await;

    assert_eq!(
        backend.texts(),
        vec![
            "**Commands**\n\
             - `!cat`: Responds with a random cat picture!\n\
             - `!hall-of-fame`: Posts a saved image.\n\
             - `!help`: Lists the available commands.\n"
        ]
    );
    assert!(!backend.texts()[0].contains('\u{2014}'));
}
