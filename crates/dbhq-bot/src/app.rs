use std::sync::Arc;

use tracing::info;

use dbhq_core::{ChatBackend, DbhqConfig, EventSubscriptions};
use dbhq_curation::{CurationStore, EngagementWatcher};
use dbhq_discord::cat::{self, CatClient};
use dbhq_dispatch::{help, CommandTable, Dispatcher};

/// Fully wired bot: dispatcher and watcher subscribed to events.
pub struct App {
    pub dispatcher: Arc<Dispatcher>,
    pub events: EventSubscriptions,
}

impl App {
    pub async fn build(config: &DbhqConfig, backend: Arc<dyn ChatBackend>) -> anyhow::Result<Self> {
        let store = Arc::new(CurationStore::new(&config.hall_of_fame.dir));
        store.ensure_base_dir().await?;
        info!(dir = %store.base_dir().display(), "hall of fame archive ready");

        let mut commands = CommandTable::new();
        commands.register(cat::command(Arc::new(CatClient::new(&config.cat)?)))?;
        commands.register(dbhq_curation::command::command(Arc::clone(&store)))?;
        // Last, so the listing includes everything above.
        help::register(&mut commands, &config.commands.prefix)?;

        let dispatcher = Arc::new(Dispatcher::new(
            &config.commands,
            commands,
            Arc::clone(&backend),
        ));
        let watcher = Arc::new(EngagementWatcher::new(
            &config.hall_of_fame,
            backend,
            store,
        ));
        info!(
            emoji = %watcher.emoji(),
            threshold = config.hall_of_fame.threshold,
            "watching reactions for the hall of fame"
        );

        let mut events = EventSubscriptions::new();
        let d = Arc::clone(&dispatcher);
        events.on_text(move |event| {
            let d = Arc::clone(&d);
            async move {
                d.handle(event).await;
            }
        });
        events.on_reaction(move |event| {
            let w = Arc::clone(&watcher);
            async move {
                let _ = w.handle(event);
            }
        });

        Ok(Self { dispatcher, events })
    }
}
