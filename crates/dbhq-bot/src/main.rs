use std::sync::Arc;

use tracing::{error, info};

use dbhq_core::DbhqConfig;
use dbhq_discord::{DiscordAdapter, DiscordBackend};

mod app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dbhq_bot=info,dbhq_dispatch=info,dbhq_curation=info,dbhq_discord=info".into()
            }),
        )
        .init();

    // config path: DBHQ_CONFIG env > ./dbhq.toml
    let config_path = std::env::var("DBHQ_CONFIG").ok();
    let config = match DbhqConfig::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Discord bot token is not configured or config is invalid: {e}");
            std::process::exit(1);
        }
    };

    let backend = Arc::new(DiscordBackend::from_token(&config.discord.bot_token));
    let app = app::App::build(&config, backend).await?;
    info!(
        prefix = %app.dispatcher.prefix(),
        commands = app.dispatcher.commands().len(),
        "DBHQ bot starting"
    );

    DiscordAdapter::new(&config.discord, app.events)?.run().await;
    Ok(())
}
