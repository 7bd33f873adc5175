use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tracing::{error, info, warn};

use dbhq_core::config::DiscordConfig;
use dbhq_core::EventSubscriptions;

use crate::error::DiscordError;
use crate::handler::DiscordHandler;

/// Gateway events the bot needs: guild and DM text plus reactions in both.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::DIRECT_MESSAGE_REACTIONS
}

/// Discord gateway adapter.
///
/// Wraps a serenity `Client` and drives the event loop until the process
/// exits, rebuilding the client whenever the gateway drops.
pub struct DiscordAdapter {
    config: DiscordConfig,
    events: EventSubscriptions,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, events: EventSubscriptions) -> Result<Self, DiscordError> {
        if config.bot_token.trim().is_empty() {
            return Err(DiscordError::NoToken);
        }
        Ok(Self {
            config: config.clone(),
            events,
        })
    }

    /// Connect and keep reconnecting. Never returns.
    pub async fn run(self) {
        loop {
            let mut client = loop {
                match self.build_client().await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: connect failed ({e}), retrying in 30s");
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            };

            info!("Discord: gateway connecting");
            if let Err(e) = client.start().await {
                warn!("Discord: gateway error ({e}), reconnecting in 5s");
            } else {
                info!("Discord: gateway stopped cleanly, reconnecting in 5s");
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    async fn build_client(&self) -> Result<Client, DiscordError> {
        let handler = DiscordHandler {
            events: self.events.clone(),
        };
        let client = Client::builder(&self.config.bot_token, intents())
            .event_handler(handler)
            .await?;
        Ok(client)
    }
}
