//! `cat`: reply with a random cat picture from thecatapi.com.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error};

use dbhq_core::config::CatConfig;
use dbhq_dispatch::{Command, CommandContext, CommandError};

use crate::error::DiscordError;

pub const NAME: &str = "cat";
pub const DESCRIPTION: &str = "Responds with a random cat picture!";
pub const FETCH_FAILED_REPLY: &str = "Sorry, I encountered an issue fetching a cat image.";

#[derive(Debug, Deserialize)]
struct CatImage {
    url: String,
}

pub struct CatClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl CatClient {
    pub fn new(config: &CatConfig) -> Result<Self, DiscordError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// URL of one random picture.
    pub async fn random_image_url(&self) -> Result<String, DiscordError> {
        let mut req = self.http.get(&self.api_url);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }
        let images: Vec<CatImage> = req.send().await?.error_for_status()?.json().await?;
        images
            .into_iter()
            .next()
            .map(|img| img.url)
            .ok_or(DiscordError::NoImage)
    }
}

pub fn command(client: Arc<CatClient>) -> Command {
    Command::new(NAME, DESCRIPTION, move |ctx| {
        let client = Arc::clone(&client);
        async move { post_cat(&client, &ctx).await }
    })
}

// Discord embeds a bare image URL, so the reply is just the link.
async fn post_cat(client: &CatClient, ctx: &CommandContext) -> Result<(), CommandError> {
    match client.random_image_url().await {
        Ok(url) => {
            debug!(url = %url, "fetched cat picture");
            ctx.reply(&url).await?;
        }
        Err(e) => {
            error!(error = %e, "failed to fetch cat picture");
            ctx.reply(FETCH_FAILED_REPLY).await?;
        }
    }
    Ok(())
}
