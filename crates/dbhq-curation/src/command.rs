//! `hall-of-fame`: post a random archived attachment for this guild.

use std::sync::Arc;

use tracing::{error, info};

use dbhq_dispatch::{Command, CommandContext, CommandError};

use crate::store::CurationStore;

pub const NAME: &str = "hall-of-fame";
pub const DESCRIPTION: &str =
    "Saves images & videos when reaching a certain threshold of reactions and can post them at random.";
pub const EMPTY_REPLY: &str = "The hall of fame is currently empty.";
pub const RETRIEVE_FAILED_REPLY: &str = "Sorry, I couldn't retrieve a hall of fame image.";

pub fn command(store: Arc<CurationStore>) -> Command {
    Command::new(NAME, DESCRIPTION, move |ctx| {
        let store = Arc::clone(&store);
        async move { post_random(&store, &ctx).await }
    })
}

async fn post_random(store: &CurationStore, ctx: &CommandContext) -> Result<(), CommandError> {
    // Archives are per guild; there is nothing to draw from in a DM.
    if ctx.event.scope.is_direct() {
        return Ok(());
    }

    let entry = match store.sample_random(&ctx.event.scope).await {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            ctx.reply(EMPTY_REPLY).await?;
            return Ok(());
        }
        Err(e) => {
            error!(scope = %ctx.event.scope, error = %e, "failed to list hall of fame");
            ctx.reply(RETRIEVE_FAILED_REPLY).await?;
            return Ok(());
        }
    };

    match ctx.backend.send_file(ctx.event.channel_id, &entry.path).await {
        Ok(()) => {
            info!(scope = %ctx.event.scope, file = %entry.file_name, "posted hall of fame entry");
        }
        Err(e) => {
            error!(
                scope = %ctx.event.scope,
                file = %entry.file_name,
                error = %e,
                "failed to upload hall of fame entry"
            );
            ctx.reply(RETRIEVE_FAILED_REPLY).await?;
        }
    }
    Ok(())
}
