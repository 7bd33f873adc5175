use serenity::async_trait;
use serenity::model::channel::{Message, Reaction};
use serenity::model::gateway::Ready;
use serenity::model::permissions::Permissions;
use serenity::prelude::{Context, EventHandler};
use tracing::{debug, info};

use dbhq_core::{ChannelId, EventSubscriptions, MessageId, ReactionEvent, ScopeId, TextEvent, UserId};

use crate::backend::emoji_key;

/// Permissions requested by the logged invite link.
const INVITE_PERMISSIONS: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::EMBED_LINKS)
    .union(Permissions::ATTACH_FILES)
    .union(Permissions::READ_MESSAGE_HISTORY);

/// Serenity event handler that decodes gateway events and fans them out to
/// the registered subscribers.
pub struct DiscordHandler {
    pub events: EventSubscriptions,
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, "Discord bot connected");
        info!(
            url = %invite_url(ready.application.id.get()),
            "invite the bot with this URL"
        );
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        self.events.publish_text(text_event(&msg)).await;
    }

    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        let Some(event) = reaction_event(&reaction) else {
            debug!(message = %reaction.message_id, "ignoring reaction with unsupported emoji");
            return;
        };
        self.events.publish_reaction(event).await;
    }
}

pub fn text_event(msg: &Message) -> TextEvent {
    TextEvent {
        message_id: MessageId(msg.id.get()),
        channel_id: ChannelId(msg.channel_id.get()),
        author_id: UserId::from(msg.author.id.get()),
        author_is_bot: msg.author.bot,
        scope: ScopeId::from_guild(msg.guild_id.map(|g| g.get())),
        content: msg.content.clone(),
    }
}

/// Scope comes from the gateway event: messages fetched over REST later carry
/// no guild ID.
pub fn reaction_event(reaction: &Reaction) -> Option<ReactionEvent> {
    Some(ReactionEvent {
        message_id: MessageId(reaction.message_id.get()),
        channel_id: ChannelId(reaction.channel_id.get()),
        scope: ScopeId::from_guild(reaction.guild_id.map(|g| g.get())),
        emoji: emoji_key(&reaction.emoji)?,
        user_id: reaction.user_id.map(|u| UserId::from(u.get())),
    })
}

pub fn invite_url(application_id: u64) -> String {
    format!(
        "https://discord.com/oauth2/authorize?client_id={application_id}&scope=bot&permissions={}",
        INVITE_PERMISSIONS.bits()
    )
}
