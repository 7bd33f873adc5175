/// Errors produced by the Discord adapter and its HTTP-backed commands.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("no bot token configured")]
    NoToken,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("picture API returned no images")]
    NoImage,
}
