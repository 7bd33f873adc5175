use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_COOLDOWN_MS: u64 = 5_000;
pub const DEFAULT_HALL_OF_FAME_DIR: &str = "./app/dbhq-images/hall-of-fame";
pub const DEFAULT_CURATION_EMOJI: &str = "599772724029685760";
pub const DEFAULT_REACTION_THRESHOLD: u64 = 15;
pub const DEFAULT_CAT_API_URL: &str = "https://api.thecatapi.com/v1/images/search";
pub const DEFAULT_CAT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CONFIG_PATH: &str = "./dbhq.toml";

/// Attachment extensions eligible for the hall of fame.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "mp4", "webp", "mov"];

/// Top-level config (dbhq.toml + DBHQ_* env overrides + the bot's legacy env vars).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbhqConfig {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub hall_of_fame: HallOfFameConfig,
    #[serde(default)]
    pub cat: CatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
}

/// Command dispatch and admission control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Minimum gap between two admitted commands for one user in one scope.
    #[serde(default = "default_cooldown_ms")]
    pub base_cooldown_ms: u64,
    /// Worker pool size. Defaults to the number of available CPUs.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            base_cooldown_ms: DEFAULT_COOLDOWN_MS,
            workers: None,
        }
    }
}

impl CommandsConfig {
    pub fn base_cooldown(&self) -> Duration {
        Duration::from_millis(self.base_cooldown_ms)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.filter(|n| *n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallOfFameConfig {
    /// Base archive directory; one sub-directory per guild.
    #[serde(default = "default_hall_of_fame_dir")]
    pub dir: PathBuf,
    /// Custom emoji ID (all digits) or a unicode emoji.
    #[serde(default = "default_emoji")]
    pub emoji: String,
    #[serde(default = "default_threshold")]
    pub threshold: u64,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for HallOfFameConfig {
    fn default() -> Self {
        Self {
            dir: default_hall_of_fame_dir(),
            emoji: default_emoji(),
            threshold: DEFAULT_REACTION_THRESHOLD,
            extensions: default_extensions(),
        }
    }
}

/// Random cat picture command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatConfig {
    #[serde(default = "default_cat_api_url")]
    pub api_url: String,
    /// Sent as `x-api-key` when present.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_cat_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CatConfig {
    fn default() -> Self {
        Self {
            api_url: default_cat_api_url(),
            api_key: None,
            timeout_ms: DEFAULT_CAT_TIMEOUT_MS,
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}
fn default_hall_of_fame_dir() -> PathBuf {
    PathBuf::from(DEFAULT_HALL_OF_FAME_DIR)
}
fn default_emoji() -> String {
    DEFAULT_CURATION_EMOJI.to_string()
}
fn default_threshold() -> u64 {
    DEFAULT_REACTION_THRESHOLD
}
fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}
fn default_cat_api_url() -> String {
    DEFAULT_CAT_API_URL.to_string()
}
fn default_cat_timeout_ms() -> u64 {
    DEFAULT_CAT_TIMEOUT_MS
}

impl DbhqConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Precedence, lowest first:
    ///   1. field defaults
    ///   2. the TOML file (explicit path, else `./dbhq.toml`; a missing file is skipped)
    ///   3. `DBHQ_*` env vars, nested with `__` (`DBHQ_HALL_OF_FAME__THRESHOLD=20`)
    ///   4. `DISCORD_TOKEN`, `HALL_OF_FAME_DIR`, `CAT_API`
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);

        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("DBHQ_").split("__"))
            .merge(Env::raw().only(&["DISCORD_TOKEN"]).map(|_| "discord.bot_token".into()))
            .merge(Env::raw().only(&["HALL_OF_FAME_DIR"]).map(|_| "hall_of_fame.dir".into()))
            .merge(Env::raw().only(&["CAT_API"]).map(|_| "cat.api_key".into()));

        Self::from_figment(figment)
    }

    /// Extract and validate a config from an already-assembled figment.
    pub fn from_figment(figment: Figment) -> crate::error::Result<Self> {
        let config: DbhqConfig = figment
            .extract()
            .map_err(|e| crate::error::DbhqError::Config(e.to_string()))?;

        if config.discord.bot_token.trim().is_empty() {
            return Err(crate::error::DbhqError::Config(
                "discord.bot_token is empty".to_string(),
            ));
        }
        if config.commands.prefix.is_empty() {
            return Err(crate::error::DbhqError::Config(
                "commands.prefix must not be empty".to_string(),
            ));
        }

        Ok(config)
    }
}
