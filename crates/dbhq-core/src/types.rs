use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform user identifier, kept as the backend's string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Where an event happened: a guild ID, or the `DM` sentinel for direct messages.
///
/// Also names the per-guild archive directory, so the string form is stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub String);

impl ScopeId {
    pub const DIRECT: &'static str = "DM";

    pub fn guild(id: u64) -> Self {
        Self(id.to_string())
    }

    pub fn direct() -> Self {
        Self(Self::DIRECT.to_string())
    }

    /// `Some(guild)` maps to the guild scope, `None` to the DM sentinel.
    pub fn from_guild(guild: Option<u64>) -> Self {
        guild.map(Self::guild).unwrap_or_else(Self::direct)
    }

    pub fn is_direct(&self) -> bool {
        self.0 == Self::DIRECT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Admission-control key: one user inside one scope.
///
/// The same user in two guilds (or a guild and DMs) gets two independent cooldowns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityScopeKey {
    user: UserId,
    scope: ScopeId,
}

impl IdentityScopeKey {
    pub fn new(user: UserId, scope: ScopeId) -> Self {
        Self { user, scope }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }
}

impl fmt::Display for IdentityScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.scope)
    }
}

/// Reaction emoji identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmojiKey {
    /// Guild custom emoji, matched by ID only (names can be renamed).
    Custom(u64),
    Unicode(String),
}

impl EmojiKey {
    /// Parse a configured emoji: all digits means a custom emoji ID.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.parse::<u64>() {
            Ok(id) => EmojiKey::Custom(id),
            Err(_) => EmojiKey::Unicode(s.to_string()),
        }
    }
}

impl fmt::Display for EmojiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmojiKey::Custom(id) => write!(f, "custom:{}", id),
            EmojiKey::Unicode(s) => write!(f, "{}", s),
        }
    }
}
