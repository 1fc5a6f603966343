// src/models.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::window::ActiveWindow;

/// Presence shown while a session is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceStatus {
    Online,
    Idle,
    #[default]
    Dnd,
    Invisible,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Idle => "idle",
            PresenceStatus::Dnd => "dnd",
            PresenceStatus::Invisible => "invisible",
        }
    }
}

impl FromStr for PresenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(PresenceStatus::Online),
            "idle" => Ok(PresenceStatus::Idle),
            "dnd" => Ok(PresenceStatus::Dnd),
            "invisible" => Ok(PresenceStatus::Invisible),
            other => Err(format!("unknown presence status '{other}'")),
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured account. Immutable after validation; each supervisor task
/// owns its own clone, so nothing here is shared mutably across accounts.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// 1-based position in the configuration, used only for log prefixes.
    pub ordinal: usize,
    pub token: String,
    pub status: PresenceStatus,
    /// Empty string means "no custom status".
    pub custom_status: String,
    /// `None` means the account is always active.
    pub window: Option<ActiveWindow>,
}

impl AccountConfig {
    pub fn active_at_hour(&self, hour: u32) -> bool {
        match self.window {
            Some(w) => w.contains_hour(hour),
            None => true,
        }
    }

    pub fn describe_window(&self) -> String {
        match self.window {
            Some(w) => w.describe(),
            None => "always".to_string(),
        }
    }
}

/// Display identity for logs. Lookup failures are absorbed into `unknown()`;
/// this never gates whether an account runs.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordProfile {
    #[serde(default = "DiscordProfile::unknown_field")]
    pub username: String,
    #[serde(default = "DiscordProfile::unknown_discriminator")]
    pub discriminator: String,
    #[serde(default = "DiscordProfile::unknown_field", rename = "id")]
    pub user_id: String,
}

impl DiscordProfile {
    pub fn unknown() -> Self {
        Self {
            username: Self::unknown_field(),
            discriminator: Self::unknown_discriminator(),
            user_id: Self::unknown_field(),
        }
    }

    fn unknown_field() -> String {
        "Unknown".to_string()
    }

    fn unknown_discriminator() -> String {
        "0000".to_string()
    }
}

impl fmt::Display for DiscordProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} ({})", self.username, self.discriminator, self.user_id)
    }
}
