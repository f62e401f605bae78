//! Startup configuration read from the process environment (after `.env` is loaded).

use std::env;

use poise::serenity_prelude::GuildId;
use thiserror::Error;

/// Playlist used by `/chill` when `CHILL_PLAYLIST_ID` is not set.
pub const DEFAULT_CHILL_PLAYLIST: &str = "PL-F2EKRbzrNS0mQqAW6tt75FTgf4j5gjS";
/// Prefix used by prefix commands when `COMMAND_PREFIX` is not set.
pub const DEFAULT_PREFIX: &str = "!";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration value {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub guild_id: GuildId,
    pub youtube_api_key: String,
    pub chill_playlist_id: String,
    pub prefix: String,
}

impl std::fmt::Debug for Config {
    // Keep secrets out of the logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("guild_id", &self.guild_id)
            .field("chill_playlist_id", &self.chill_playlist_id)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let discord_token = required("DISCORD_TOKEN")?;
        let guild_id = parse_guild_id(&required("GUILD_ID")?)?;
        let youtube_api_key = required("YOUTUBE_API_KEY")?;

        let chill_playlist_id = lookup("CHILL_PLAYLIST_ID")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHILL_PLAYLIST.to_string());
        let prefix = lookup("COMMAND_PREFIX")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        Ok(Self {
            discord_token,
            guild_id,
            youtube_api_key,
            chill_playlist_id,
            prefix,
        })
    }
}

fn parse_guild_id(raw: &str) -> Result<GuildId, ConfigError> {
    let id = raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
        key: "GUILD_ID",
        reason: e.to_string(),
    })?;

    if id == 0 {
        return Err(ConfigError::Invalid {
            key: "GUILD_ID",
            reason: "guild ids are never zero".to_string(),
        });
    }

    Ok(GuildId::new(id))
}
