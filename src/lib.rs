//! Ashema: a Discord bot that plays YouTube tracks and a curated "chill"
//! playlist into a voice channel.
//!
//! The bot-scoped state lives in [`Data`], which poise hands to every command
//! invocation and every gateway event.

pub mod commands;
pub mod config;
pub mod events;

use commands::music::utils::music_manager::MusicManager;
use config::Config;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data, stored once at framework setup and accessible in all command invocations
pub struct Data {
    pub config: Config,
    pub music: MusicManager,
}

impl Data {
    pub fn new(config: Config, music: MusicManager) -> Self {
        Self { config, music }
    }
}
