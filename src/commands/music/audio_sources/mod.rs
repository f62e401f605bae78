//! This module defines the seams to the services that do the actual audio work.
//! `AudioRelay` fronts the voice/playback relay (implemented on songbird), while
//! `youtube::VideoCatalog` fronts the YouTube Data API used by `/chill`.

/// Songbird-backed implementation of `AudioRelay`.
pub mod songbird_relay;
/// Submodule defining the track and queue types exchanged with the relay.
pub mod track_metadata;
/// YouTube helpers and the playlist catalog client.
pub mod youtube;

use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use serenity::async_trait;
use thiserror::Error;
use url::Url;

pub use track_metadata::{GuildQueueState, PlaybackState, QueuedTrack, RelayConnection, TrackInfo};

/// Errors reported by the audio relay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("No relay session exists for this guild")]
    NoSessionPresent,

    #[error("Timed out waiting for the voice connection")]
    ConnectionTimeout,

    #[error("Failed to join voice channel: {0}")]
    JoinFailed(String),

    #[error("Track search failed: {0}")]
    Search(String),

    #[error("Playback error: {0}")]
    Playback(String),
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Operations the bot needs from the audio relay.
///
/// Teardown is not cascading: leaving a channel does not drop the guild's
/// node or playback loop, and destroying a session does neither. Callers that
/// want a guild fully released must call all four teardown operations.
#[async_trait]
pub trait AudioRelay: Send + Sync {
    /// Connect to a voice channel and wait for the relay to confirm the connection.
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> RelayResult<RelayConnection>;

    /// Open a playback session bound to a confirmed connection.
    async fn create_session(&self, connection: RelayConnection) -> RelayResult<()>;

    async fn destroy_session(&self, guild_id: GuildId) -> RelayResult<()>;

    async fn leave(&self, guild_id: GuildId) -> RelayResult<()>;

    /// Resolve free text or a URL into playable tracks, best match first.
    async fn search_tracks(&self, query: &str) -> RelayResult<Vec<TrackInfo>>;

    /// Play `track` now, or append it to the queue when `enqueue` is set and something is playing.
    async fn play(
        &self,
        guild_id: GuildId,
        track: TrackInfo,
        requester: UserId,
        enqueue: bool,
    ) -> RelayResult<()>;

    async fn stop(&self, guild_id: GuildId) -> RelayResult<()>;

    async fn clear_queue(&self, guild_id: GuildId) -> RelayResult<()>;

    /// Skip the current track, returning it, or `None` when nothing was playing.
    async fn skip(&self, guild_id: GuildId) -> RelayResult<Option<QueuedTrack>>;

    async fn pause(&self, guild_id: GuildId) -> RelayResult<()>;

    async fn resume(&self, guild_id: GuildId) -> RelayResult<()>;

    async fn queue_state(&self, guild_id: GuildId) -> RelayResult<GuildQueueState>;

    /// Drop the guild's node (now-playing and queue).
    async fn remove_guild_state(&self, guild_id: GuildId) -> RelayResult<()>;

    /// Stop the guild's playback loop.
    async fn remove_guild_from_loops(&self, guild_id: GuildId) -> RelayResult<()>;
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Performs a basic check if the input string can be parsed as an http(s) URL.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }
}
