//! Track and queue types exchanged with the audio relay.

use std::time::Duration;

use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use songbird::input::AuxMetadata;

/// A playable track as returned by a relay search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// The title of the track.
    pub title: String,
    /// The URI the relay plays the track from.
    pub uri: String,
    /// The duration of the track, if known (live streams have none).
    pub duration: Option<Duration>,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail: Option<String>,
}

impl TrackInfo {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
            duration: None,
            thumbnail: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Converts yt-dlp metadata into a `TrackInfo`.
    ///
    /// Returns `None` when the metadata carries no source URL, since the relay
    /// would have nothing to play.
    pub fn from_aux(metadata: AuxMetadata) -> Option<Self> {
        let uri = metadata.source_url?;

        Some(Self {
            title: metadata
                .title
                .or(metadata.track)
                .unwrap_or_else(|| "Unknown Title".to_string()),
            uri,
            duration: metadata.duration,
            thumbnail: metadata.thumbnail,
        })
    }
}

/// A track sitting in (or playing from) a guild's relay queue, tagged with who asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTrack {
    pub track: TrackInfo,
    pub requester: UserId,
}

impl QueuedTrack {
    pub fn new(track: TrackInfo, requester: UserId) -> Self {
        Self { track, requester }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Snapshot of a guild's relay-side queue.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuildQueueState {
    pub now_playing: Option<QueuedTrack>,
    pub queue: Vec<QueuedTrack>,
    pub playback: PlaybackState,
}

impl GuildQueueState {
    /// Nothing playing and nothing waiting.
    pub fn is_empty(&self) -> bool {
        self.now_playing.is_none() && self.queue.is_empty()
    }
}

/// Voice connection details confirmed by the relay after a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConnection {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub endpoint: String,
    pub session_id: String,
}
