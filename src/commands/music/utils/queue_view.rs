//! Display projection of a guild's relay queue. Nothing here is stored; every
//! render starts from a fresh `GuildQueueState`.

use poise::serenity_prelude::Mentionable;

use super::format_track_length;
use crate::commands::music::audio_sources::{GuildQueueState, PlaybackState, QueuedTrack};

/// Upcoming tracks shown by `/queue`.
pub const QUEUE_DISPLAY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLine {
    pub title: String,
    pub uri: String,
    /// `mm:ss`, or `--:--` when the length is unknown.
    pub duration: String,
    /// Mention of the user who asked for the track.
    pub requester: String,
}

impl From<&QueuedTrack> for QueueLine {
    fn from(value: &QueuedTrack) -> Self {
        Self {
            title: value.track.title.clone(),
            uri: value.track.uri.clone(),
            duration: format_track_length(value.track.duration),
            requester: value.requester.mention().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueView {
    pub now_playing: Option<QueueLine>,
    pub paused: bool,
    pub upcoming: Vec<QueueLine>,
    /// Upcoming tracks beyond the display limit.
    pub hidden: usize,
}

impl QueueView {
    /// `None` when nothing is playing and nothing is queued.
    pub fn from_state(state: &GuildQueueState) -> Option<Self> {
        if state.is_empty() {
            return None;
        }

        Some(Self {
            now_playing: state.now_playing.as_ref().map(QueueLine::from),
            paused: state.playback == PlaybackState::Paused,
            upcoming: state
                .queue
                .iter()
                .take(QUEUE_DISPLAY_LIMIT)
                .map(QueueLine::from)
                .collect(),
            hidden: state.queue.len().saturating_sub(QUEUE_DISPLAY_LIMIT),
        })
    }

    pub fn total_upcoming(&self) -> usize {
        self.upcoming.len() + self.hidden
    }
}
