//! Test fixtures for the Ashema Discord bot
//! This module contains sample data used in tests

use std::time::Duration;

use ashema::commands::music::{
    audio_sources::{
        QueuedTrack, RelayConnection, TrackInfo,
        youtube::{PlaylistItem, PlaylistPage},
    },
    utils::music_manager::Invocation,
};
use fake::{Fake, faker::lorem::en::Words};
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use rstest::fixture;

pub const GUILD: GuildId = GuildId::new(111_222_333);
pub const CHANNEL: ChannelId = ChannelId::new(444_555_666);
pub const OTHER_CHANNEL: ChannelId = ChannelId::new(777_888_999);
pub const USER: UserId = UserId::new(123_456_789);
pub const BOT: UserId = UserId::new(987_654_321);
pub const PLAYLIST: &str = "PLtestplaylist";

/// A caller sitting in `CHANNEL`.
#[fixture]
pub fn invocation() -> Invocation {
    Invocation {
        guild_id: GUILD,
        user_id: USER,
        voice_channel: Some(CHANNEL),
    }
}

pub fn connection() -> RelayConnection {
    RelayConnection {
        guild_id: GUILD,
        channel_id: CHANNEL,
        endpoint: "rotterdam1234.discord.media:443".to_string(),
        session_id: "f1c0ffee".to_string(),
    }
}

/// A track with a random title.
pub fn track() -> TrackInfo {
    let words: Vec<String> = Words(2..5).fake();
    let id: u32 = (0..u32::MAX).fake();
    TrackInfo::new(words.join(" "), format!("https://www.youtube.com/watch?v={}", id))
        .with_duration(Duration::from_secs((30..600).fake()))
}

pub fn queued(track: TrackInfo) -> QueuedTrack {
    QueuedTrack::new(track, USER)
}

/// Page `number` (from zero) of a playlist holding `total` videos named `v0`, `v1`, ...
pub fn playlist_page(number: usize, page_size: usize, total: usize) -> PlaylistPage {
    let start = number * page_size;
    let end = (start + page_size).min(total);
    PlaylistPage {
        items: (start..end)
            .map(|index| PlaylistItem {
                video_id: format!("v{}", index),
                title: format!("Chill track {}", index),
            })
            .collect(),
        next_page_token: (end < total).then(|| format!("page{}", number + 1)),
        total_results: total,
    }
}

/// Page number encoded in a token produced by `playlist_page`.
pub fn page_number(token: Option<&str>) -> usize {
    token
        .and_then(|token| token.strip_prefix("page"))
        .and_then(|number| number.parse().ok())
        .unwrap_or(0)
}
