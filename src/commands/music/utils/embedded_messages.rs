use poise::CreateReply;
use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter, Mentionable, Timestamp};

use super::{
    format_track_length,
    music_manager::{MusicError, MusicOutcome},
    queue_view::{QueueLine, QueueView},
};
use crate::commands::music::audio_sources::{PlaybackState, QueuedTrack, TrackInfo};

const SUCCESS: u32 = 0x00ff00;
const FAILURE: u32 = 0xff0000;
const QUEUE: u32 = 0x181818;

fn error_embed(description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("❌ Error")
            .description(description)
            .color(FAILURE),
    )
}

fn success_embed(title: &str, description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(description)
            .color(SUCCESS),
    )
}

fn link(track: &TrackInfo) -> String {
    format!("[{}]({})", track.title, track.uri)
}

/// Render the reply for a successful music command.
pub fn outcome(outcome: &MusicOutcome, requested_by: &str) -> CreateReply {
    match outcome {
        MusicOutcome::Joined(channel_id) => {
            success_embed("🔊 Joined", format!("Joined {}", channel_id.mention()))
        }
        MusicOutcome::AlreadyJoined(channel_id) => success_embed(
            "🔊 Already here",
            format!("I'm already in {}", channel_id.mention()),
        ),
        MusicOutcome::Left(_) => success_embed("👋 Left Voice Channel", "Disconnected"),
        MusicOutcome::Queued(track) => queued(track),
        MusicOutcome::Stopped => {
            success_embed("⏹️ Stopped", "Playback stopped and queue cleared")
        }
        MusicOutcome::Skipped(skipped) => success_embed(
            "⏭️ Skipped",
            format!("Skipped {}", link(&skipped.track)),
        ),
        MusicOutcome::NothingToSkip => error_embed("Nothing to skip"),
        MusicOutcome::Paused => success_embed("⏸️ Paused", "Playback paused"),
        MusicOutcome::Resumed => success_embed("▶️ Resumed", "Playback resumed"),
        MusicOutcome::Queue(view) => CreateReply::default().embed(music_queue(view, requested_by)),
        MusicOutcome::NowPlaying(current, playback) => {
            CreateReply::default().embed(now_playing(current, *playback))
        }
        MusicOutcome::NothingPlaying => error_embed("Nothing is playing right now"),
    }
}

/// Create an embed for when a song is added to the queue
fn queued(track: &TrackInfo) -> CreateReply {
    let mut embed = CreateEmbed::new()
        .title("🎵 Added to Queue")
        .description(link(track))
        .field(
            "Duration",
            format!("`{}`", format_track_length(track.duration)),
            true,
        )
        .color(SUCCESS);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    CreateReply::default().embed(embed)
}

fn now_playing(current: &QueuedTrack, playback: PlaybackState) -> CreateEmbed {
    let title = match playback {
        PlaybackState::Paused => "⏸️ Now Playing (paused)",
        _ => "🎵 Now Playing",
    };

    let mut embed = CreateEmbed::new()
        .title(title)
        .description(link(&current.track))
        .field(
            "Duration",
            format!("`{}`", format_track_length(current.track.duration)),
            true,
        )
        .field("Requested by", current.requester.mention().to_string(), true)
        .color(SUCCESS);

    if let Some(thumbnail) = &current.track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
}

fn queue_field(index: Option<usize>, line: &QueueLine) -> (String, String, bool) {
    let name = match index {
        Some(index) => format!("[{}] {}", index, line.title),
        None => format!("▶ {}", line.title),
    };
    let value = format!("`{}` • Requested by {}", line.duration, line.requester);
    (name, value, false)
}

/// Create an embed for the music queue
pub fn music_queue(view: &QueueView, requested_by: &str) -> CreateEmbed {
    let mut fields = Vec::with_capacity(view.upcoming.len() + 1);
    if let Some(current) = &view.now_playing {
        fields.push(queue_field(None, current));
    }
    fields.extend(
        view.upcoming
            .iter()
            .enumerate()
            .map(|(index, line)| queue_field(Some(index + 1), line)),
    );

    let mut embed = CreateEmbed::new()
        .title(format!("🎶 Current queue | {} tracks", view.total_upcoming()))
        .fields(fields)
        .color(QUEUE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(format!("Requested by {}", requested_by)));

    if view.paused {
        embed = embed.description("⏸️ Playback is paused");
    }
    if view.hidden > 0 {
        embed = embed.field("\u{200b}", format!("…and {} more", view.hidden), false);
    }

    embed
}

/// Render the reply for a failed music command.
///
/// With `private`, the caller's own mistakes are shown only to them. Discord
/// ignores the flag once a public response exists, so deferred commands pass false.
pub fn error(err: &MusicError, private: bool) -> CreateReply {
    let reply = if err.is_user_facing() {
        error_embed(err.to_string())
    } else {
        error_embed("Something went wrong, please try again later")
    };

    if private && err.is_caller_mistake() {
        reply.ephemeral(true)
    } else {
        reply
    }
}
