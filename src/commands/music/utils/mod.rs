use std::time::Duration;

// Export music utilities
pub mod auto_pause;
pub mod embedded_messages;
pub mod event_handlers;
pub mod music_manager;
pub mod queue_view;
pub mod session_tracker;

/// Format a duration as `mm:ss`, with minutes running past 59 for long tracks.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Like `format_duration`, for tracks whose length may be unknown (live streams).
pub fn format_track_length(duration: Option<Duration>) -> String {
    duration
        .map(format_duration)
        .unwrap_or_else(|| "--:--".to_string())
}
