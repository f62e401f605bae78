use std::sync::Arc;

use dashmap::DashMap;
use ::serenity::async_trait;
use poise::serenity_prelude as serenity;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::commands::music::audio_sources::{
    RelayConnection,
    songbird_relay::LoopEvent,
};

/// Which track event a `TrackEventNotifier` was registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Ended,
    Failed,
}

/// Forwards track end/error events into the guild's playback loop
pub struct TrackEventNotifier {
    pub guild_id: serenity::GuildId,
    pub outcome: TrackOutcome,
    pub events: mpsc::UnboundedSender<LoopEvent>,
}

#[async_trait]
impl songbird::EventHandler for TrackEventNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            for (_, handle) in tracks.iter() {
                let event = match self.outcome {
                    TrackOutcome::Ended => LoopEvent::TrackEnded((*handle).clone()),
                    TrackOutcome::Failed => LoopEvent::TrackFailed((*handle).clone()),
                };

                if self.events.send(event).is_err() {
                    debug!(
                        "Playback loop for guild {} is gone, dropping {:?} event",
                        self.guild_id, self.outcome
                    );
                }
            }
        }
        None
    }
}

/// Reports the relay losing a guild's voice connection
pub struct SessionLossNotifier {
    pub guild_id: serenity::GuildId,
    pub sessions: Arc<DashMap<serenity::GuildId, RelayConnection>>,
    pub notify: mpsc::UnboundedSender<serenity::GuildId>,
}

impl SessionLossNotifier {
    /// Drop the guild's session and hand it to the teardown watcher. False when
    /// the session was already gone, which means the bot left on purpose.
    fn report_loss(&self) -> bool {
        if self.sessions.remove(&self.guild_id).is_none() {
            return false;
        }
        if self.notify.send(self.guild_id).is_err() {
            debug!(
                "Session loss watcher is gone, guild {} will not be torn down",
                self.guild_id
            );
        }
        true
    }
}

#[async_trait]
impl songbird::EventHandler for SessionLossNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::DriverDisconnect(data) = ctx {
            if self.report_loss() {
                warn!(
                    "Relay session lost for guild {}: {:?}",
                    self.guild_id, data.reason
                );
            }
        }
        None
    }
}
