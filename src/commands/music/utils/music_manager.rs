use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, UserId};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::auto_pause::{self, PolicyAction, VoiceStateChange};
use super::queue_view::QueueView;
use super::session_tracker::{ConnectionState, JoinPlan, VoiceSessionTracker};
use crate::Context;
use crate::commands::music::audio_sources::youtube::{
    CatalogError, MAX_PAGE_SIZE, PlaylistPage, VideoCatalog, watch_url,
};
use crate::commands::music::audio_sources::{
    AudioRelay, PlaybackState, QueuedTrack, RelayError, TrackInfo,
};

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("This command only works in a server")]
    NotInGuild,

    #[error("Connect to a voice channel first")]
    UserNotInVoiceChannel,

    #[error("I'm already playing in <#{0}>")]
    AlreadyConnectedElsewhere(ChannelId),

    #[error("I'm still joining a voice channel, try again in a moment")]
    JoinInProgress,

    #[error("Use `/join` first")]
    NoSessionPresent,

    #[error("Could not find any video of the search query: {0}")]
    NoSearchResults(String),

    #[error("Tell me what to play")]
    EmptyQuery,

    #[error("Timed out connecting to the voice channel")]
    ConnectionTimeout,

    #[error("The curated playlist is empty")]
    EmptyPlaylist,

    #[error(transparent)]
    Relay(RelayError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl MusicError {
    /// Precondition failures are shown to the user as-is; everything else is a
    /// collaborator failure that gets logged and reported generically.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, MusicError::Relay(_) | MusicError::Catalog(_))
    }

    /// Mistakes only the caller needs to see.
    pub fn is_caller_mistake(&self) -> bool {
        matches!(self, MusicError::UserNotInVoiceChannel | MusicError::EmptyQuery)
    }
}

impl From<RelayError> for MusicError {
    fn from(value: RelayError) -> Self {
        match value {
            RelayError::NoSessionPresent => MusicError::NoSessionPresent,
            RelayError::ConnectionTimeout => MusicError::ConnectionTimeout,
            other => MusicError::Relay(other),
        }
    }
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Who ran a command, where, and which voice channel they were sitting in at the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub voice_channel: Option<ChannelId>,
}

impl Invocation {
    pub fn from_context(ctx: &Context<'_>) -> MusicResult<Self> {
        let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
        let user_id = ctx.author().id;
        let voice_channel =
            MusicManager::get_user_voice_channel(ctx.serenity_context(), guild_id, user_id);

        Ok(Self {
            guild_id,
            user_id,
            voice_channel,
        })
    }
}

/// What a successful command did, for the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicOutcome {
    Joined(ChannelId),
    AlreadyJoined(ChannelId),
    Left(Option<ChannelId>),
    Queued(TrackInfo),
    Stopped,
    Skipped(QueuedTrack),
    NothingToSkip,
    Paused,
    Resumed,
    Queue(QueueView),
    NowPlaying(QueuedTrack, PlaybackState),
    NothingPlaying,
}

/// Command routing over the audio relay, the video catalog and the voice session tracker.
#[derive(Clone)]
pub struct MusicManager {
    relay: Arc<dyn AudioRelay>,
    catalog: Arc<dyn VideoCatalog>,
    sessions: Arc<VoiceSessionTracker>,
    chill_playlist: String,
}

impl MusicManager {
    pub fn new(
        relay: Arc<dyn AudioRelay>,
        catalog: Arc<dyn VideoCatalog>,
        sessions: Arc<VoiceSessionTracker>,
        chill_playlist: impl Into<String>,
    ) -> Self {
        Self {
            relay,
            catalog,
            sessions,
            chill_playlist: chill_playlist.into(),
        }
    }

    pub fn sessions(&self) -> &VoiceSessionTracker {
        &self.sessions
    }

    /// Get the voice channel ID that the user is currently in
    pub fn get_user_voice_channel(
        ctx: &serenity::Context,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Option<ChannelId> {
        let guild = ctx.cache.guild(guild_id)?;
        guild.voice_states.get(&user_id)?.channel_id
    }

    /// Join the caller's voice channel and open a relay session there.
    pub async fn join(&self, invocation: &Invocation) -> MusicResult<MusicOutcome> {
        let guild_id = invocation.guild_id;
        let channel_id = invocation
            .voice_channel
            .ok_or(MusicError::UserNotInVoiceChannel)?;

        if let JoinPlan::AlreadyConnected(channel_id) =
            self.sessions.begin_connecting(guild_id, channel_id)?
        {
            return Ok(MusicOutcome::AlreadyJoined(channel_id));
        }

        if let Err(err) = self.connect(guild_id, channel_id).await {
            self.sessions.abort_connecting(guild_id);
            return Err(err);
        }

        self.sessions.mark_connected(guild_id, channel_id);
        info!("Joined channel {} in guild {}", channel_id, guild_id);
        Ok(MusicOutcome::Joined(channel_id))
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        let connection = self.relay.join(guild_id, channel_id).await?;

        if let Err(err) = self.relay.create_session(connection).await {
            // Don't strand the bot in a channel it can't play into.
            if let Err(leave_err) = self.relay.leave(guild_id).await {
                warn!(
                    "Failed to leave guild {} after session setup failed: {}",
                    guild_id, leave_err
                );
            }
            return Err(err.into());
        }

        Ok(())
    }

    /// Leave the voice channel, releasing every piece of relay state held for the guild.
    pub async fn leave(&self, guild_id: GuildId) -> MusicResult<MusicOutcome> {
        let ended = self.sessions.end(guild_id);
        self.teardown(guild_id).await?;

        info!("Left voice in guild {}", guild_id);
        Ok(MusicOutcome::Left(ended.and_then(|session| session.channel_id())))
    }

    /// None of these cascade on the relay side, so all four always run.
    async fn teardown(&self, guild_id: GuildId) -> MusicResult<()> {
        let steps = [
            ("destroy session", self.relay.destroy_session(guild_id).await),
            ("leave channel", self.relay.leave(guild_id).await),
            ("remove guild node", self.relay.remove_guild_state(guild_id).await),
            ("remove from loops", self.relay.remove_guild_from_loops(guild_id).await),
        ];

        let mut first_error = None;
        for (step, result) in steps {
            if let Err(err) = result {
                warn!("Teardown step '{}' failed for guild {}: {}", step, guild_id, err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Join when the guild has no session. A join still in flight is reported
    /// rather than raced, since its relay session may not exist yet.
    async fn ensure_joined(&self, invocation: &Invocation) -> MusicResult<()> {
        match self.sessions.state(invocation.guild_id) {
            None => {
                self.join(invocation).await?;
            }
            Some(ConnectionState::Connecting { .. }) => return Err(MusicError::JoinInProgress),
            Some(ConnectionState::Connected { .. }) => {}
        }
        Ok(())
    }

    /// Search for `query` and queue the best match, joining first if needed.
    pub async fn play(&self, invocation: &Invocation, query: &str) -> MusicResult<MusicOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MusicError::EmptyQuery);
        }

        self.ensure_joined(invocation).await?;

        let track = self
            .relay
            .search_tracks(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MusicError::NoSearchResults(query.to_string()))?;

        self.relay
            .play(invocation.guild_id, track.clone(), invocation.user_id, true)
            .await?;

        info!(
            "Queued '{}' in guild {} for {}",
            track.title, invocation.guild_id, invocation.user_id
        );
        Ok(MusicOutcome::Queued(track))
    }

    /// Halt playback and empty the queue.
    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<MusicOutcome> {
        self.relay.stop(guild_id).await?;
        self.relay.clear_queue(guild_id).await?;
        Ok(MusicOutcome::Stopped)
    }

    pub async fn skip(&self, guild_id: GuildId) -> MusicResult<MusicOutcome> {
        let Some(skipped) = self.relay.skip(guild_id).await? else {
            return Ok(MusicOutcome::NothingToSkip);
        };

        // The relay keeps the player running on an empty queue.
        if self.relay.queue_state(guild_id).await?.is_empty() {
            debug!("Queue empty after skip in guild {}, stopping", guild_id);
            self.relay.stop(guild_id).await?;
        }

        Ok(MusicOutcome::Skipped(skipped))
    }

    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<MusicOutcome> {
        self.relay.pause(guild_id).await?;
        Ok(MusicOutcome::Paused)
    }

    pub async fn resume(&self, guild_id: GuildId) -> MusicResult<MusicOutcome> {
        self.relay.resume(guild_id).await?;
        Ok(MusicOutcome::Resumed)
    }

    pub async fn queue(&self, guild_id: GuildId) -> MusicResult<MusicOutcome> {
        let state = self.relay.queue_state(guild_id).await?;

        Ok(QueueView::from_state(&state)
            .map(MusicOutcome::Queue)
            .unwrap_or(MusicOutcome::NothingPlaying))
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> MusicResult<MusicOutcome> {
        let state = self.relay.queue_state(guild_id).await?;

        Ok(match state.now_playing {
            Some(current) => MusicOutcome::NowPlaying(current, state.playback),
            None => MusicOutcome::NothingPlaying,
        })
    }

    /// Queue a random track from the curated playlist.
    pub async fn chill(&self, invocation: &Invocation) -> MusicResult<MusicOutcome> {
        // Catalog paging costs API quota, so fail on the voice precondition first.
        self.ensure_joined(invocation).await?;

        let video_id = self.random_curated_video().await?;
        info!("Picked curated video {} for guild {}", video_id, invocation.guild_id);

        self.play(invocation, &watch_url(&video_id)).await
    }

    async fn random_curated_video(&self) -> MusicResult<String> {
        let first_page = self.playlist_page(None).await?;
        if first_page.total_results == 0 {
            return Err(MusicError::EmptyPlaylist);
        }

        let index = rand::random_range(0..first_page.total_results);
        self.curated_video_at(first_page, index).await
    }

    /// Walk the playlist's pages from `first_page` to the one holding `index`.
    pub async fn curated_video_at(
        &self,
        first_page: PlaylistPage,
        index: usize,
    ) -> MusicResult<String> {
        let mut page = first_page;
        let mut offset = index;

        while offset >= page.items.len() {
            offset -= page.items.len();

            let token = page
                .next_page_token
                .take()
                .ok_or(CatalogError::PlaylistExhausted { index })?;
            page = self.playlist_page(Some(token)).await?;

            if page.items.is_empty() {
                return Err(CatalogError::PlaylistExhausted { index }.into());
            }
        }

        Ok(page.items.swap_remove(offset).video_id)
    }

    async fn playlist_page(&self, page_token: Option<String>) -> MusicResult<PlaylistPage> {
        Ok(self
            .catalog
            .list_playlist_items(&self.chill_playlist, page_token, MAX_PAGE_SIZE)
            .await?)
    }

    /// React to a voice state update for someone other than the bot.
    pub async fn handle_voice_state_change(
        &self,
        bot_id: UserId,
        bot_channel: Option<ChannelId>,
        change: &VoiceStateChange,
        listeners: usize,
    ) -> MusicResult<Option<PolicyAction>> {
        let Some(action) = auto_pause::evaluate(bot_id, bot_channel, change, listeners) else {
            return Ok(None);
        };

        match action {
            PolicyAction::Pause => self.relay.pause(change.guild_id).await?,
            PolicyAction::Resume => self.relay.resume(change.guild_id).await?,
        }

        info!(
            "Auto {:?} in guild {}: sole listener {} toggled deafen",
            action, change.guild_id, change.user_id
        );
        Ok(Some(action))
    }

    /// React to the gateway reporting where the bot itself is.
    pub async fn handle_bot_voice_state(
        &self,
        guild_id: GuildId,
        observed: Option<ChannelId>,
    ) -> MusicResult<()> {
        if let Some(stale) = self.sessions.reconcile(guild_id, observed) {
            warn!(
                "Bot left {:?} in guild {} without a leave command (now in {:?}), tearing down",
                stale.channel_id(),
                guild_id,
                observed
            );
            self.teardown(guild_id).await?;
        }
        Ok(())
    }

    /// React to the relay dropping a guild's voice connection.
    pub async fn handle_session_lost(&self, guild_id: GuildId) -> MusicResult<()> {
        if self.sessions.end(guild_id).is_some() {
            warn!("Relay lost the session for guild {}, tearing down", guild_id);
            self.teardown(guild_id).await?;
        }
        Ok(())
    }
}
