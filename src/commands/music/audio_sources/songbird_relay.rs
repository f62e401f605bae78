//! `AudioRelay` implemented on songbird.
//!
//! Songbird owns the voice connection and the audio pipeline, yt-dlp (through
//! `YoutubeDl`) resolves and streams tracks. What lives here is the relay-side
//! bookkeeping per guild: the session record, the node (now-playing + queue)
//! and the playback loop that advances the queue when a track ends.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use reqwest::Client;
use serenity::async_trait;
use songbird::error::JoinError;
use songbird::input::{Compose, YoutubeDl};
use songbird::tracks::TrackHandle;
use songbird::{CoreEvent, Event, Songbird, TrackEvent};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::youtube::is_youtube_url;
use super::{
    AudioRelay, AudioSource, GuildQueueState, PlaybackState, QueuedTrack, RelayConnection,
    RelayError, RelayResult, TrackInfo,
};
use crate::commands::music::utils::event_handlers::{
    SessionLossNotifier, TrackEventNotifier, TrackOutcome,
};

/// How many search hits to ask yt-dlp for.
pub const SEARCH_RESULTS: usize = 5;

/// Messages consumed by a guild's playback loop.
pub enum LoopEvent {
    TrackEnded(TrackHandle),
    TrackFailed(TrackHandle),
}

struct NowPlaying<H> {
    handle: H,
    track: QueuedTrack,
}

/// Where `GuildNode::admit` put a track.
#[derive(Debug, PartialEq, Eq)]
enum Admission {
    /// Queued behind the current track, at this 1-based position.
    Queued(usize),
    /// Nothing to wait for; the caller starts it immediately.
    StartNow(QueuedTrack),
}

/// Relay-side per-guild state. `H` is the handle of the playing track.
struct GuildNode<H = TrackHandle> {
    now_playing: Option<NowPlaying<H>>,
    queue: VecDeque<QueuedTrack>,
    paused: bool,
}

impl<H> Default for GuildNode<H> {
    fn default() -> Self {
        Self {
            now_playing: None,
            queue: VecDeque::new(),
            paused: false,
        }
    }
}

impl<H> GuildNode<H> {
    fn snapshot(&self) -> GuildQueueState {
        let playback = match (&self.now_playing, self.paused) {
            (None, _) => PlaybackState::Idle,
            (Some(_), true) => PlaybackState::Paused,
            (Some(_), false) => PlaybackState::Playing,
        };

        GuildQueueState {
            now_playing: self.now_playing.as_ref().map(|np| np.track.clone()),
            queue: self.queue.iter().cloned().collect(),
            playback,
        }
    }

    fn admit(&mut self, track: QueuedTrack, enqueue: bool) -> Admission {
        if enqueue && self.now_playing.is_some() {
            self.queue.push_back(track);
            Admission::Queued(self.queue.len())
        } else {
            Admission::StartNow(track)
        }
    }

    /// Clear the current track if `is_event_track` says the event belongs to it.
    /// Skipped and replaced tracks still report their end, and those are ignored.
    fn finish_if(&mut self, is_event_track: impl FnOnce(&H) -> bool) -> Option<QueuedTrack> {
        if !self.now_playing.as_ref().is_some_and(|np| is_event_track(&np.handle)) {
            return None;
        }
        self.paused = false;
        self.now_playing.take().map(|np| np.track)
    }

    fn take_current(&mut self) -> Option<NowPlaying<H>> {
        self.paused = false;
        self.now_playing.take()
    }

    fn next_queued(&mut self) -> Option<QueuedTrack> {
        self.queue.pop_front()
    }

    fn set_current(&mut self, handle: H, track: QueuedTrack) {
        self.paused = false;
        self.now_playing = Some(NowPlaying { handle, track });
    }

    fn current_handle(&self) -> Option<&H> {
        self.now_playing.as_ref().map(|np| &np.handle)
    }
}

impl GuildNode<TrackHandle> {
    fn halt(&mut self, guild_id: GuildId) {
        if let Some(current) = self.take_current() {
            if let Err(e) = current.handle.stop() {
                debug!("Track on guild {} was already finished: {}", guild_id, e);
            }
        }
    }
}

struct PlaybackLoop {
    events: mpsc::UnboundedSender<LoopEvent>,
    task: JoinHandle<()>,
}

/// Cheap to clone; all clones share the same per-guild state.
#[derive(Clone)]
pub struct SongbirdRelay {
    manager: Arc<Songbird>,
    http: Client,
    sessions: Arc<DashMap<GuildId, RelayConnection>>,
    nodes: Arc<DashMap<GuildId, Arc<Mutex<GuildNode>>>>,
    loops: Arc<DashMap<GuildId, PlaybackLoop>>,
    session_loss: mpsc::UnboundedSender<GuildId>,
}

impl SongbirdRelay {
    /// Creates the relay along with the receiving end of its session-loss notices.
    pub fn new(manager: Arc<Songbird>, http: Client) -> (Self, mpsc::UnboundedReceiver<GuildId>) {
        let (session_loss, lost_sessions) = mpsc::unbounded_channel();

        let relay = Self {
            manager,
            http,
            sessions: Default::default(),
            nodes: Default::default(),
            loops: Default::default(),
            session_loss,
        };

        (relay, lost_sessions)
    }

    fn node(&self, guild_id: GuildId) -> Arc<Mutex<GuildNode>> {
        self.nodes.entry(guild_id).or_default().value().clone()
    }

    fn existing_node(&self, guild_id: GuildId) -> Option<Arc<Mutex<GuildNode>>> {
        self.nodes.get(&guild_id).map(|node| node.value().clone())
    }

    fn require_session(&self, guild_id: GuildId) -> RelayResult<()> {
        if self.sessions.contains_key(&guild_id) {
            Ok(())
        } else {
            Err(RelayError::NoSessionPresent)
        }
    }

    /// Sender for the guild's playback loop, spawning the loop on first use.
    fn loop_sender(&self, guild_id: GuildId) -> mpsc::UnboundedSender<LoopEvent> {
        let existing = self
            .loops
            .get(&guild_id)
            .map(|playback_loop| playback_loop.events.clone())
            .filter(|events| !events.is_closed());
        if let Some(events) = existing {
            return events;
        }

        let (events, mut receiver) = mpsc::unbounded_channel();
        let relay = self.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                relay.on_loop_event(guild_id, event).await;
            }
            debug!("Playback loop finished for guild {}", guild_id);
        });

        info!("Started playback loop for guild {}", guild_id);
        self.loops.insert(
            guild_id,
            PlaybackLoop {
                events: events.clone(),
                task,
            },
        );
        events
    }

    async fn on_loop_event(&self, guild_id: GuildId, event: LoopEvent) {
        let Some(node) = self.existing_node(guild_id) else {
            return;
        };
        let mut node = node.lock().await;

        let (handle, outcome) = match event {
            LoopEvent::TrackEnded(handle) => (handle, TrackOutcome::Ended),
            LoopEvent::TrackFailed(handle) => (handle, TrackOutcome::Failed),
        };

        let Some(finished) = node.finish_if(|current| current.uuid() == handle.uuid()) else {
            return;
        };
        match outcome {
            TrackOutcome::Ended => info!(
                "Track finished on guild {}: {}",
                guild_id, finished.track.title
            ),
            TrackOutcome::Failed => warn!(
                "Track exception on guild {}, skipping: {}",
                guild_id, finished.track.title
            ),
        }

        self.advance(guild_id, &mut node).await;
    }

    /// Start the next playable track from the queue, if any.
    async fn advance(&self, guild_id: GuildId, node: &mut GuildNode) {
        while let Some(next) = node.next_queued() {
            let title = next.track.title.clone();
            match self.start_track(guild_id, &next).await {
                Ok(handle) => {
                    node.set_current(handle, next);
                    return;
                }
                Err(e) => warn!("Skipping '{}' on guild {}: {}", title, guild_id, e),
            }
        }

        debug!("Queue drained for guild {}", guild_id);
    }

    async fn start_track(&self, guild_id: GuildId, track: &QueuedTrack) -> RelayResult<TrackHandle> {
        let call = self
            .manager
            .get(guild_id)
            .ok_or(RelayError::NoSessionPresent)?;

        let input = YoutubeDl::new(self.http.clone(), track.track.uri.clone());
        let handle = call.lock().await.play_input(input.into());

        let events = self.loop_sender(guild_id);
        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEventNotifier {
                    guild_id,
                    outcome: TrackOutcome::Ended,
                    events: events.clone(),
                },
            )
            .and_then(|_| {
                handle.add_event(
                    Event::Track(TrackEvent::Error),
                    TrackEventNotifier {
                        guild_id,
                        outcome: TrackOutcome::Failed,
                        events,
                    },
                )
            })
            .map_err(|e| RelayError::Playback(e.to_string()))?;

        info!("Track started on guild {}: {}", guild_id, track.track.title);
        Ok(handle)
    }
}

fn join_error(err: JoinError) -> RelayError {
    match err {
        JoinError::TimedOut => RelayError::ConnectionTimeout,
        other => RelayError::JoinFailed(other.to_string()),
    }
}

#[async_trait]
impl AudioRelay for SongbirdRelay {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> RelayResult<RelayConnection> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(join_error)?;

        let handler = call.lock().await;
        let info = handler.current_connection().ok_or_else(|| {
            RelayError::JoinFailed("voice connection was not confirmed".to_string())
        })?;

        Ok(RelayConnection {
            guild_id,
            channel_id,
            endpoint: info.endpoint.clone(),
            session_id: info.session_id.clone(),
        })
    }

    async fn create_session(&self, connection: RelayConnection) -> RelayResult<()> {
        let guild_id = connection.guild_id;
        let call = self.manager.get(guild_id).ok_or_else(|| {
            RelayError::JoinFailed("not connected to a voice channel".to_string())
        })?;

        {
            let mut handler = call.lock().await;
            handler.remove_all_global_events();
            handler.add_global_event(
                Event::Core(CoreEvent::DriverDisconnect),
                SessionLossNotifier {
                    guild_id,
                    sessions: self.sessions.clone(),
                    notify: self.session_loss.clone(),
                },
            );
        }

        self.nodes.entry(guild_id).or_default();
        debug!(
            "Created relay session for guild {} via {}",
            guild_id, connection.endpoint
        );
        self.sessions.insert(guild_id, connection);

        Ok(())
    }

    async fn destroy_session(&self, guild_id: GuildId) -> RelayResult<()> {
        self.sessions.remove(&guild_id);

        if let Some(call) = self.manager.get(guild_id) {
            call.lock().await.remove_all_global_events();
        }

        if let Some(node) = self.existing_node(guild_id) {
            node.lock().await.halt(guild_id);
        }

        debug!("Destroyed relay session for guild {}", guild_id);
        Ok(())
    }

    async fn leave(&self, guild_id: GuildId) -> RelayResult<()> {
        match self.manager.remove(guild_id).await {
            Ok(()) | Err(JoinError::NoCall) => Ok(()),
            Err(e) => Err(RelayError::Playback(e.to_string())),
        }
    }

    async fn search_tracks(&self, query: &str) -> RelayResult<Vec<TrackInfo>> {
        let query = query.trim();

        if AudioSource::is_url(query) {
            debug!(
                "Resolving URL {} (youtube: {})",
                query,
                is_youtube_url(query)
            );
            let mut source = YoutubeDl::new(self.http.clone(), query.to_string());
            let mut metadata = source
                .aux_metadata()
                .await
                .map_err(|e| RelayError::Search(e.to_string()))?;
            metadata.source_url.get_or_insert_with(|| query.to_string());

            return Ok(TrackInfo::from_aux(metadata).into_iter().collect());
        }

        let mut source = YoutubeDl::new_search(self.http.clone(), query.to_string());
        let results = source
            .search(Some(SEARCH_RESULTS))
            .await
            .map_err(|e| RelayError::Search(e.to_string()))?;

        Ok(results.into_iter().filter_map(TrackInfo::from_aux).collect())
    }

    async fn play(
        &self,
        guild_id: GuildId,
        track: TrackInfo,
        requester: UserId,
        enqueue: bool,
    ) -> RelayResult<()> {
        self.require_session(guild_id)?;

        let queued = QueuedTrack::new(track, requester);
        let title = queued.track.title.clone();
        let node = self.node(guild_id);
        let mut node = node.lock().await;

        match node.admit(queued, enqueue) {
            Admission::Queued(position) => {
                debug!(
                    "Queued '{}' for guild {} at position {}",
                    title, guild_id, position
                );
            }
            Admission::StartNow(queued) => {
                node.halt(guild_id);
                let handle = self.start_track(guild_id, &queued).await?;
                node.set_current(handle, queued);
            }
        }

        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> RelayResult<()> {
        if let Some(node) = self.existing_node(guild_id) {
            node.lock().await.halt(guild_id);
        }
        Ok(())
    }

    async fn clear_queue(&self, guild_id: GuildId) -> RelayResult<()> {
        if let Some(node) = self.existing_node(guild_id) {
            node.lock().await.queue.clear();
        }
        Ok(())
    }

    async fn skip(&self, guild_id: GuildId) -> RelayResult<Option<QueuedTrack>> {
        let Some(node) = self.existing_node(guild_id) else {
            return Ok(None);
        };
        let mut node = node.lock().await;

        let Some(current) = node.take_current() else {
            return Ok(None);
        };
        if let Err(e) = current.handle.stop() {
            debug!("Skipped track on guild {} had already ended: {}", guild_id, e);
        }

        self.advance(guild_id, &mut node).await;
        Ok(Some(current.track))
    }

    async fn pause(&self, guild_id: GuildId) -> RelayResult<()> {
        self.require_session(guild_id)?;

        let node = self.node(guild_id);
        let mut node = node.lock().await;
        let Some(current) = node.current_handle() else {
            return Ok(());
        };
        current
            .pause()
            .map_err(|e| RelayError::Playback(e.to_string()))?;
        node.paused = true;
        Ok(())
    }

    async fn resume(&self, guild_id: GuildId) -> RelayResult<()> {
        self.require_session(guild_id)?;

        let node = self.node(guild_id);
        let mut node = node.lock().await;
        let Some(current) = node.current_handle() else {
            return Ok(());
        };
        current
            .play()
            .map_err(|e| RelayError::Playback(e.to_string()))?;
        node.paused = false;
        Ok(())
    }

    async fn queue_state(&self, guild_id: GuildId) -> RelayResult<GuildQueueState> {
        Ok(match self.existing_node(guild_id) {
            Some(node) => node.lock().await.snapshot(),
            None => GuildQueueState::default(),
        })
    }

    async fn remove_guild_state(&self, guild_id: GuildId) -> RelayResult<()> {
        if let Some((_, node)) = self.nodes.remove(&guild_id) {
            let mut node = node.lock().await;
            node.halt(guild_id);
            node.queue.clear();
        }
        Ok(())
    }

    async fn remove_guild_from_loops(&self, guild_id: GuildId) -> RelayResult<()> {
        if let Some((_, playback_loop)) = self.loops.remove(&guild_id) {
            playback_loop.task.abort();
            info!("Stopped playback loop for guild {}", guild_id);
        }
        Ok(())
    }
}
