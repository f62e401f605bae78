//! Per-guild voice session bookkeeping.
//!
//! A guild with no record is `Disconnected`. A join request inserts a
//! `Connecting` record, which is promoted to `Connected` once the relay confirms
//! the connection, or dropped when the join fails. The record goes away on
//! `leave`, when the bot is kicked or moved by someone else, or when the relay
//! reports the session lost.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use poise::serenity_prelude::{ChannelId, GuildId};
use tracing::debug;

use super::music_manager::{MusicError, MusicResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting {
        channel_id: ChannelId,
    },
    Connected {
        channel_id: ChannelId,
        since: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildVoiceSession {
    pub guild_id: GuildId,
    pub state: ConnectionState,
}

impl GuildVoiceSession {
    /// The channel the bot is connected to; `None` while still connecting.
    pub fn channel_id(&self) -> Option<ChannelId> {
        match self.state {
            ConnectionState::Connected { channel_id, .. } => Some(channel_id),
            ConnectionState::Connecting { .. } => None,
        }
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            ConnectionState::Connected { since, .. } => Some(since),
            ConnectionState::Connecting { .. } => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }
}

/// What a join request should do, as decided by `begin_connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPlan {
    /// A `Connecting` record was inserted; go ahead and connect.
    Connect,
    /// The bot already sits in the requested channel.
    AlreadyConnected(ChannelId),
}

#[derive(Debug, Default)]
pub struct VoiceSessionTracker {
    sessions: DashMap<GuildId, GuildVoiceSession>,
}

impl VoiceSessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guild's session slot for a connection to `channel_id`.
    pub fn begin_connecting(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<JoinPlan> {
        match self.sessions.entry(guild_id) {
            Entry::Occupied(existing) => match existing.get().state {
                ConnectionState::Connected { channel_id: current, .. } if current == channel_id => {
                    Ok(JoinPlan::AlreadyConnected(current))
                }
                ConnectionState::Connected { channel_id: current, .. } => {
                    Err(MusicError::AlreadyConnectedElsewhere(current))
                }
                ConnectionState::Connecting { .. } => Err(MusicError::JoinInProgress),
            },
            Entry::Vacant(slot) => {
                slot.insert(GuildVoiceSession {
                    guild_id,
                    state: ConnectionState::Connecting { channel_id },
                });
                debug!("Guild {} connecting to {}", guild_id, channel_id);
                Ok(JoinPlan::Connect)
            }
        }
    }

    pub fn mark_connected(&self, guild_id: GuildId, channel_id: ChannelId) -> GuildVoiceSession {
        let session = GuildVoiceSession {
            guild_id,
            state: ConnectionState::Connected {
                channel_id,
                since: Utc::now(),
            },
        };
        self.sessions.insert(guild_id, session);
        debug!("Guild {} connected to {}", guild_id, channel_id);
        session
    }

    /// Drop a `Connecting` record after a failed join. Connected sessions are kept.
    pub fn abort_connecting(&self, guild_id: GuildId) {
        self.sessions
            .remove_if(&guild_id, |_, session| !session.is_connected());
    }

    pub fn end(&self, guild_id: GuildId) -> Option<GuildVoiceSession> {
        self.sessions.remove(&guild_id).map(|(_, session)| session)
    }

    pub fn get(&self, guild_id: GuildId) -> Option<GuildVoiceSession> {
        self.sessions.get(&guild_id).map(|session| *session)
    }

    /// `None` means disconnected.
    pub fn state(&self, guild_id: GuildId) -> Option<ConnectionState> {
        self.get(guild_id).map(|session| session.state)
    }

    pub fn is_connected(&self, guild_id: GuildId) -> bool {
        self.get(guild_id).is_some_and(|session| session.is_connected())
    }

    /// Compare a connected session against the channel the gateway reports the
    /// bot in, removing and returning the session when they disagree.
    pub fn reconcile(
        &self,
        guild_id: GuildId,
        observed: Option<ChannelId>,
    ) -> Option<GuildVoiceSession> {
        self.sessions
            .remove_if(&guild_id, |_, session| match session.state {
                ConnectionState::Connected { channel_id, .. } => observed != Some(channel_id),
                ConnectionState::Connecting { .. } => false,
            })
            .map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
