//! Pause when the only listener deafens, resume when they undeafen.

use poise::serenity_prelude::{ChannelId, GuildId, UserId, VoiceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Pause,
    Resume,
}

/// The parts of a voice state update the policy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceStateChange {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub is_bot: bool,
    pub channel_id: Option<ChannelId>,
    /// `None` when the gateway had no earlier state for this user.
    pub was_self_deaf: Option<bool>,
    pub self_deaf: bool,
}

impl VoiceStateChange {
    pub fn from_states(old: Option<&VoiceState>, new: &VoiceState, is_bot: bool) -> Option<Self> {
        Some(Self {
            guild_id: new.guild_id?,
            user_id: new.user_id,
            is_bot,
            channel_id: new.channel_id,
            was_self_deaf: old.map(|state| state.self_deaf),
            self_deaf: new.self_deaf,
        })
    }
}

/// Count the non-bot members sitting in `bot_channel`. The bot itself and any
/// other bots in the channel are excluded through `is_bot`.
pub fn count_listeners<'a>(
    voice_states: impl IntoIterator<Item = &'a VoiceState>,
    bot_channel: Option<ChannelId>,
    is_bot: impl Fn(&VoiceState) -> bool,
) -> usize {
    let Some(channel) = bot_channel else {
        return 0;
    };

    voice_states
        .into_iter()
        .filter(|state| state.channel_id == Some(channel))
        .filter(|state| !is_bot(state))
        .count()
}

/// Decide whether a voice state change should pause or resume playback.
///
/// `bot_channel` is the channel the bot currently sits in for the guild and
/// `listeners` the number of non-bot members in it.
pub fn evaluate(
    bot_id: UserId,
    bot_channel: Option<ChannelId>,
    change: &VoiceStateChange,
    listeners: usize,
) -> Option<PolicyAction> {
    if change.user_id == bot_id || change.is_bot {
        return None;
    }

    let bot_channel = bot_channel?;
    if change.channel_id != Some(bot_channel) || listeners != 1 {
        return None;
    }

    match (change.was_self_deaf, change.self_deaf) {
        (Some(false), true) => Some(PolicyAction::Pause),
        (Some(true), false) => Some(PolicyAction::Resume),
        _ => None,
    }
}
