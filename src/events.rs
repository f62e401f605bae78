use poise::serenity_prelude::{self as serenity, ChannelId, FullEvent, GuildId, UserId, VoiceState};
use tracing::{debug, error, info, warn};

use crate::commands::music::utils::auto_pause::{VoiceStateChange, count_listeners};
use crate::{Data, Error};

/// What the gateway cache says about a voice channel at the moment an update is handled.
struct ChannelSnapshot {
    bot_channel: Option<ChannelId>,
    listeners: usize,
    user_is_bot: bool,
}

/// Poise event hook. Errors bubble up to `on_error`, which logs them without
/// stopping event delivery.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
            info!("Connected to {} guilds", data_about_bot.guilds.len());
        }
        FullEvent::VoiceStateUpdate { old, new } => {
            voice_state_update(ctx, data, old.as_ref(), new).await?;
        }
        _ => {}
    }
    Ok(())
}

async fn voice_state_update(
    ctx: &serenity::Context,
    data: &Data,
    old: Option<&VoiceState>,
    new: &VoiceState,
) -> Result<(), Error> {
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };
    let bot_id = ctx.cache.current_user().id;

    if new.user_id == bot_id {
        debug!("Bot voice state in guild {} is now {:?}", guild_id, new.channel_id);
        data.music
            .handle_bot_voice_state(guild_id, new.channel_id)
            .await?;
        return Ok(());
    }

    let Some(snapshot) = snapshot(ctx, guild_id, bot_id, new) else {
        return Ok(());
    };
    let Some(change) = VoiceStateChange::from_states(old, new, snapshot.user_is_bot) else {
        return Ok(());
    };

    data.music
        .handle_voice_state_change(bot_id, snapshot.bot_channel, &change, snapshot.listeners)
        .await?;
    Ok(())
}

/// Reads the cache synchronously; the guild reference must not be held across an await.
fn snapshot(
    ctx: &serenity::Context,
    guild_id: GuildId,
    bot_id: UserId,
    new: &VoiceState,
) -> Option<ChannelSnapshot> {
    let guild = ctx.cache.guild(guild_id)?;

    let is_bot = |user_id: UserId, state: Option<&VoiceState>| {
        state
            .and_then(|state| state.member.as_ref())
            .or_else(|| guild.members.get(&user_id))
            .is_some_and(|member| member.user.bot)
    };

    let bot_channel = guild
        .voice_states
        .get(&bot_id)
        .and_then(|state| state.channel_id);

    let listeners = count_listeners(guild.voice_states.values(), bot_channel, |state| {
        is_bot(state.user_id, Some(state))
    });

    Some(ChannelSnapshot {
        bot_channel,
        listeners,
        user_is_bot: is_bot(new.user_id, Some(new)),
    })
}

/// on_error is called when an error occurs in the framework.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => error!("Failed to start bot: {:?}", error),
        poise::FrameworkError::EventHandler { error, event, .. } => {
            warn!(
                "Error in event handler for {} event: {}",
                event.snake_case_name(),
                error
            );
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e)
            }
        }
    }
}
