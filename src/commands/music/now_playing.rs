use super::*;

/// Show the track that is playing right now
#[poise::command(slash_command, guild_only, rename = "nowplaying", category = "Music")]
pub async fn now_playing(ctx: Context<'_>) -> CommandResult {
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    let result = ctx.data().music.now_playing(invocation.guild_id).await;
    respond(ctx, result).await
}
