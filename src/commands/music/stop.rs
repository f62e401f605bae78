use super::*;

/// Stop playback and clear the queue
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    let result = ctx.data().music.stop(invocation.guild_id).await;
    respond(ctx, result).await
}
