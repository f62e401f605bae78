use super::*;

/// Resume the paused track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    let result = ctx.data().music.resume(invocation.guild_id).await;
    respond(ctx, result).await
}
