use super::*;

/// Pause the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    let result = ctx.data().music.pause(invocation.guild_id).await;
    respond(ctx, result).await
}
