use super::*;

/// Leave the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    let result = ctx.data().music.leave(invocation.guild_id).await;
    respond(ctx, result).await
}
