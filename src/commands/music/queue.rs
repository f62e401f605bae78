use super::*;

/// Show the current track and what's coming up
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    let result = ctx.data().music.queue(invocation.guild_id).await;
    respond(ctx, result).await
}
