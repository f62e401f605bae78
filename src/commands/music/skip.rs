use super::*;

/// Skip the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    let result = ctx.data().music.skip(invocation.guild_id).await;
    respond(ctx, result).await
}
