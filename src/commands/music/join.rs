use super::*;

/// Join the voice channel you are in
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn join(ctx: Context<'_>) -> CommandResult {
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    let result = ctx.data().music.join(&invocation).await;
    respond(ctx, result).await
}
