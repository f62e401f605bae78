use super::*;

/// Play a random track from the chill playlist
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn chill(ctx: Context<'_>) -> CommandResult {
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    // Paging through the playlist can take a few requests
    ctx.defer().await?;

    let result = ctx.data().music.chill(&invocation).await;
    respond(ctx, result).await
}
