use super::*;
use tracing::info;

/// Play a song from YouTube or a direct URL
#[poise::command(slash_command, prefix_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"]
    #[rest]
    query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let Some(invocation) = invocation(ctx).await? else {
        return Ok(());
    };

    // Joining and searching can take longer than the interaction deadline
    ctx.defer().await?;

    let result = ctx.data().music.play(&invocation, &query).await;
    respond(ctx, result).await
}
