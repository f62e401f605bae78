pub mod chill;
pub mod join;
pub mod leave;
pub mod now_playing;
pub mod pause;
pub mod play;
pub mod queue;
pub mod resume;
pub mod skip;
pub mod stop;

pub mod audio_sources;
pub mod utils;

use std::sync::atomic::Ordering;

use tracing::error;

use crate::{CommandResult, Context};
use utils::{
    embedded_messages,
    music_manager::{Invocation, MusicOutcome, MusicResult},
};

/// Send the reply for a music command's result.
///
/// Preconditions the caller can fix are reported inline; collaborator failures
/// are logged and answered with a generic message.
async fn respond(ctx: Context<'_>, result: MusicResult<MusicOutcome>) -> CommandResult {
    let reply = match result {
        Ok(outcome) => embedded_messages::outcome(&outcome, &ctx.author().name),
        Err(err) => {
            if !err.is_user_facing() {
                error!("Command '{}' failed: {}", ctx.command().name, err);
            }
            embedded_messages::error(&err, !has_public_response(ctx))
        }
    };

    ctx.send(reply).await?;
    Ok(())
}

/// Resolve the invocation, reporting `NotInGuild` as a reply rather than a framework error.
async fn invocation(ctx: Context<'_>) -> Result<Option<Invocation>, crate::Error> {
    match Invocation::from_context(&ctx) {
        Ok(invocation) => Ok(Some(invocation)),
        Err(err) => {
            ctx.send(embedded_messages::error(&err, true)).await?;
            Ok(None)
        }
    }
}

/// A deferred interaction already owns a public response, and follow-up edits
/// of it cannot become ephemeral.
fn has_public_response(ctx: Context<'_>) -> bool {
    match ctx {
        poise::Context::Application(ctx) => ctx.has_sent_initial_response.load(Ordering::SeqCst),
        poise::Context::Prefix(_) => false,
    }
}
