use std::sync::Arc;

use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ashema::commands::music::{
    audio_sources::{songbird_relay::SongbirdRelay, youtube::YoutubeCatalog},
    chill::*, join::*, leave::*, now_playing::*, pause::*, play::*, queue::*, resume::*, skip::*,
    stop::*,
    utils::{music_manager::MusicManager, session_tracker::VoiceSessionTracker},
};
use ashema::config::Config;
use ashema::events::{event_handler, on_error};
use ashema::{CommandResult, Context, Data, Error};

#[poise::command(slash_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

/// Tear down guilds whose voice connection the driver reports as lost.
fn watch_session_loss(music: MusicManager, mut lost: mpsc::UnboundedReceiver<serenity::GuildId>) {
    tokio::spawn(async move {
        while let Some(guild_id) = lost.recv().await {
            if let Err(err) = music.handle_session_lost(guild_id).await {
                error!("Failed to clean up lost session in guild {}: {}", guild_id, err);
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ashema=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Config::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let songbird = Songbird::serenity();
    let http = reqwest::Client::new();

    let (relay, lost_sessions) = SongbirdRelay::new(Arc::clone(&songbird), http.clone());
    let catalog = YoutubeCatalog::new(http, config.youtube_api_key.clone());
    let music = MusicManager::new(
        Arc::new(relay),
        Arc::new(catalog),
        Arc::new(VoiceSessionTracker::new()),
        config.chill_playlist_id.clone(),
    );
    watch_session_loss(music.clone(), lost_sessions);

    let commands = vec![
        // Default commands
        register(),
        help(),
        // Music commands
        join(),
        leave(),
        play(),
        pause(),
        resume(),
        stop(),
        skip(),
        queue(),
        now_playing(),
        chill(),
    ];

    let token = config.discord_token.clone();
    let prefix = config.prefix.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                case_insensitive_commands: true,
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_in_guild(
                    ctx,
                    &framework.options().commands,
                    config.guild_id,
                )
                .await?;
                info!("Registered commands in guild {}", config.guild_id);
                Ok(Data::new(config, music))
            })
        });

    let mut client = ClientBuilder::new(token, intents)
        .framework(framework.build())
        .register_songbird_with(songbird)
        .await?;

    client.start().await.map_err(Into::into)
}
