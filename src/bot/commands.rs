use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

use super::dispatcher::Command;
use crate::error::{PlaybackError, PlaybackResult};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        join_command(),
        leave_command(),
        play_command(),
        pause_command(),
        resume_command(),
        stop_command(),
        skip_command(),
        queue_command(),
        nowplaying_command(),
        volume_command(),
        help_command(),
    ]
}

/// Traduce un slash command y sus opciones a un [`Command`].
///
/// `help` is answered by the handler directly and is not a playback command.
pub fn parse_command(name: &str, query: Option<&str>, level: Option<i64>) -> PlaybackResult<Command> {
    let command = match name {
        "join" => Command::Join,
        "leave" => Command::Leave,
        "play" => {
            let query = query
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .ok_or_else(|| PlaybackError::InvalidArgument("A search term or URL is required".into()))?;
            Command::Play {
                query: query.to_string(),
            }
        }
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "stop" => Command::Stop,
        "skip" => Command::Skip,
        "queue" => Command::Queue,
        "nowplaying" => Command::NowPlaying,
        "volume" => Command::Volume {
            percent: level
                .ok_or_else(|| PlaybackError::InvalidArgument("A volume level is required".into()))?,
        },
        other => {
            return Err(PlaybackError::InvalidArgument(format!(
                "Unknown command /{}",
                other
            )))
        }
    };

    Ok(command)
}

// Conexión

fn join_command() -> CreateCommand {
    CreateCommand::new("join").description("Join your voice channel")
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Leave the voice channel and clear the queue")
}

// Reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play a track, or add it to the queue")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL or search term",
            )
            .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pause playback")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resume paused playback")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stop playback and clear the queue")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skip to the next track in the queue")
}

// Cola

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show the pending tracks")
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Show the track playing now")
}

// Audio

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Set the playback volume")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "level",
                "Volume level (0-100)",
            )
            .required(true),
        )
}

fn help_command() -> CreateCommand {
    CreateCommand::new("help").description("Show the available commands")
}
