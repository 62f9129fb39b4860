use anyhow::Result;
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
        EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use super::{
    commands::parse_command,
    dispatcher::{Command, CommandContext},
    JukeboxBot,
};
use crate::{error::ErrorKind, ui::embeds};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &JukeboxBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    if command.data.name == "help" {
        return respond(ctx, &command, embeds::help_embed(), true).await;
    }

    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str());
    let level = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "level")
        .and_then(|opt| opt.value.as_i64());

    let parsed = match parse_command(&command.data.name, query, level) {
        Ok(parsed) => parsed,
        Err(e) => return respond(ctx, &command, embeds::error_embed(&e), true).await,
    };

    bot.announcer.remember_channel(guild_id, command.channel_id);

    let request = CommandContext {
        guild_id,
        user_id: command.user.id,
        user_channel: user_voice_channel(ctx, guild_id, command.user.id),
    };

    if let Command::Play { .. } = parsed {
        // Resolver puede tardar: defer y editar después
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
            )
            .await?;

        let embed = match bot.dispatcher.dispatch(request, parsed).await {
            Ok(reply) => embeds::reply_embed(&reply),
            Err(e) => {
                warn!("❌ /play falló en guild {}: {}", guild_id, e);
                embeds::error_embed(&e)
            }
        };

        command
            .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
            .await?;
        return Ok(());
    }

    match bot.dispatcher.dispatch(request, parsed).await {
        Ok(reply) => respond(ctx, &command, embeds::reply_embed(&reply), false).await,
        Err(e) => {
            if e.kind() != ErrorKind::UserInput {
                warn!("❌ /{} falló en guild {}: {}", command.data.name, guild_id, e);
            }
            respond(ctx, &command, embeds::error_embed(&e), true).await
        }
    }
}

async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    embed: CreateEmbed,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;

    Ok(())
}

/// Canal de voz del usuario según el caché de la guild.
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
