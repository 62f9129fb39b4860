//! # Bot Module
//!
//! Discord glue for the jukebox: slash command registration, interaction
//! handling and voice state tracking.
//!
//! ## Architecture
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`]. Every slash command
//! is parsed into a [`dispatcher::Command`] and routed by the
//! [`dispatcher::Dispatcher`] to exactly one
//! [`PlaybackController`](crate::audio::player::PlaybackController) operation.
//! Notices that do not answer a command go out through
//! [`events::ChannelAnnouncer`].

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod handlers;

use crate::config::Config;
use dispatcher::Dispatcher;
use events::ChannelAnnouncer;

/// Handler principal de eventos de Discord.
pub struct JukeboxBot {
    config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
    pub announcer: Arc<ChannelAnnouncer>,
}

impl JukeboxBot {
    pub fn new(config: Config, dispatcher: Arc<Dispatcher>, announcer: Arc<ChannelAnnouncer>) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
            announcer,
        }
    }

    /// Registers slash commands with Discord.
    ///
    /// Commands go to the development guild when `GUILD_ID` is set (near
    /// instant propagation) and globally otherwise (up to an hour).
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos globales: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                    })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command_interaction) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Limpia el estado de la guild si alguien desconecta al bot a mano.
    ///
    /// Only a disconnect from the channel the controller believes it is in
    /// tears anything down. A late event for an older connection is ignored.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };
        let Some(old_channel) = old.and_then(|state| state.channel_id) else {
            return;
        };

        let controller = self.dispatcher.controller();
        if controller.current_channel(guild_id).await != Some(old_channel) {
            debug!("Desconexión ajena a la sesión actual en guild {}, ignorada", guild_id);
            return;
        }

        info!("🔌 Bot desconectado externamente en guild {}", guild_id);
        if let Err(e) = controller.leave(guild_id).await {
            error!("Error al limpiar estado tras desconexión: {:?}", e);
        }
    }
}
