use async_trait::async_trait;
use dashmap::DashMap;
use serenity::{
    builder::CreateMessage,
    http::Http,
    model::id::{ChannelId, GuildId},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    audio::player::{Announcement, Announcer},
    ui::embeds,
};

/// Publica los avisos de reproducción en el último canal de texto
/// desde el que se usó un comando en cada guild.
pub struct ChannelAnnouncer {
    http: Arc<Http>,
    channels: DashMap<GuildId, ChannelId>,
}

impl ChannelAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            channels: DashMap::new(),
        }
    }

    pub fn remember_channel(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.channels.insert(guild_id, channel_id);
    }

    fn channel_for(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.channels.get(&guild_id).map(|c| *c)
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn announce(&self, guild_id: GuildId, announcement: Announcement) {
        let Some(channel_id) = self.channel_for(guild_id) else {
            debug!("Sin canal de texto para avisos en guild {}", guild_id);
            return;
        };

        let message = CreateMessage::new().embed(embeds::announcement_embed(&announcement));
        if let Err(e) = channel_id.send_message(&self.http, message).await {
            warn!("No se pudo enviar aviso a {} en guild {}: {:?}", channel_id, guild_id, e);
        }
    }
}
