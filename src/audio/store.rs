use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{
    player::{PlayTicket, PlayerState},
    queue::PlaybackQueue,
};

/// Todo lo que se lee o escribe de una guild, detrás de un único lock.
#[derive(Debug, Default)]
pub struct GuildState {
    pub queue: PlaybackQueue,
    pub player: PlayerState,
    pub channel: Option<ChannelId>,
    pub generation: u64,
    pub active: Option<PlayTicket>,
    next_serial: u64,
}

impl GuildState {
    /// Emite un ticket nuevo para la conexión actual.
    pub fn issue_ticket(&mut self) -> PlayTicket {
        self.next_serial += 1;
        PlayTicket {
            generation: self.generation,
            serial: self.next_serial,
        }
    }

    /// Un ticket sigue vigente sólo si es el activo y de la conexión actual.
    pub fn is_current(&self, ticket: PlayTicket) -> bool {
        ticket.generation == self.generation && self.active == Some(ticket)
    }
}

#[derive(Debug)]
pub struct GuildSlot {
    state: Mutex<GuildState>,
}

impl GuildSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(GuildState::default()),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, GuildState> {
        self.state.lock().await
    }
}

/// Mapa guild → estado de reproducción. Se crea en `main` y se inyecta.
#[derive(Debug, Default)]
pub struct QueueStore {
    guilds: DashMap<GuildId, Arc<GuildSlot>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildSlot> {
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("🆕 Creando cola para guild {}", guild_id);
                Arc::new(GuildSlot::new())
            })
            .clone()
    }

    #[cfg(test)]
    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildSlot>> {
        self.guilds.get(&guild_id).map(|slot| slot.clone())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.guilds.len()
    }
}
