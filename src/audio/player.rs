use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::Track,
        store::{GuildState, QueueStore},
    },
    error::{PlaybackError, PlaybackResult, SinkError},
};

/// Callback que la salida de audio invoca una sola vez al terminar un track.
pub type OnFinished = Box<dyn FnOnce(Option<SinkError>) -> BoxFuture<'static, ()> + Send>;

/// Salida de audio (conexión de voz) de todas las guilds.
///
/// `on_finished` fires exactly once for every `play` that returned `Ok`, either
/// at end of stream or on a stream error. It must never be invoked from inside
/// `play` itself: a `play` that fails returns `Err` and drops the callback.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), SinkError>;
    async fn play(
        &self,
        guild_id: GuildId,
        track: &Track,
        on_finished: OnFinished,
    ) -> Result<(), SinkError>;
    async fn pause(&self, guild_id: GuildId) -> Result<(), SinkError>;
    async fn resume(&self, guild_id: GuildId) -> Result<(), SinkError>;
    async fn stop(&self, guild_id: GuildId) -> Result<(), SinkError>;
    async fn set_volume(&self, guild_id: GuildId, gain: f32) -> Result<(), SinkError>;
    async fn disconnect(&self, guild_id: GuildId) -> Result<(), SinkError>;
}

/// Avisos que no responden a un comando (auto-play, fallos de stream).
#[derive(Debug, Clone, PartialEq)]
pub enum Announcement {
    NowPlaying(Track),
    TrackFailed { title: String, reason: String },
}

#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, guild_id: GuildId, announcement: Announcement);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// Sin nada sonando (con o sin conexión de voz).
    #[default]
    Idle,
    Connecting,
    Playing,
    Paused,
}

/// Identifica un stream concreto; el callback de fin lo trae de vuelta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayTicket {
    pub generation: u64,
    pub serial: u64,
}

/// Resultado exitoso de un comando.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerReply {
    Joined { channel: ChannelId, moved: bool },
    AlreadyConnected(ChannelId),
    Left,
    NotConnected,
    NowPlaying(Track),
    Queued { track: Track, position: usize },
    Paused,
    Resumed,
    Stopped,
    Skipped { next: Option<Track> },
    NothingPlaying,
    NothingPaused,
    VolumeSet(u8),
    Queue(Vec<String>),
    Current(Option<Track>),
}

/// Máquina de estados de reproducción por guild.
///
/// Every operation that touches a guild's queue or state runs under that
/// guild's lock from [`QueueStore`]. Guilds never contend with each other.
pub struct PlaybackController {
    store: Arc<QueueStore>,
    sink: Arc<dyn AudioSink>,
    announcer: Arc<dyn Announcer>,
    max_queue_size: usize,
}

impl PlaybackController {
    pub fn new(
        store: Arc<QueueStore>,
        sink: Arc<dyn AudioSink>,
        announcer: Arc<dyn Announcer>,
        max_queue_size: usize,
    ) -> Self {
        Self {
            store,
            sink,
            announcer,
            max_queue_size,
        }
    }

    /// Conecta (o mueve) el bot al canal de voz del usuario.
    pub async fn join(
        &self,
        guild_id: GuildId,
        channel: Option<ChannelId>,
    ) -> PlaybackResult<PlayerReply> {
        let channel = channel.ok_or(PlaybackError::NotInVoiceChannel)?;
        let slot = self.store.get_or_create(guild_id);
        let mut state = slot.lock().await;

        if state.channel == Some(channel) {
            debug!("Ya conectado al canal {} en guild {}", channel, guild_id);
            return Ok(PlayerReply::AlreadyConnected(channel));
        }

        let previous = state.player;
        let moved = state.channel.is_some();
        state.player = PlayerState::Connecting;

        match self.sink.connect(guild_id, channel).await {
            Ok(()) => {
                if !moved {
                    state.generation += 1;
                }
                state.channel = Some(channel);
                state.player = previous;
                info!("🔊 Conectado al canal {} en guild {}", channel, guild_id);
                Ok(PlayerReply::Joined { channel, moved })
            }
            Err(e) => {
                state.player = previous;
                error!("Error al conectar al canal de voz en guild {}: {}", guild_id, e);
                Err(PlaybackError::Connection(e.to_string()))
            }
        }
    }

    /// Encola si hay algo sonando; si no, reproduce de inmediato.
    ///
    /// `generation` is the value read before the track was resolved. If the
    /// guild left or reconnected since then the track is discarded.
    pub async fn enqueue_or_play(
        self: &Arc<Self>,
        guild_id: GuildId,
        track: Track,
        generation: u64,
    ) -> PlaybackResult<PlayerReply> {
        let slot = self.store.get_or_create(guild_id);
        let mut state = slot.lock().await;

        if state.generation != generation {
            warn!(
                "🗑️ Resolución obsoleta descartada en guild {}: {}",
                guild_id,
                track.title()
            );
            return Err(PlaybackError::Superseded(track.title().to_string()));
        }
        if state.channel.is_none() {
            return Err(PlaybackError::NotConnected);
        }

        match state.player {
            PlayerState::Playing | PlayerState::Paused => {
                if state.queue.len() >= self.max_queue_size {
                    return Err(PlaybackError::QueueFull(self.max_queue_size));
                }
                state.queue.enqueue(track.clone());
                Ok(PlayerReply::Queued {
                    position: state.queue.len(),
                    track,
                })
            }
            PlayerState::Idle | PlayerState::Connecting => {
                state.queue.start(track.clone());
                if let Err(e) = self.play_locked(&mut state, guild_id, &track).await {
                    state.queue.finish();
                    return Err(e.into());
                }
                Ok(PlayerReply::NowPlaying(track))
            }
        }
    }

    /// Arranca `track` en la salida. Requiere el lock y nada sonando.
    async fn play_locked(
        self: &Arc<Self>,
        state: &mut GuildState,
        guild_id: GuildId,
        track: &Track,
    ) -> Result<(), SinkError> {
        let ticket = state.issue_ticket();
        let on_finished = self.track_end_callback(guild_id, ticket);

        self.sink.play(guild_id, track, on_finished).await?;

        state.active = Some(ticket);
        state.player = PlayerState::Playing;
        info!("🎵 Reproduciendo en guild {}: {}", guild_id, track.title());
        Ok(())
    }

    fn track_end_callback(self: &Arc<Self>, guild_id: GuildId, ticket: PlayTicket) -> OnFinished {
        let controller = Arc::clone(self);
        Box::new(move |error| {
            async move { controller.handle_track_end(guild_id, ticket, error).await }.boxed()
        })
    }

    /// Handler del fin de un track: avanza la cola o pasa a `Idle`.
    pub async fn handle_track_end(
        self: &Arc<Self>,
        guild_id: GuildId,
        ticket: PlayTicket,
        error: Option<SinkError>,
    ) {
        let slot = self.store.get_or_create(guild_id);
        let mut announcements = Vec::new();
        {
            let mut state = slot.lock().await;
            if !state.is_current(ticket) {
                debug!(
                    "Fin de track obsoleto ignorado en guild {} ({:?})",
                    guild_id, ticket
                );
                return;
            }

            state.active = None;
            let finished = state.queue.finish();
            if let Some(e) = error {
                warn!("❌ Error en track para guild {}: {}", guild_id, e);
                announcements.push(Announcement::TrackFailed {
                    title: finished.map(|t| t.title().to_string()).unwrap_or_default(),
                    reason: e.to_string(),
                });
            }

            if let Some(next) = self.advance_locked(&mut state, guild_id, &mut announcements).await {
                announcements.push(Announcement::NowPlaying(next));
            }
        }

        for announcement in announcements {
            self.announcer.announce(guild_id, announcement).await;
        }
    }

    /// Saca el siguiente track y lo reproduce, saltando los que no arrancan.
    async fn advance_locked(
        self: &Arc<Self>,
        state: &mut GuildState,
        guild_id: GuildId,
        failures: &mut Vec<Announcement>,
    ) -> Option<Track> {
        while let Some(next) = state.queue.pop_next() {
            match self.play_locked(state, guild_id, &next).await {
                Ok(()) => return Some(next),
                Err(e) => {
                    error!("Error al reproducir siguiente track: {}", e);
                    state.queue.finish();
                    failures.push(Announcement::TrackFailed {
                        title: next.title().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("📭 Cola terminada en guild {}", guild_id);
        state.player = PlayerState::Idle;
        None
    }

    /// Pausa la reproducción actual
    pub async fn pause(&self, guild_id: GuildId) -> PlaybackResult<PlayerReply> {
        let slot = self.store.get_or_create(guild_id);
        let mut state = slot.lock().await;

        if state.player != PlayerState::Playing {
            return Ok(PlayerReply::NothingPlaying);
        }
        self.sink.pause(guild_id).await?;
        state.player = PlayerState::Paused;
        info!("⏸️ Reproducción pausada en guild {}", guild_id);
        Ok(PlayerReply::Paused)
    }

    /// Reanuda la reproducción
    pub async fn resume(&self, guild_id: GuildId) -> PlaybackResult<PlayerReply> {
        let slot = self.store.get_or_create(guild_id);
        let mut state = slot.lock().await;

        if state.player != PlayerState::Paused {
            return Ok(PlayerReply::NothingPaused);
        }
        self.sink.resume(guild_id).await?;
        state.player = PlayerState::Playing;
        info!("▶️ Reproducción reanudada en guild {}", guild_id);
        Ok(PlayerReply::Resumed)
    }

    /// Detiene la reproducción y limpia la cola
    pub async fn stop(&self, guild_id: GuildId) -> PlaybackResult<PlayerReply> {
        let slot = self.store.get_or_create(guild_id);
        let mut state = slot.lock().await;

        let was_active = matches!(state.player, PlayerState::Playing | PlayerState::Paused);
        state.active = None;
        state.queue.clear();
        if !was_active {
            return Ok(PlayerReply::NothingPlaying);
        }

        state.player = PlayerState::Idle;
        if let Err(e) = self.sink.stop(guild_id).await {
            warn!("Error al detener la salida en guild {}: {}", guild_id, e);
        }
        info!("⏹️ Reproducción detenida en guild {}", guild_id);
        Ok(PlayerReply::Stopped)
    }

    /// Salta a la siguiente canción de la cola
    pub async fn skip(self: &Arc<Self>, guild_id: GuildId) -> PlaybackResult<PlayerReply> {
        let slot = self.store.get_or_create(guild_id);
        let mut failures = Vec::new();
        let reply = {
            let mut state = slot.lock().await;
            if !matches!(state.player, PlayerState::Playing | PlayerState::Paused) {
                return Ok(PlayerReply::NothingPlaying);
            }

            state.active = None;
            if let Some(skipped) = state.queue.finish() {
                info!("⏭️ Saltando: {}", skipped.title());
            }
            if let Err(e) = self.sink.stop(guild_id).await {
                warn!("Error al detener la salida en guild {}: {}", guild_id, e);
            }

            let next = self.advance_locked(&mut state, guild_id, &mut failures).await;
            PlayerReply::Skipped { next }
        };

        for failure in failures {
            self.announcer.announce(guild_id, failure).await;
        }
        Ok(reply)
    }

    /// Ajusta el volumen del track actual (0-100).
    pub async fn set_volume(&self, guild_id: GuildId, percent: i64) -> PlaybackResult<PlayerReply> {
        if !(0..=100).contains(&percent) {
            return Err(PlaybackError::InvalidArgument(
                "Volume must be between 0 and 100".to_string(),
            ));
        }

        let slot = self.store.get_or_create(guild_id);
        let state = slot.lock().await;
        if state.queue.now_playing().is_none() {
            return Ok(PlayerReply::NothingPlaying);
        }

        let gain = percent as f32 / 100.0;
        self.sink.set_volume(guild_id, gain).await?;
        info!("🔊 Volumen ajustado a {}% en guild {}", percent, guild_id);
        Ok(PlayerReply::VolumeSet(percent as u8))
    }

    /// Desconecta la salida sin importar el estado y limpia la cola.
    pub async fn leave(&self, guild_id: GuildId) -> PlaybackResult<PlayerReply> {
        let slot = self.store.get_or_create(guild_id);
        let mut state = slot.lock().await;

        let was_connected = state.channel.is_some();
        state.generation += 1;
        state.active = None;
        state.queue.clear();
        state.player = PlayerState::Idle;
        state.channel = None;

        if let Err(e) = self.sink.disconnect(guild_id).await {
            warn!("Error al desconectar en guild {}: {}", guild_id, e);
        }

        if was_connected {
            info!("👋 Desconectado del canal de voz en guild {}", guild_id);
            Ok(PlayerReply::Left)
        } else {
            Ok(PlayerReply::NotConnected)
        }
    }

    /// Títulos pendientes en orden de reproducción (sin el actual).
    pub async fn queue_list(&self, guild_id: GuildId) -> Vec<String> {
        let slot = self.store.get_or_create(guild_id);
        let state = slot.lock().await;
        state.queue.pending_titles()
    }

    #[cfg(test)]
    pub async fn snapshot(&self, guild_id: GuildId) -> Vec<Track> {
        let slot = self.store.get_or_create(guild_id);
        let state = slot.lock().await;
        state.queue.snapshot()
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> Option<Track> {
        let slot = self.store.get_or_create(guild_id);
        let state = slot.lock().await;
        state.queue.now_playing().cloned()
    }

    #[cfg(test)]
    pub async fn state(&self, guild_id: GuildId) -> PlayerState {
        let slot = self.store.get_or_create(guild_id);
        let state = slot.lock().await;
        state.player
    }

    pub async fn generation(&self, guild_id: GuildId) -> u64 {
        let slot = self.store.get_or_create(guild_id);
        let state = slot.lock().await;
        state.generation
    }

    pub async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let slot = self.store.get_or_create(guild_id);
        let state = slot.lock().await;
        state.channel
    }
}
