use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

use crate::sources::ResolvedMedia;

/// Referencia opaca al stream de audio (URL directa del medio).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    url: String,
}

impl StreamHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Un track resuelto y listo para reproducir. Inmutable una vez creado.
#[derive(Debug, Clone)]
pub struct Track {
    title: String,
    stream: StreamHandle,
    volume: f32,
    webpage_url: Option<String>,
    duration: Option<Duration>,
    requested_by: UserId,
    added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(title: impl Into<String>, stream: StreamHandle, requested_by: UserId) -> Self {
        Self {
            title: title.into(),
            stream,
            volume: 0.5,
            webpage_url: None,
            duration: None,
            requested_by,
            added_at: Utc::now(),
        }
    }

    /// Construye el track a partir del resultado del resolver.
    pub fn from_media(media: ResolvedMedia, requested_by: UserId, volume: f32) -> Self {
        let mut track = Self::new(media.title, media.stream, requested_by).with_volume(volume);
        track.webpage_url = media.webpage_url;
        track.duration = media.duration;
        track
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn stream(&self) -> &StreamHandle {
        &self.stream
    }
    pub fn volume(&self) -> f32 {
        self.volume
    }
    pub fn webpage_url(&self) -> Option<&str> {
        self.webpage_url.as_deref()
    }
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }
    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }
}

// Dos pedidos del mismo medio son el mismo track aunque difiera `added_at`.
impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.stream == other.stream
            && self.volume == other.volume
            && self.webpage_url == other.webpage_url
            && self.duration == other.duration
            && self.requested_by == other.requested_by
    }
}

/// Cola FIFO de una guild más el track que suena ahora.
///
/// No tiene sincronización propia: vive dentro del lock de su
/// [`GuildSlot`](super::store::GuildSlot) y sólo se toca con ese lock tomado.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    pending: VecDeque<Track>,
    now_playing: Option<Track>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final de la cola
    pub fn enqueue(&mut self, track: Track) {
        info!("➕ Agregado a la cola: {}", track.title());
        self.pending.push_back(track);
    }

    /// Saca el primero en entrar y lo marca como actual en el mismo paso.
    pub fn pop_next(&mut self) -> Option<Track> {
        self.now_playing = self.pending.pop_front();
        match &self.now_playing {
            Some(track) => info!("➡️ Siguiente en cola (FIFO): {}", track.title()),
            None => debug!("📭 Cola vacía, no hay siguiente track"),
        }
        self.now_playing.clone()
    }

    /// Marca un track como actual sin pasar por la cola (reproducción directa).
    pub fn start(&mut self, track: Track) {
        self.now_playing = Some(track);
    }

    /// Olvida el track actual y lo devuelve.
    pub fn finish(&mut self) -> Option<Track> {
        self.now_playing.take()
    }

    /// Vacía la cola y el track actual
    pub fn clear(&mut self) {
        let cleared = self.pending.len();
        self.pending.clear();
        self.now_playing = None;
        info!("🗑️ Cola limpiada: {} tracks removidos", cleared);
    }

    /// Vista ordenada: el actual primero, luego los pendientes.
    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<Track> {
        self.now_playing
            .iter()
            .chain(self.pending.iter())
            .cloned()
            .collect()
    }

    pub fn pending_titles(&self) -> Vec<String> {
        self.pending.iter().map(|t| t.title().to_string()).collect()
    }

    pub fn now_playing(&self) -> Option<&Track> {
        self.now_playing.as_ref()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
