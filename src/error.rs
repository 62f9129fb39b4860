//! Error taxonomy for the playback core.
//!
//! Every command reports exactly one outcome to the user: either a reply or one
//! of these errors. The `Display` text of each variant is what the user sees.

use std::time::Duration;
use thiserror::Error;

/// Errores que llegan al usuario como respuesta a un comando.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("You are not connected to a voice channel.")]
    NotInVoiceChannel,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Not connected to a voice channel.")]
    NotConnected,

    #[error("The queue is full (max {0} tracks).")]
    QueueFull(usize),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Could not join the voice channel: {0}")]
    Connection(String),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The guild left or reconnected while the track was still resolving.
    #[error("The player was reset while **{0}** was loading, so it was discarded.")]
    Superseded(String),
}

/// Categoría de un error, usada para decidir cómo se presenta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UserInput,
    Resolution,
    Connection,
    Sink,
}

impl PlaybackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaybackError::NotInVoiceChannel
            | PlaybackError::InvalidArgument(_)
            | PlaybackError::NotConnected
            | PlaybackError::QueueFull(_)
            | PlaybackError::Superseded(_) => ErrorKind::UserInput,
            PlaybackError::Resolution(_) => ErrorKind::Resolution,
            PlaybackError::Connection(_) => ErrorKind::Connection,
            PlaybackError::Sink(_) => ErrorKind::Sink,
        }
    }
}

/// Fallos del backend de búsqueda (yt-dlp).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolutionError {
    #[error("No results found for `{0}`.")]
    NoResults(String),

    #[error("Search backend failed: {0}")]
    Backend(String),

    #[error("Search timed out after {}s.", .0.as_secs())]
    Timeout(Duration),

    #[error("Search backend returned an unreadable response: {0}")]
    Malformed(String),
}

/// Fallos de la salida de audio (conexión de voz).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SinkError {
    #[error("no active voice connection")]
    NotConnected,

    #[error("voice connection failed: {0}")]
    Connect(String),

    #[error("audio stream failed: {0}")]
    Stream(String),

    #[error("audio control failed: {0}")]
    Control(String),
}

pub type PlaybackResult<T> = std::result::Result<T, PlaybackError>;
