//! Media resolution: turns a user query into a streamable track.
//!
//! The core only depends on the [`AudioResolver`] trait. The production
//! implementation is [`YtDlpResolver`], which shells out to `yt-dlp`.

pub mod youtube;

use async_trait::async_trait;
use std::time::Duration;

use crate::{audio::queue::StreamHandle, error::ResolutionError};

pub use youtube::YtDlpResolver;

/// Contrato del backend de búsqueda. Puede tardar y puede fallar.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Resolved, ResolutionError>;
}

/// Un medio concreto listo para reproducir
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMedia {
    pub title: String,
    pub stream: StreamHandle,
    pub webpage_url: Option<String>,
    pub duration: Option<Duration>,
}

/// Resultado tipado de una resolución, decidido una sola vez en el borde.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Single(ResolvedMedia),
    /// Playlist o búsqueda: sólo se usa la primera entrada.
    PlaylistEntry {
        playlist: Option<String>,
        entry: ResolvedMedia,
    },
}

impl Resolved {
    pub fn into_media(self) -> ResolvedMedia {
        match self {
            Resolved::Single(media) => media,
            Resolved::PlaylistEntry { entry, .. } => entry,
        }
    }
}

/// Distingue URLs de términos de búsqueda.
pub fn is_url(query: &str) -> bool {
    url::Url::parse(query)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_detection() {
        assert!(is_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_url("http://example.com/song.mp3"));
        assert!(!is_url("never gonna give you up"));
        assert!(!is_url("ftp://example.com/song.mp3"));
    }

    #[test]
    fn test_playlist_entry_unwraps_to_first_entry() {
        let media = ResolvedMedia {
            title: "First".into(),
            stream: StreamHandle::new("https://cdn.example/first"),
            webpage_url: None,
            duration: None,
        };
        let resolved = Resolved::PlaylistEntry {
            playlist: Some("Mix".into()),
            entry: media.clone(),
        };
        assert_eq!(resolved.into_media(), media);
    }
}
