use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::{sync::Semaphore, time::timeout};
use tracing::{debug, info, warn};

use super::{is_url, AudioResolver, Resolved, ResolvedMedia};
use crate::{audio::queue::StreamHandle, error::ResolutionError};

/// Resolver que consulta a yt-dlp y devuelve la URL directa del audio.
pub struct YtDlpResolver {
    binary: String,
    timeout: Duration,
    // Limitar procesos concurrentes para evitar rate limiting
    rate_limiter: Semaphore,
}

/// Información extraída de yt-dlp (`--dump-single-json`)
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    #[serde(rename = "_type")]
    kind: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    entries: Option<Vec<YtDlpInfo>>,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            rate_limiter: Semaphore::new(3),
        }
    }

    /// Verifica que yt-dlp esté instalado y responda
    pub async fn verify(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.binary).arg("--version").output().await?;
        if !output.status.success() {
            anyhow::bail!("yt-dlp no puede ejecutarse correctamente");
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, query: &str) -> Result<Vec<u8>, ResolutionError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| ResolutionError::Backend(e.to_string()))?;

        let mut command = Command::new(&self.binary);
        command
            .args([
                "--dump-single-json",
                "--format",
                "bestaudio/best",
                "--no-playlist",
                "--playlist-items",
                "1",
                "--default-search",
                "ytsearch",
                "--no-warnings",
                "--quiet",
                "--",
                query,
            ])
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                warn!("⏰ Timeout de yt-dlp para: {}", query);
                ResolutionError::Timeout(self.timeout)
            })?
            .map_err(|e| ResolutionError::Backend(format!("could not run yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().last().unwrap_or("unknown error").trim();
            return Err(ResolutionError::Backend(reason.to_string()));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl AudioResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<Resolved, ResolutionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolutionError::NoResults(String::new()));
        }

        if is_url(query) {
            info!("🔗 Resolviendo URL: {}", query);
        } else {
            info!("🔍 Buscando en YouTube: {}", query);
        }

        let raw = self.run(query).await?;
        let resolved = parse_response(query, &raw)?;
        debug!("✅ Resuelto: {:?}", resolved);
        Ok(resolved)
    }
}

/// Convierte la salida JSON de yt-dlp en un resultado tipado.
fn parse_response(query: &str, raw: &[u8]) -> Result<Resolved, ResolutionError> {
    let info: YtDlpInfo =
        serde_json::from_slice(raw).map_err(|e| ResolutionError::Malformed(e.to_string()))?;

    let is_playlist = info.kind.as_deref() == Some("playlist") || info.entries.is_some();
    if !is_playlist {
        return Ok(Resolved::Single(into_media(info)?));
    }

    let playlist = info.title;
    let entry = info
        .entries
        .and_then(|entries| entries.into_iter().next())
        .ok_or_else(|| ResolutionError::NoResults(query.to_string()))?;
    let entry = into_media(entry)?;

    // Una búsqueda también llega como "playlist" de resultados
    if is_url(query) {
        Ok(Resolved::PlaylistEntry { playlist, entry })
    } else {
        Ok(Resolved::Single(entry))
    }
}

fn into_media(info: YtDlpInfo) -> Result<ResolvedMedia, ResolutionError> {
    let stream_url = info
        .url
        .ok_or_else(|| ResolutionError::Malformed("missing stream url".into()))?;

    Ok(ResolvedMedia {
        title: info.title.unwrap_or_else(|| "Unknown title".to_string()),
        stream: StreamHandle::new(stream_url),
        webpage_url: info.webpage_url,
        duration: info
            .duration
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
    })
}
