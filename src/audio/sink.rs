use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input},
    tracks::{ControlError, PlayMode, Track as VoiceTrack, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::{
    player::{AudioSink, OnFinished},
    queue::Track,
};
use crate::error::SinkError;

/// Salida de audio sobre Songbird: una `Call` por guild.
pub struct SongbirdSink {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    current_tracks: DashMap<GuildId, TrackHandle>,
}

impl SongbirdSink {
    pub fn new(manager: Arc<Songbird>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            manager,
            http,
            current_tracks: DashMap::new(),
        })
    }

    fn current(&self, guild_id: GuildId) -> Result<TrackHandle, SinkError> {
        self.current_tracks
            .get(&guild_id)
            .map(|handle| handle.clone())
            .ok_or(SinkError::NotConnected)
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), SinkError> {
        self.manager
            .join(guild_id, channel_id)
            .await
            .map(|_| ())
            .map_err(|e| SinkError::Connect(e.to_string()))
    }

    async fn play(
        &self,
        guild_id: GuildId,
        track: &Track,
        on_finished: OnFinished,
    ) -> Result<(), SinkError> {
        let call = self.manager.get(guild_id).ok_or(SinkError::NotConnected)?;

        let request = HttpRequest::new(self.http.clone(), track.stream().url().to_string());
        // Arranca en pausa con el volumen ya aplicado; suena sólo tras armar los eventos
        let handle = {
            let mut call = call.lock().await;
            call.play(
                VoiceTrack::from(Input::from(request))
                    .volume(track.volume())
                    .pause(),
            )
        };

        arm_track(&handle, guild_id, on_finished)?;

        self.current_tracks.insert(guild_id, handle);
        Ok(())
    }

    async fn pause(&self, guild_id: GuildId) -> Result<(), SinkError> {
        self.current(guild_id)?
            .pause()
            .map_err(|e| SinkError::Control(e.to_string()))
    }

    async fn resume(&self, guild_id: GuildId) -> Result<(), SinkError> {
        self.current(guild_id)?
            .play()
            .map_err(|e| SinkError::Control(e.to_string()))
    }

    async fn stop(&self, guild_id: GuildId) -> Result<(), SinkError> {
        if let Some((_, handle)) = self.current_tracks.remove(&guild_id) {
            handle.stop().map_err(|e| SinkError::Control(e.to_string()))?;
        }
        Ok(())
    }

    async fn set_volume(&self, guild_id: GuildId, gain: f32) -> Result<(), SinkError> {
        self.current(guild_id)?
            .set_volume(gain)
            .map_err(|e| SinkError::Control(e.to_string()))
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), SinkError> {
        if let Some((_, handle)) = self.current_tracks.remove(&guild_id) {
            // El track puede haber terminado ya; no es un error
            let _ = handle.stop();
        }

        if self.manager.get(guild_id).is_some() {
            self.manager
                .remove(guild_id)
                .await
                .map_err(|e| SinkError::Connect(e.to_string()))?;
            info!("🔌 Call eliminada para guild {}", guild_id);
        }
        Ok(())
    }
}

/// Operaciones sobre un track recién creado que `arm_track` necesita.
trait StartedTrack {
    fn on_end(&self, event: TrackEvent, notifier: TrackEndNotifier) -> Result<(), ControlError>;
    fn start(&self) -> Result<(), ControlError>;
    fn halt(&self) -> Result<(), ControlError>;
}

impl StartedTrack for TrackHandle {
    fn on_end(&self, event: TrackEvent, notifier: TrackEndNotifier) -> Result<(), ControlError> {
        self.add_event(Event::Track(event), notifier)
    }

    fn start(&self) -> Result<(), ControlError> {
        self.play()
    }

    fn halt(&self) -> Result<(), ControlError> {
        self.stop()
    }
}

/// Registra End y Error y sólo entonces reanuda el track.
///
/// Si algo falla el callback se descarta sin llamarse y el track se detiene,
/// así no queda ningún stream sonando fuera de `current_tracks`.
fn arm_track(
    track: &impl StartedTrack,
    guild_id: GuildId,
    on_finished: OnFinished,
) -> Result<(), SinkError> {
    // El mismo slot para End y Error: el primero que llegue se lo lleva
    let slot = Arc::new(Mutex::new(Some(on_finished)));

    let armed = [TrackEvent::End, TrackEvent::Error]
        .into_iter()
        .try_for_each(|event| {
            track.on_end(
                event,
                TrackEndNotifier {
                    guild_id,
                    slot: slot.clone(),
                },
            )
        })
        .and_then(|()| track.start());

    if let Err(e) = armed {
        slot.lock().take();
        if let Err(stop_err) = track.halt() {
            warn!("⚠️ No se pudo detener el track fallido en guild {}: {:?}", guild_id, stop_err);
        }
        return Err(SinkError::Control(e.to_string()));
    }

    Ok(())
}

/// Handler para cuando termina (o falla) un track
struct TrackEndNotifier {
    guild_id: GuildId,
    slot: Arc<Mutex<Option<OnFinished>>>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(SinkError::Stream(format!("{e:?}"))),
                _ => None,
            }),
            _ => None,
        };

        let on_finished = self.slot.lock().take();
        if let Some(on_finished) = on_finished {
            debug!("Track terminado en guild {}, avanzando cola...", self.guild_id);
            on_finished(error).await;
        }

        Some(Event::Cancel)
    }
}
