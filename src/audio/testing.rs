//! Fakes de salida de audio y anuncios para tests sin sesión de Discord.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::collections::{HashMap, HashSet};

use super::{
    player::{Announcement, Announcer, AudioSink, OnFinished},
    queue::{StreamHandle, Track},
};
use crate::error::SinkError;

pub fn track(title: &str) -> Track {
    Track::new(
        title,
        StreamHandle::new(format!("https://cdn.example/{}", title.replace(' ', "-"))),
        UserId::new(7),
    )
}

#[derive(Default)]
struct FakeSinkState {
    connected: HashMap<GuildId, ChannelId>,
    active: HashMap<GuildId, OnFinished>,
    halted: Vec<OnFinished>,
    played: Vec<String>,
    gains: Vec<f32>,
    overlaps: usize,
    fail_connect: bool,
    fail_play: HashSet<String>,
}

/// Salida en memoria: guarda los callbacks para que el test decida cuándo terminan.
#[derive(Default)]
pub struct FakeSink {
    state: Mutex<FakeSinkState>,
}

impl FakeSink {
    /// Termina el stream activo de la guild. `false` si no había ninguno.
    pub async fn finish(&self, guild_id: GuildId, error: Option<SinkError>) -> bool {
        let callback = self.state.lock().active.remove(&guild_id);
        match callback {
            Some(callback) => {
                callback(error).await;
                true
            }
            None => false,
        }
    }

    /// Dispara con retraso los callbacks de streams detenidos.
    pub async fn fire_halted(&self, error: Option<SinkError>) -> usize {
        let halted: Vec<OnFinished> = self.state.lock().halted.drain(..).collect();
        let count = halted.len();
        for callback in halted {
            callback(error.clone()).await;
        }
        count
    }

    pub fn played(&self) -> Vec<String> {
        self.state.lock().played.clone()
    }

    pub fn overlaps(&self) -> usize {
        self.state.lock().overlaps
    }

    pub fn last_gain(&self) -> Option<f32> {
        self.state.lock().gains.last().copied()
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    pub fn fail_play(&self, title: &str) {
        self.state.lock().fail_play.insert(title.to_string());
    }

    fn halt(&self, guild_id: GuildId) {
        let mut state = self.state.lock();
        if let Some(callback) = state.active.remove(&guild_id) {
            state.halted.push(callback);
        }
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.fail_connect {
            return Err(SinkError::Connect("missing permissions".into()));
        }
        state.connected.insert(guild_id, channel_id);
        Ok(())
    }

    async fn play(
        &self,
        guild_id: GuildId,
        track: &Track,
        on_finished: OnFinished,
    ) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if !state.connected.contains_key(&guild_id) {
            return Err(SinkError::NotConnected);
        }
        if state.fail_play.contains(track.title()) {
            return Err(SinkError::Stream("unsupported format".into()));
        }
        if state.active.insert(guild_id, on_finished).is_some() {
            state.overlaps += 1;
        }
        state.played.push(track.title().to_string());
        Ok(())
    }

    async fn pause(&self, _guild_id: GuildId) -> Result<(), SinkError> {
        Ok(())
    }

    async fn resume(&self, _guild_id: GuildId) -> Result<(), SinkError> {
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> Result<(), SinkError> {
        self.halt(guild_id);
        Ok(())
    }

    async fn set_volume(&self, _guild_id: GuildId, gain: f32) -> Result<(), SinkError> {
        self.state.lock().gains.push(gain);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), SinkError> {
        self.halt(guild_id);
        self.state.lock().connected.remove(&guild_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAnnouncer {
    events: Mutex<Vec<Announcement>>,
}

impl RecordingAnnouncer {
    pub fn events(&self) -> Vec<Announcement> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, _guild_id: GuildId, announcement: Announcement) {
        self.events.lock().push(announcement);
    }
}
