//! # Audio Module
//!
//! Per-guild playback queue and sequencing engine.
//!
//! ## Architecture
//!
//! ### [`store`] - Guild Store
//! - One slot per guild, created lazily, never shared across guilds
//! - Each slot holds the guild's queue and player state behind one lock
//!
//! ### [`queue`] - Queue Management
//! - Strict FIFO of pending tracks plus the track playing now
//!
//! ### [`player`] - Playback Controller
//! - State machine `Idle → Connecting → Playing ⇄ Paused → Idle`
//! - Owns the track-end callback and chains the next track
//! - Tickets and generations discard completions and resolutions that
//!   belong to a connection that no longer exists
//!
//! ### [`sink`] - Voice Output
//! - Songbird implementation of [`player::AudioSink`]
//!
//! ## Concurrency
//!
//! Commands and track-end events for the same guild serialize on that guild's
//! `tokio::sync::Mutex`. Network I/O for resolving a track happens before the
//! lock is taken; only the enqueue-or-play decision runs under it.

pub mod player;
pub mod queue;
pub mod sink;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
