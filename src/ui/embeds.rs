use serenity::{
    all::{Colour, Timestamp},
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{
    audio::{
        player::{Announcement, PlayerReply},
        queue::Track,
    },
    error::{ErrorKind, PlaybackError},
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Guild Jukebox";

/// Texto de respuesta para cada resultado de comando.
pub fn reply_text(reply: &PlayerReply) -> String {
    match reply {
        PlayerReply::Joined { channel, moved: false } => format!("Joined <#{}>", channel),
        PlayerReply::Joined { channel, moved: true } => format!("Moved to <#{}>", channel),
        PlayerReply::AlreadyConnected(channel) => format!("Already connected to <#{}>", channel),
        PlayerReply::Left => "Left the voice channel".to_string(),
        PlayerReply::NotConnected => "Not connected to a voice channel".to_string(),
        PlayerReply::NowPlaying(track) => format!("Now playing: **{}**", track.title()),
        PlayerReply::Queued { track, .. } => format!("Added to queue: **{}**", track.title()),
        PlayerReply::Paused => "Music paused".to_string(),
        PlayerReply::Resumed => "Music resumed".to_string(),
        PlayerReply::Stopped => "Music stopped".to_string(),
        PlayerReply::Skipped { next: Some(track) } => {
            format!("Skipped. Now playing: **{}**", track.title())
        }
        PlayerReply::Skipped { next: None } => "Skipped. The queue is empty".to_string(),
        PlayerReply::NothingPlaying => "No music is playing".to_string(),
        PlayerReply::NothingPaused => "No music is paused".to_string(),
        PlayerReply::VolumeSet(percent) => format!("Volume set to {}%", percent),
        PlayerReply::Queue(titles) => queue_text(titles),
        PlayerReply::Current(Some(track)) => format!("Now playing: **{}**", track.title()),
        PlayerReply::Current(None) => "No music is playing".to_string(),
    }
}

/// Lista numerada de los títulos pendientes.
pub fn queue_text(titles: &[String]) -> String {
    if titles.is_empty() {
        return "Queue is empty".to_string();
    }

    titles
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {}", i + 1, title))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Embed de respuesta a un comando exitoso
pub fn reply_embed(reply: &PlayerReply) -> CreateEmbed {
    let (title, color) = match reply {
        PlayerReply::NowPlaying(_) | PlayerReply::Current(Some(_)) => {
            ("🎵 Now Playing", colors::SUCCESS_GREEN)
        }
        PlayerReply::Queued { .. } => ("✅ Track Added", colors::SUCCESS_GREEN),
        PlayerReply::Queue(_) => ("📋 Queue", colors::INFO_BLUE),
        PlayerReply::Paused | PlayerReply::Resumed | PlayerReply::Skipped { .. } => {
            ("⏯️ Playback", colors::MUSIC_PURPLE)
        }
        PlayerReply::Stopped => ("⏹️ Playback", colors::MUSIC_PURPLE),
        PlayerReply::VolumeSet(_) => ("🔊 Volume", colors::INFO_BLUE),
        PlayerReply::Joined { .. } | PlayerReply::AlreadyConnected(_) | PlayerReply::Left => {
            ("🔌 Voice", colors::INFO_BLUE)
        }
        PlayerReply::NothingPlaying
        | PlayerReply::NothingPaused
        | PlayerReply::NotConnected
        | PlayerReply::Current(None) => ("ℹ️ Nothing to do", colors::NEUTRAL_GRAY),
    };

    let mut embed = CreateEmbed::default()
        .title(title)
        .description(reply_text(reply))
        .color(color);

    if let PlayerReply::NowPlaying(track)
    | PlayerReply::Current(Some(track))
    | PlayerReply::Queued { track, .. } = reply
    {
        embed = track_fields(embed, track);
    }
    if let PlayerReply::Queued { position, .. } = reply {
        embed = embed.field("📋 Position", position.to_string(), true);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn track_fields(mut embed: CreateEmbed, track: &Track) -> CreateEmbed {
    let duration = track
        .duration()
        .map(format_duration)
        .unwrap_or_else(|| "🔴 Live".to_string());

    embed = embed
        .field("⏱️ Duration", duration, true)
        .field("👤 Requested by", format!("<@{}>", track.requested_by()), true)
        .field("🕒 Added", track.added_at().format("%H:%M UTC").to_string(), true);

    if let Some(url) = track.webpage_url() {
        embed = embed.url(url);
    }

    embed
}

/// Crea un embed de error
pub fn error_embed(error: &PlaybackError) -> CreateEmbed {
    let (title, color) = error_style(error.kind());

    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(error.to_string())
        .color(color)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn error_style(kind: ErrorKind) -> (&'static str, Colour) {
    match kind {
        ErrorKind::UserInput => ("Can't do that", colors::WARNING_ORANGE),
        ErrorKind::Resolution => ("Track not found", colors::ERROR_RED),
        ErrorKind::Connection => ("Voice connection failed", colors::ERROR_RED),
        ErrorKind::Sink => ("Playback failed", colors::ERROR_RED),
    }
}

/// Texto de un aviso fuera de comando (auto-play, fallos del stream).
pub fn announcement_text(announcement: &Announcement) -> String {
    match announcement {
        Announcement::NowPlaying(track) => format!("Now playing: **{}**", track.title()),
        Announcement::TrackFailed { title, reason } => {
            format!("Could not play **{}**: {}", title, reason)
        }
    }
}

pub fn announcement_embed(announcement: &Announcement) -> CreateEmbed {
    let embed = match announcement {
        Announcement::NowPlaying(track) => track_fields(
            CreateEmbed::default()
                .title("🎵 Now Playing")
                .color(colors::SUCCESS_GREEN),
            track,
        ),
        Announcement::TrackFailed { .. } => CreateEmbed::default()
            .title("⚠️ Track Failed")
            .color(colors::WARNING_ORANGE),
    };

    embed
        .description(announcement_text(announcement))
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("🎵 Guild Jukebox - Commands")
        .color(colors::INFO_BLUE)
        .description("One queue per server, played in the order it was requested")
        .field(
            "🔌 Voice",
            "• `/join` - Join your voice channel\n\
            • `/leave` - Leave and clear the queue",
            false,
        )
        .field(
            "🎵 Playback",
            "• `/play <query>` - Play a URL or search term\n\
            • `/pause` - Pause playback\n\
            • `/resume` - Resume playback\n\
            • `/skip` - Skip to the next track\n\
            • `/stop` - Stop and clear the queue",
            false,
        )
        .field(
            "📜 Queue",
            "• `/queue` - Show pending tracks\n\
            • `/nowplaying` - Show the current track\n\
            • `/volume <0-100>` - Set the volume",
            false,
        )
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::queue::StreamHandle;
    use crate::error::ResolutionError;
    use pretty_assertions::assert_eq;
    use serenity::model::id::{ChannelId, UserId};

    fn track(title: &str) -> Track {
        Track::new(title, StreamHandle::new("https://cdn.example/a"), UserId::new(1))
    }

    #[test]
    fn test_reply_text_for_core_commands() {
        assert_eq!(
            reply_text(&PlayerReply::NowPlaying(track("Song A"))),
            "Now playing: **Song A**"
        );
        assert_eq!(
            reply_text(&PlayerReply::Queued {
                track: track("Song B"),
                position: 1
            }),
            "Added to queue: **Song B**"
        );
        assert_eq!(reply_text(&PlayerReply::Paused), "Music paused");
        assert_eq!(reply_text(&PlayerReply::Resumed), "Music resumed");
        assert_eq!(reply_text(&PlayerReply::Stopped), "Music stopped");
        assert_eq!(reply_text(&PlayerReply::NothingPlaying), "No music is playing");
        assert_eq!(reply_text(&PlayerReply::NothingPaused), "No music is paused");
        assert_eq!(reply_text(&PlayerReply::VolumeSet(40)), "Volume set to 40%");
        assert_eq!(
            reply_text(&PlayerReply::Joined {
                channel: ChannelId::new(5),
                moved: false
            }),
            "Joined <#5>"
        );
    }

    #[test]
    fn test_queued_embed_carries_position_and_added_time() {
        let track = track("Song B");
        let added = track.added_at().format("%H:%M UTC").to_string();
        let embed = serde_json::to_value(reply_embed(&PlayerReply::Queued { track, position: 3 }))
            .unwrap();

        assert_eq!(embed["description"], "Added to queue: **Song B**");
        let fields: Vec<(String, String)> = embed["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| (f["name"].as_str().unwrap().to_string(), f["value"].as_str().unwrap().to_string()))
            .collect();
        assert!(fields.contains(&("📋 Position".to_string(), "3".to_string())));
        assert!(fields.contains(&("🕒 Added".to_string(), added)));
    }

    #[test]
    fn test_queue_text_is_numbered_in_order() {
        assert_eq!(queue_text(&[]), "Queue is empty");
        assert_eq!(
            queue_text(&["first".to_string(), "second".to_string()]),
            "1. first\n2. second"
        );
    }

    #[test]
    fn test_announcement_text() {
        assert_eq!(
            announcement_text(&Announcement::TrackFailed {
                title: "Broken".into(),
                reason: "audio stream failed: eof".into(),
            }),
            "Could not play **Broken**: audio stream failed: eof"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(65)), "1:05");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
    }

    #[test]
    fn test_error_style_follows_error_kind() {
        let cases = [
            (PlaybackError::NotInVoiceChannel, "Can't do that", colors::WARNING_ORANGE),
            (
                PlaybackError::Resolution(ResolutionError::NoResults("x".into())),
                "Track not found",
                colors::ERROR_RED,
            ),
            (
                PlaybackError::Connection("denied".into()),
                "Voice connection failed",
                colors::ERROR_RED,
            ),
            (
                PlaybackError::Sink(crate::error::SinkError::NotConnected),
                "Playback failed",
                colors::ERROR_RED,
            ),
        ];

        for (error, title, color) in cases {
            assert_eq!(error_style(error.kind()), (title, color), "{error:?}");
        }
    }
}
