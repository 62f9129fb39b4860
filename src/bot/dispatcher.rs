use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    audio::{
        player::{PlaybackController, PlayerReply},
        queue::Track,
    },
    error::PlaybackResult,
    sources::{AudioResolver, Resolved},
};

/// Comandos de usuario ya parseados.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join,
    Leave,
    Play { query: String },
    Pause,
    Resume,
    Stop,
    Skip,
    Queue,
    NowPlaying,
    Volume { percent: i64 },
}

/// Quién pide el comando y desde dónde.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    pub guild_id: GuildId,
    pub user_id: UserId,
    /// Canal de voz en el que está el usuario, si está en alguno.
    pub user_channel: Option<ChannelId>,
}

/// Enruta cada comando a exactamente una operación del controlador.
pub struct Dispatcher {
    controller: Arc<PlaybackController>,
    resolver: Arc<dyn AudioResolver>,
    default_volume: f32,
}

impl Dispatcher {
    pub fn new(
        controller: Arc<PlaybackController>,
        resolver: Arc<dyn AudioResolver>,
        default_volume: f32,
    ) -> Self {
        Self {
            controller,
            resolver,
            default_volume,
        }
    }

    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.controller
    }

    pub async fn dispatch(&self, ctx: CommandContext, command: Command) -> PlaybackResult<PlayerReply> {
        debug!("Despachando {:?} en guild {}", command, ctx.guild_id);
        let guild_id = ctx.guild_id;

        match command {
            Command::Join => self.controller.join(guild_id, ctx.user_channel).await,
            Command::Leave => self.controller.leave(guild_id).await,
            Command::Play { query } => self.play(ctx, &query).await,
            Command::Pause => self.controller.pause(guild_id).await,
            Command::Resume => self.controller.resume(guild_id).await,
            Command::Stop => self.controller.stop(guild_id).await,
            Command::Skip => self.controller.skip(guild_id).await,
            Command::Queue => Ok(PlayerReply::Queue(self.controller.queue_list(guild_id).await)),
            Command::NowPlaying => Ok(PlayerReply::Current(
                self.controller.now_playing(guild_id).await,
            )),
            Command::Volume { percent } => self.controller.set_volume(guild_id, percent).await,
        }
    }

    async fn play(&self, ctx: CommandContext, query: &str) -> PlaybackResult<PlayerReply> {
        if self.controller.current_channel(ctx.guild_id).await.is_none() {
            self.controller.join(ctx.guild_id, ctx.user_channel).await?;
        } else if ctx.user_channel.is_none() {
            return Err(crate::error::PlaybackError::NotInVoiceChannel);
        }

        // Se resuelve sin lock; la generación detecta un leave/join intermedio
        let generation = self.controller.generation(ctx.guild_id).await;
        let resolved = self.resolver.resolve(query).await?;
        if let Resolved::PlaylistEntry { playlist, .. } = &resolved {
            info!(
                "📋 Playlist '{}': se reproduce sólo la primera entrada",
                playlist.as_deref().unwrap_or("sin título")
            );
        }
        let media = resolved.into_media();
        info!("🎶 Resuelto '{}' → {}", query, media.title);

        let track = Track::from_media(media, ctx.user_id, self.default_volume);
        self.controller
            .enqueue_or_play(ctx.guild_id, track, generation)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{
            player::Announcement,
            queue::StreamHandle,
            store::QueueStore,
            testing::{FakeSink, RecordingAnnouncer},
        },
        error::{PlaybackError, ResolutionError},
        sources::{MockAudioResolver, ResolvedMedia},
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    const GUILD: GuildId = GuildId::new(10);
    const VOICE: ChannelId = ChannelId::new(20);

    fn ctx() -> CommandContext {
        CommandContext {
            guild_id: GUILD,
            user_id: UserId::new(30),
            user_channel: Some(VOICE),
        }
    }

    fn media(title: &str) -> ResolvedMedia {
        ResolvedMedia {
            title: title.to_string(),
            stream: StreamHandle::new(format!("https://cdn.example/{title}")),
            webpage_url: None,
            duration: None,
        }
    }

    fn setup(
        resolver: Arc<dyn AudioResolver>,
    ) -> (Dispatcher, Arc<FakeSink>, Arc<RecordingAnnouncer>) {
        let sink = Arc::new(FakeSink::default());
        let announcer = Arc::new(RecordingAnnouncer::default());
        let controller = Arc::new(PlaybackController::new(
            Arc::new(QueueStore::new()),
            sink.clone(),
            announcer.clone(),
            100,
        ));
        (Dispatcher::new(controller, resolver, 0.5), sink, announcer)
    }

    fn echo_resolver() -> MockAudioResolver {
        let mut resolver = MockAudioResolver::new();
        resolver
            .expect_resolve()
            .returning(|query| Ok(Resolved::Single(media(query))));
        resolver
    }

    fn title(reply: &PlayerReply) -> Option<&str> {
        match reply {
            PlayerReply::NowPlaying(track) | PlayerReply::Queued { track, .. } => Some(track.title()),
            _ => None,
        }
    }

    fn play(query: &str) -> Command {
        Command::Play {
            query: query.to_string(),
        }
    }

    #[tokio::test]
    async fn test_play_joins_and_plays_then_queues() {
        let (dispatcher, sink, announcer) = setup(Arc::new(echo_resolver()));

        let first = dispatcher.dispatch(ctx(), play("Song A")).await.unwrap();
        assert!(matches!(first, PlayerReply::NowPlaying(_)));
        assert_eq!(title(&first), Some("Song A"));

        let second = dispatcher.dispatch(ctx(), play("Song B")).await.unwrap();
        assert!(matches!(second, PlayerReply::Queued { position: 1, .. }));
        assert_eq!(title(&second), Some("Song B"));

        assert_eq!(
            dispatcher.dispatch(ctx(), Command::Queue).await.unwrap(),
            PlayerReply::Queue(vec!["Song B".to_string()])
        );

        sink.finish(GUILD, None).await;
        assert!(matches!(
            announcer.events().as_slice(),
            [Announcement::NowPlaying(track)] if track.title() == "Song B"
        ));
    }

    #[tokio::test]
    async fn test_playlist_plays_first_entry_only() {
        let mut resolver = MockAudioResolver::new();
        resolver.expect_resolve().times(1).returning(|_| {
            Ok(Resolved::PlaylistEntry {
                playlist: Some("Mix".into()),
                entry: media("Opening"),
            })
        });
        let (dispatcher, _, _) = setup(Arc::new(resolver));

        let reply = dispatcher
            .dispatch(ctx(), play("https://www.youtube.com/playlist?list=x"))
            .await
            .unwrap();

        assert_eq!(title(&reply), Some("Opening"));
        assert!(dispatcher.controller().queue_list(GUILD).await.is_empty());
    }

    #[tokio::test]
    async fn test_play_outside_voice_channel_does_not_resolve() {
        let mut resolver = MockAudioResolver::new();
        resolver.expect_resolve().never();
        let (dispatcher, sink, _) = setup(Arc::new(resolver));

        let mut lonely = ctx();
        lonely.user_channel = None;
        let err = dispatcher.dispatch(lonely, play("anything")).await.unwrap_err();

        assert!(matches!(err, PlaybackError::NotInVoiceChannel));
        assert!(sink.played().is_empty());
    }

    #[tokio::test]
    async fn test_resolution_error_keeps_playback() {
        let mut resolver = MockAudioResolver::new();
        resolver.expect_resolve().returning(|query| match query {
            "good" => Ok(Resolved::Single(media("good"))),
            other => Err(ResolutionError::NoResults(other.to_string())),
        });
        let (dispatcher, _, _) = setup(Arc::new(resolver));

        dispatcher.dispatch(ctx(), play("good")).await.unwrap();
        let err = dispatcher.dispatch(ctx(), play("missing")).await.unwrap_err();

        assert!(matches!(err, PlaybackError::Resolution(ResolutionError::NoResults(_))));
        assert_eq!(
            dispatcher.controller().now_playing(GUILD).await.map(|t| t.title().to_string()),
            Some("good".to_string())
        );
    }

    #[tokio::test]
    async fn test_volume_out_of_range_is_rejected() {
        let (dispatcher, _, _) = setup(Arc::new(echo_resolver()));
        let err = dispatcher
            .dispatch(ctx(), Command::Volume { percent: 150 })
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidArgument(_)));
    }

    /// Resolver que espera una señal antes de responder.
    struct GatedResolver {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl AudioResolver for GatedResolver {
        async fn resolve(&self, query: &str) -> Result<Resolved, ResolutionError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(Resolved::Single(media(query)))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_leave_during_resolution_discards_result() {
        let resolver = Arc::new(GatedResolver {
            started: Notify::new(),
            release: Notify::new(),
        });
        let (dispatcher, sink, _) = setup(resolver.clone());
        let dispatcher = Arc::new(dispatcher);

        let pending = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(ctx(), play("slow song")).await })
        };

        resolver.started.notified().await;
        assert_eq!(
            dispatcher.dispatch(ctx(), Command::Leave).await.unwrap(),
            PlayerReply::Left
        );
        dispatcher.dispatch(ctx(), Command::Join).await.unwrap();
        resolver.release.notify_one();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, PlaybackError::Superseded(_)));
        assert!(sink.played().is_empty());
        assert!(dispatcher.controller().snapshot(GUILD).await.is_empty());
    }
}
