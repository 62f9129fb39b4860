use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

use crate::audio::{player::PlaybackController, sink::SongbirdSink, store::QueueStore};
use crate::bot::{dispatcher::Dispatcher, events::ChannelAnnouncer, JukeboxBot};
use crate::config::Config;
use crate::sources::YtDlpResolver;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Guild Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    let resolver = Arc::new(YtDlpResolver::new(
        config.ytdlp_path.clone(),
        config.resolve_timeout(),
    ));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&resolver).await;
    }

    match resolver.verify().await {
        Ok(version) => info!("✅ yt-dlp disponible: {}", version),
        Err(e) => warn!("⚠️ yt-dlp no disponible, /play fallará: {:?}", e),
    }

    // Voz y reproducción
    let manager = Songbird::serenity();
    let sink = Arc::new(SongbirdSink::new(manager.clone())?);
    let announcer = Arc::new(ChannelAnnouncer::new(Arc::new(Http::new(
        &config.discord_token,
    ))));
    let controller = Arc::new(PlaybackController::new(
        Arc::new(QueueStore::new()),
        sink,
        announcer.clone(),
        config.max_queue_size,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        controller,
        resolver,
        config.default_volume,
    ));

    // Intents mínimos: guilds y estados de voz
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let token = config.discord_token.clone();
    let handler = JukeboxBot::new(config, dispatcher, announcer);

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird_with(manager)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("⚠️ Señal de shutdown recibida, cerrando...");
                shard_manager.shutdown_all().await;
            }
            Err(e) => error!("Error al registrar Ctrl+C: {:?}", e),
        }
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check(resolver: &YtDlpResolver) -> Result<()> {
    let version = resolver.verify().await?;
    println!("OK (yt-dlp {})", version);
    Ok(())
}
