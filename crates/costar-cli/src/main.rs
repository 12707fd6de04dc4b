//! `costar` binary: finds the movies two actors played in together.

mod config;
mod exposition;
mod shutdown;
mod status;

use clap::{Parser, Subcommand};
use config::{CacheBackend, CacheConfig, CostarConfig};
use costar_catalog::{
    build_movie_lookup, DetachedWork, FastStore, FileFastStore, InMemoryFastStore,
    KinopoiskCatalog, RedisFastStore,
};
use costar_channels::TelegramGateway;
use costar_core::InMemoryMetrics;
use costar_engine::ConversationEngine;
use costar_session::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "costar", about = "costar: find the movies two actors share")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "costar.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot
    Run {
        /// Status endpoint address (overrides config)
        #[arg(long)]
        status_addr: Option<String>,
    },
    /// Validate the configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = CostarConfig::load(&cli.config).await?;
    config.validate()?;

    match cli.command {
        Commands::CheckConfig => {
            println!("Configuration OK");
            println!("  catalog:   {}", config.kinopoisk.base_url);
            println!("  telegram:  {}", config.telegram.api_base);
            match config.cache.backend {
                CacheBackend::None => println!("  cache:     disabled"),
                CacheBackend::Memory => println!("  cache:     in memory"),
                CacheBackend::File => {
                    println!("  cache:     files in {}", config.cache.dir.display());
                }
                CacheBackend::Redis => {
                    println!(
                        "  cache:     redis at {} (db {})",
                        config.cache.redis.host, config.cache.redis.db
                    );
                }
            }
            if config.status.enabled {
                println!("  status:    http://{}", config.status.addr);
            }
        }
        Commands::Run { status_addr } => {
            let mut config = config;
            if let Some(addr) = status_addr {
                config.status.addr = addr;
            }
            run(config).await?;
        }
    }

    Ok(())
}

async fn run(config: CostarConfig) -> anyhow::Result<()> {
    let metrics = Arc::new(InMemoryMetrics::new());

    let catalog = Arc::new(KinopoiskCatalog::new(
        config.kinopoisk.base_url.clone(),
        config.kinopoisk.token.clone(),
        config.kinopoisk.timeout(),
        metrics.clone(),
    )?);
    let store = open_fast_store(&config.cache).await?;
    let backfill = DetachedWork::new();
    let lookup = build_movie_lookup(catalog, store, metrics.clone(), &backfill);

    let mut telegram = TelegramGateway::new(
        config.telegram.token.clone(),
        config.telegram.event_buffer,
    )
    .with_api_base(config.telegram.api_base.clone())
    .with_poll_timeout(config.telegram.poll_timeout_secs);
    let mut events = telegram
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("Telegram event receiver already taken"))?;
    let telegram = Arc::new(telegram);

    let engine = Arc::new(ConversationEngine::new(
        Arc::new(SessionStore::new()),
        lookup,
        telegram.clone(),
        metrics.clone(),
        config.engine.settings(),
    ));

    if config.status.enabled {
        let listener = tokio::net::TcpListener::bind(&config.status.addr).await?;
        info!(addr = %config.status.addr, "Status endpoint listening");
        let app = status::router(metrics.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "Status endpoint stopped");
            }
        });
    }

    let poller = {
        let telegram = telegram.clone();
        tokio::spawn(async move {
            if let Err(e) = telegram.poll_updates().await {
                error!(error = %e, "Telegram polling stopped");
            }
        })
    };
    info!("costar bot started");

    let shutdown = shutdown::shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    let engine = engine.clone();
                    tokio::spawn(async move { engine.handle(event).await });
                }
                None => {
                    warn!("Event stream closed");
                    break;
                }
            },
            signal = &mut shutdown => {
                info!(signal = ?signal, "Shutdown requested");
                break;
            }
        }
    }

    poller.abort();
    let grace = config.engine.shutdown_grace();
    let notified = engine.broadcast_shutdown(grace).await;
    if tokio::time::timeout(grace, backfill.wait_idle()).await.is_err() {
        warn!(pending = backfill.in_flight(), "Cache backfills abandoned");
    }
    info!(notified, "costar bot stopped");
    Ok(())
}

/// Open the configured movie cache. An unreachable Redis is not fatal: the
/// bot runs uncached instead.
async fn open_fast_store(cache: &CacheConfig) -> anyhow::Result<Option<Arc<dyn FastStore>>> {
    let store: Option<Arc<dyn FastStore>> = match cache.backend {
        CacheBackend::None => None,
        CacheBackend::Memory => Some(Arc::new(InMemoryFastStore::new())),
        CacheBackend::File => Some(Arc::new(FileFastStore::new(cache.dir.clone()).await?)),
        CacheBackend::Redis => match RedisFastStore::connect(&cache.redis.settings()).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, movie lookups will not be cached");
                return Ok(None);
            }
        },
    };
    info!(backend = ?cache.backend, "Movie cache ready");
    Ok(store)
}
