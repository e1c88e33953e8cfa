use std::net::SocketAddr;

use api_starter::cache::CacheService;
use api_starter::config::{self, LoggingConfig};
use api_starter::state::AppState;
use api_starter::storage::StorageService;
use api_starter::{app, db};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (embedded defaults -> starter.toml -> STARTER_CONFIG -> env/.env)
    let app_cfg = config::load()?;

    // Keep the guards alive so the non-blocking writers flush on exit
    let _log_guards = init_logging(&app_cfg.logging)?;

    let pool = db::connect(&app_cfg.database).await?;
    if let Some(dir) = app_cfg.database.migrations_dir.as_deref() {
        db::run_migrations(&pool, dir).await?;
    }

    let mut state = AppState::new(pool, app_cfg.clone());

    if app_cfg.cache.enabled {
        let cache = CacheService::new(&app_cfg.cache)?;
        match cache.ping().await {
            Ok(()) => info!(url = %app_cfg.cache.url, "Redis cache connected"),
            Err(e) => warn!("Redis cache not reachable at startup, will retry on use: {}", e),
        }
        state = state.with_cache(cache);
    }

    if app_cfg.storage.enabled {
        let storage = StorageService::from_config(&app_cfg.storage)?;
        if let Err(e) = storage.ping().await {
            warn!(bucket = %app_cfg.storage.bucket, "Object storage not reachable at startup: {}", e);
        }
        state = state.with_storage(storage);
    }

    let router = app::build_router(state);

    let port: u16 = app_cfg.server.port;
    let host: String = app_cfg.server.host.clone();
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("api-starter listening on http://{}", listener.local_addr()?);
    if app_cfg.docs.enabled {
        info!("API docs at http://{}{}", listener.local_addr()?, app_cfg.docs.path);
    }
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// stdout + daily rotating file, both non-blocking. `RUST_LOG` overrides `logging.level`.
fn init_logging(cfg: &LoggingConfig) -> anyhow::Result<(WorkerGuard, WorkerGuard)> {
    std::fs::create_dir_all(&cfg.dir)?;
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily(&cfg.dir, &cfg.file_prefix);
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cfg.level.as_str().into());

    let json = cfg.json;
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(stdout_nb.clone())))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(file_nb.clone())))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(stdout_nb)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb)))
        .try_init()?;

    Ok((stdout_guard, file_guard))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler, listening for Ctrl-C only: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
