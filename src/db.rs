use std::path::Path;
use std::time::Duration;

use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool};

use crate::config::{self, DatabaseConfig};

/// Opens the SQLite pool described by `cfg`, creating the database file if needed.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let db_url = cfg.url.as_str();
    config::ensure_sqlite_parent_dir(db_url)?;
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!("Creating SQLite database at {}", db_url);
        Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys=ON;").execute(&mut *conn).await?;
                let _ = sqlx::query("PRAGMA busy_timeout=10000;").execute(&mut *conn).await;
                let _ = sqlx::query("PRAGMA temp_store=MEMORY;").execute(&mut *conn).await;
                Ok(())
            })
        })
        .connect(db_url)
        .await?;

    init_db(&pool).await?;
    Ok(pool)
}

/// Database-wide pragmas. Schema is owned by migrations, not created here.
pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // WAL is unavailable for in-memory databases; keep going
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;
    Ok(())
}

/// Applies the sqlx migrations found in `dir`. A missing directory is not an error.
pub async fn run_migrations(pool: &SqlitePool, dir: &str) -> anyhow::Result<usize> {
    let path = Path::new(dir);
    if !path.is_dir() {
        tracing::info!("No migrations directory at {}, skipping", dir);
        return Ok(0);
    }
    let migrator = Migrator::new(path).await?;
    let count = migrator.iter().count();
    migrator.run(pool).await?;
    tracing::info!("Applied migrations from {} ({} known)", dir, count);
    Ok(count)
}

pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
