#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::db;
    use tempfile::TempDir;

    fn db_config(dir: &TempDir) -> crate::config::DatabaseConfig {
        let mut cfg = AppConfig::default().database;
        cfg.url = format!("sqlite://{}", dir.path().join("data").join("app.db").display());
        cfg.max_connections = 2;
        cfg
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = TempDir::new().unwrap();
        let cfg = db_config(&dir);

        let pool = db::connect(&cfg).await.unwrap();
        assert!(dir.path().join("data").join("app.db").is_file());
        db::ping(&pool).await.unwrap();

        let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys").fetch_one(&pool).await.unwrap();
        assert_eq!(fk, 1);
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode").fetch_one(&pool).await.unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let dir = TempDir::new().unwrap();
        let migrations = dir.path().join("migrations");
        std::fs::create_dir_all(&migrations).unwrap();
        std::fs::write(
            migrations.join("20240101000000_create_notes.sql"),
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL);",
        )
        .unwrap();

        let pool = db::connect(&db_config(&dir)).await.unwrap();
        let applied = db::run_migrations(&pool, migrations.to_str().unwrap()).await.unwrap();
        assert_eq!(applied, 1);

        sqlx::query("INSERT INTO notes (body) VALUES ('hi')").execute(&pool).await.unwrap();
        // re-running is a no-op
        db::run_migrations(&pool, migrations.to_str().unwrap()).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes").fetch_one(&pool).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_missing_migrations_dir_is_skipped() {
        let dir = TempDir::new().unwrap();
        let pool = db::connect(&db_config(&dir)).await.unwrap();
        let missing = dir.path().join("does-not-exist");
        assert_eq!(db::run_migrations(&pool, missing.to_str().unwrap()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ping_fails_on_closed_pool() {
        let dir = TempDir::new().unwrap();
        let pool = db::connect(&db_config(&dir)).await.unwrap();
        pool.close().await;
        assert!(db::ping(&pool).await.is_err());
    }
}
