use std::sync::Arc;

use crate::cache::CacheService;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::storage::StorageService;

/// The shared application state.
///
/// Cloned into every handler and stateful middleware. The cache and storage clients are
/// optional: they are `None` when disabled in configuration, and handlers that need them
/// should answer with `AppError::ServiceUnavailable`.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: sqlx::SqlitePool,
    pub cache: Option<CacheService>,
    pub storage: Option<StorageService>,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        Self { db, cache: None, storage: None, config: Arc::new(config), metrics: Metrics::new() }
    }

    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_storage(mut self, storage: StorageService) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn cache(&self) -> Result<&CacheService, crate::error::AppError> {
        self.cache
            .as_ref()
            .ok_or_else(|| crate::error::AppError::ServiceUnavailable("cache is not configured".to_string()))
    }

    pub fn storage(&self) -> Result<&StorageService, crate::error::AppError> {
        self.storage
            .as_ref()
            .ok_or_else(|| crate::error::AppError::ServiceUnavailable("storage is not configured".to_string()))
    }
}
