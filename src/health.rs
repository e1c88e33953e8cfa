//! Component health checks.
//!
//! Each backing service gets a [`HealthIndicator`]. [`check_all`] runs them concurrently,
//! each under its own deadline, and folds the results into a [`HealthReport`].

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::cache::CacheService;
use crate::state::AppState;
use crate::storage::StorageService;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn up(latency: Duration) -> Self {
        Self { status: ComponentStatus::Up, latency_ms: latency.as_millis() as u64, message: None }
    }

    pub fn down(latency: Duration, message: impl Into<String>) -> Self {
        Self { status: ComponentStatus::Down, latency_ms: latency.as_millis() as u64, message: Some(message.into()) }
    }

    pub fn is_up(&self) -> bool {
        self.status == ComponentStatus::Up
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub uptime_seconds: u64,
    pub version: String,
    pub details: BTreeMap<String, ComponentHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Ok
    }
}

#[async_trait]
pub trait HealthIndicator: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> ComponentHealth;
}

pub struct DatabaseHealth {
    pool: SqlitePool,
}

impl DatabaseHealth {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthIndicator for DatabaseHealth {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> ComponentHealth {
        let started = Instant::now();
        match crate::db::ping(&self.pool).await {
            Ok(()) => ComponentHealth::up(started.elapsed()),
            Err(e) => ComponentHealth::down(started.elapsed(), e.to_string()),
        }
    }
}

pub struct CacheHealth {
    cache: CacheService,
}

impl CacheHealth {
    pub fn new(cache: CacheService) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl HealthIndicator for CacheHealth {
    fn name(&self) -> &str {
        "cache"
    }

    async fn check(&self) -> ComponentHealth {
        let started = Instant::now();
        match self.cache.ping().await {
            Ok(()) => ComponentHealth::up(started.elapsed()),
            Err(e) => ComponentHealth::down(started.elapsed(), e.to_string()),
        }
    }
}

pub struct StorageHealth {
    storage: StorageService,
}

impl StorageHealth {
    pub fn new(storage: StorageService) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl HealthIndicator for StorageHealth {
    fn name(&self) -> &str {
        "storage"
    }

    async fn check(&self) -> ComponentHealth {
        let started = Instant::now();
        match self.storage.ping().await {
            Ok(()) => ComponentHealth::up(started.elapsed()),
            Err(e) => ComponentHealth::down(started.elapsed(), e.to_string()),
        }
    }
}

/// Indicators for every service configured in `state`.
pub fn indicators(state: &AppState) -> Vec<Box<dyn HealthIndicator>> {
    let mut list: Vec<Box<dyn HealthIndicator>> = vec![Box::new(DatabaseHealth::new(state.db.clone()))];
    if let Some(cache) = state.cache.clone() {
        list.push(Box::new(CacheHealth::new(cache)));
    }
    if let Some(storage) = state.storage.clone() {
        list.push(Box::new(StorageHealth::new(storage)));
    }
    list
}

async fn run_one(indicator: &dyn HealthIndicator, deadline: Duration) -> (String, ComponentHealth) {
    let started = Instant::now();
    let health = match tokio::time::timeout(deadline, indicator.check()).await {
        Ok(health) => health,
        Err(_) => ComponentHealth::down(started.elapsed(), format!("timed out after {} ms", deadline.as_millis())),
    };
    if !health.is_up() {
        tracing::warn!(component = indicator.name(), message = ?health.message, "Health check failed");
    }
    (indicator.name().to_string(), health)
}

/// Runs all indicators concurrently. The report is `error` when any component is down.
pub async fn check_all(indicators: &[Box<dyn HealthIndicator>], uptime_seconds: u64) -> HealthReport {
    check_all_with_timeout(indicators, uptime_seconds, CHECK_TIMEOUT).await
}

pub async fn check_all_with_timeout(
    indicators: &[Box<dyn HealthIndicator>],
    uptime_seconds: u64,
    deadline: Duration,
) -> HealthReport {
    let results = futures::future::join_all(indicators.iter().map(|i| run_one(i.as_ref(), deadline))).await;
    let details: BTreeMap<String, ComponentHealth> = results.into_iter().collect();
    let status = if details.values().all(ComponentHealth::is_up) { OverallStatus::Ok } else { OverallStatus::Error };
    HealthReport { status, uptime_seconds, version: env!("CARGO_PKG_VERSION").to_string(), details }
}
