//! Redis cache client wrapper.
//!
//! All keys are namespaced with the configured prefix (`{prefix}:{key}`). Every command
//! runs under the configured timeout; a broken connection is dropped and re-established
//! on the next call.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::config::CacheConfig;

const SCAN_BATCH: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("invalid cache url: {0}")]
    InvalidUrl(String),
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache command timed out after {0:?}")]
    Timeout(Duration),
    #[error("cache command failed: {0}")]
    Command(#[source] redis::RedisError),
    #[error("cache value (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    Missing,
    Persistent,
    Expires(Duration),
}

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

#[derive(Clone)]
pub struct CacheService {
    client: redis::Client,
    prefix: String,
    default_ttl: Option<Duration>,
    timeout: Duration,
    conn: Arc<Mutex<Option<MultiplexedConnection>>>,
    counters: Arc<CacheCounters>,
}

impl CacheService {
    /// Builds the client. No connection is opened until the first command.
    pub fn new(cfg: &CacheConfig) -> Result<Self, CacheError> {
        let client = redis::Client::open(cfg.url.as_str()).map_err(|e| CacheError::InvalidUrl(e.to_string()))?;
        let default_ttl = (cfg.default_ttl_secs > 0).then(|| Duration::from_secs(cfg.default_ttl_secs));
        Ok(Self {
            client,
            prefix: cfg.key_prefix.trim_end_matches(':').to_string(),
            default_ttl,
            timeout: Duration::from_millis(cfg.timeout_ms.max(1)),
            conn: Arc::new(Mutex::new(None)),
            counters: Arc::new(CacheCounters::default()),
        })
    }

    /// Full key as stored in Redis.
    pub fn key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = match timeout(self.timeout, self.client.get_multiplexed_async_connection()).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                return Err(CacheError::Unavailable(e.to_string()));
            }
            Err(_) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                return Err(CacheError::Timeout(self.timeout));
            }
        };
        tracing::debug!("Redis connection established");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        self.conn.lock().await.take();
    }

    async fn run<T, F, Fut>(&self, op: F) -> Result<T, CacheError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.connection().await?;
        match timeout(self.timeout, op(conn)).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
                    self.reset().await;
                }
                Err(CacheError::Command(e))
            }
            Err(_) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                self.reset().await;
                Err(CacheError::Timeout(self.timeout))
            }
        }
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let full = self.key(key);
        let value: Option<String> = self.run(|mut conn| async move { conn.get(full).await }).await?;
        let counter = if value.is_some() { &self.counters.hits } else { &self.counters.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    /// Stores `value`; `ttl = None` uses the configured default (which may be "no expiry").
    pub async fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let full = self.key(key);
        let value = value.to_string();
        match ttl.or(self.default_ttl) {
            Some(ttl) => {
                let secs = ttl.as_secs().max(1);
                self.run(|mut conn| async move {
                    let _: () = conn.set_ex(full, value, secs).await?;
                    Ok(())
                })
                .await
            }
            None => {
                self.run(|mut conn| async move {
                    let _: () = conn.set(full, value).await?;
                    Ok(())
                })
                .await
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw, ttl).await
    }

    /// Returns whether the key existed.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let full = self.key(key);
        let removed: i64 = self.run(|mut conn| async move { conn.del(full).await }).await?;
        Ok(removed > 0)
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let full = self.key(key);
        self.run(|mut conn| async move { conn.exists(full).await }).await
    }

    /// Returns false when the key does not exist.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let full = self.key(key);
        let secs = ttl.as_secs().max(1) as i64;
        self.run(|mut conn| async move { conn.expire(full, secs).await }).await
    }

    pub async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError> {
        let full = self.key(key);
        let secs: i64 = self.run(|mut conn| async move { conn.ttl(full).await }).await?;
        Ok(match secs {
            -2 => KeyTtl::Missing,
            -1 => KeyTtl::Persistent,
            s => KeyTtl::Expires(Duration::from_secs(s.max(0) as u64)),
        })
    }

    pub async fn incr(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        let full = self.key(key);
        self.run(|mut conn| async move { conn.incr(full, delta).await }).await
    }

    /// Deletes every key under the prefix matching the glob `pattern`. Returns the count removed.
    pub async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let full_pattern = self.key(pattern);
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let pattern = full_pattern.clone();
            let (next, keys): (u64, Vec<String>) = self
                .run(|mut conn| async move {
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await
                })
                .await?;
            if !keys.is_empty() {
                let n: i64 = self.run(|mut conn| async move { conn.del(keys).await }).await?;
                removed += n.max(0) as u64;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        tracing::debug!(pattern = %full_pattern, removed, "cache keys deleted");
        Ok(removed)
    }

    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// Cache failures never fail the call: reads fall through to `compute` and write
    /// failures are logged.
    pub async fn remember<T, E, F, Fut>(&self, key: &str, ttl: Option<Duration>, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(key, "Cache read failed, computing value: {}", e),
        }
        let value = compute().await?;
        if let Err(e) = self.set_json(key, &value, ttl).await {
            tracing::warn!(key, "Cache write failed: {}", e);
        }
        Ok(value)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let pong: String = self
            .run(|mut conn| async move { redis::cmd("PING").query_async(&mut conn).await })
            .await?;
        if pong.eq_ignore_ascii_case("PONG") {
            Ok(())
        } else {
            Err(CacheError::Unavailable(format!("unexpected PING reply: {}", pong)))
        }
    }
}
