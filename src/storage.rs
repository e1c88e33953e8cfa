//! S3-compatible object storage wrapper.
//!
//! Backed by `object_store`: `AmazonS3` for real buckets (AWS, MinIO, R2, ...) and
//! `InMemory` for tests and local runs without a bucket.

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectMeta, ObjectStore, PutOptions, PutPayload};
use serde::Serialize;
use uuid::Uuid;

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("presigned URLs are not supported by this storage backend")]
    PresignUnsupported,
    #[error("storage configuration error: {0}")]
    Config(String),
    #[error("storage backend error: {0}")]
    Backend(#[source] object_store::Error),
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StorageError::NotFound(path),
            other => StorageError::Backend(other),
        }
    }
}

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub e_tag: Option<String>,
}

impl From<ObjectMeta> for StoredObject {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            key: meta.location.to_string(),
            size: meta.size as u64,
            last_modified: meta.last_modified,
            e_tag: meta.e_tag,
        }
    }
}

#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    bucket: String,
    public_base: Option<String>,
    presign_expiry: Duration,
}

impl StorageService {
    pub fn from_config(cfg: &StorageConfig) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&cfg.bucket)
            .with_region(&cfg.region)
            .with_allow_http(cfg.allow_http)
            .with_virtual_hosted_style_request(!cfg.force_path_style);
        if let Some(endpoint) = cfg.endpoint.as_deref() {
            builder = builder.with_endpoint(endpoint);
        }
        if let (Some(key_id), Some(secret)) = (cfg.access_key_id.as_deref(), cfg.secret_access_key.as_deref()) {
            builder = builder.with_access_key_id(key_id).with_secret_access_key(secret);
        }
        let s3 = Arc::new(builder.build().map_err(|e| StorageError::Config(e.to_string()))?);
        tracing::info!(bucket = %cfg.bucket, endpoint = ?cfg.endpoint, "S3 storage configured");

        Ok(Self {
            store: s3.clone(),
            signer: Some(s3),
            bucket: cfg.bucket.clone(),
            public_base: public_base(cfg),
            presign_expiry: Duration::from_secs(cfg.presign_expiry_secs.max(1)),
        })
    }

    /// Process-local store; presigned URLs are unavailable.
    pub fn in_memory(bucket: &str) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            signer: None,
            bucket: bucket.to_string(),
            public_base: None,
            presign_expiry: Duration::from_secs(3600),
        }
    }

    pub fn with_public_base(mut self, base: impl Into<String>) -> Self {
        self.public_base = Some(base.into().trim_end_matches('/').to_string());
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn path(key: &str) -> Result<ObjectPath, StorageError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key must not be empty".to_string()));
        }
        ObjectPath::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))
    }

    pub async fn upload(&self, key: &str, body: Bytes, content_type: Option<&str>) -> Result<StoredObject, StorageError> {
        let path = Self::path(key)?;
        let size = body.len() as u64;
        let mut attributes = Attributes::new();
        if let Some(ct) = content_type {
            attributes.insert(Attribute::ContentType, ct.to_string().into());
        }
        let opts = PutOptions { attributes, ..Default::default() };
        let result = self.store.put_opts(&path, PutPayload::from(body), opts).await?;
        tracing::debug!(key = %path, size, "object uploaded");
        Ok(StoredObject { key: path.to_string(), size, last_modified: Utc::now(), e_tag: result.e_tag })
    }

    pub async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = Self::path(key)?;
        let bytes = self.store.get(&path).await?.bytes().await?;
        Ok(bytes)
    }

    pub async fn head(&self, key: &str) -> Result<StoredObject, StorageError> {
        let path = Self::path(key)?;
        Ok(self.store.head(&path).await?.into())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = Self::path(key)?;
        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// All objects under `prefix` (recursive), sorted by key.
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<StoredObject>, StorageError> {
        let prefix = match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(p) => Some(Self::path(p)?),
            None => None,
        };
        let mut objects: Vec<StoredObject> =
            self.store.list(prefix.as_ref()).map_ok(StoredObject::from).try_collect().await?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    pub async fn presigned_download_url(&self, key: &str, expires_in: Option<Duration>) -> Result<String, StorageError> {
        self.presign(Method::GET, key, expires_in).await
    }

    pub async fn presigned_upload_url(&self, key: &str, expires_in: Option<Duration>) -> Result<String, StorageError> {
        self.presign(Method::PUT, key, expires_in).await
    }

    async fn presign(&self, method: Method, key: &str, expires_in: Option<Duration>) -> Result<String, StorageError> {
        let signer = self.signer.as_ref().ok_or(StorageError::PresignUnsupported)?;
        let path = Self::path(key)?;
        let url = signer.signed_url(method, &path, expires_in.unwrap_or(self.presign_expiry)).await?;
        Ok(url.to_string())
    }

    /// Public URL of `key`, when a public base URL is configured.
    pub fn public_url(&self, key: &str) -> Option<String> {
        let base = self.public_base.as_deref()?;
        Some(format!("{}/{}", base, key.trim_start_matches('/')))
    }

    /// Connectivity check: lists the bucket root.
    pub async fn ping(&self) -> Result<(), StorageError> {
        self.store.list_with_delimiter(None).await?;
        Ok(())
    }
}

fn public_base(cfg: &StorageConfig) -> Option<String> {
    if let Some(url) = cfg.public_url.as_deref() {
        return Some(url.trim_end_matches('/').to_string());
    }
    // Path-style endpoints (MinIO and friends) serve objects at {endpoint}/{bucket}/{key}
    match (cfg.endpoint.as_deref(), cfg.force_path_style) {
        (Some(endpoint), true) => Some(format!("{}/{}", endpoint.trim_end_matches('/'), cfg.bucket)),
        _ => None,
    }
}

/// Unique key for an uploaded file: `{folder}/{uuid}-{sanitized filename}`.
pub fn generate_key(folder: &str, filename: &str) -> String {
    let name: String = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '-' })
        .collect();
    let name = name.trim_matches(|c: char| c == '.' || c == '-');
    let name = if name.is_empty() { "file" } else { name };
    let folder = folder.trim_matches('/');
    let id = Uuid::new_v4();
    if folder.is_empty() {
        format!("{}-{}", id, name)
    } else {
        format!("{}/{}-{}", folder, id, name)
    }
}
