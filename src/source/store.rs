//! Object store backed source (S3, R2, GCS, Azure, local filesystem)

use super::{ObjectInfo, ObjectSource, RateLimiter};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

/// Object source over any `object_store` backend
#[derive(Debug, Clone)]
pub struct StoreSource {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Key prefix to list under
    prefix: Option<ObjectPath>,
    /// Original URL for logging and checkpoint keys
    url: String,
    /// Original URL scheme
    scheme: String,
    /// Optional download throttle
    limiter: Option<RateLimiter>,
}

impl StoreSource {
    /// Wrap an existing store
    pub fn new(store: Arc<dyn ObjectStore>, url: impl Into<String>) -> Self {
        Self {
            store,
            prefix: None,
            url: url.into(),
            scheme: "memory".to_string(),
            limiter: None,
        }
    }

    /// Only list objects below `prefix`
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        self.prefix = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));
        self
    }

    /// Throttle downloads
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Parse a source URL and create the matching object store
    ///
    /// Supported formats:
    /// - `s3://bucket/prefix/` - AWS S3
    /// - `r2://bucket/prefix/` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket/prefix/` - Google Cloud Storage
    /// - `az://container/prefix/` - Azure Blob Storage
    /// - `/local/path/` or `file:///local/path/` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if url.starts_with("s3://") {
            Self::parse_s3(url, false)
        } else if url.starts_with("r2://") {
            Self::parse_s3(url, true)
        } else if url.starts_with("gs://") {
            Self::parse_gcs(url)
        } else if url.starts_with("az://") {
            Self::parse_azure(url)
        } else {
            Self::parse_local(url)
        }
    }

    /// Parse S3 or R2 URL
    fn parse_s3(url: &str, is_r2: bool) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        let (bucket, prefix) = split_bucket(url, scheme)?;

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        // R2 endpoint: https://<account_id>.r2.cloudflarestorage.com
        // AWS_ENDPOINT is read by from_env(); R2_ENDPOINT_URL takes precedence
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self::from_parts(Arc::new(store), url, scheme, prefix))
    }

    /// Parse GCS URL
    fn parse_gcs(url: &str) -> Result<Self> {
        let (bucket, prefix) = split_bucket(url, "gs")?;

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self::from_parts(Arc::new(store), url, "gs", prefix))
    }

    /// Parse Azure Blob URL
    fn parse_azure(url: &str) -> Result<Self> {
        let (container, prefix) = split_bucket(url, "az")?;

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self::from_parts(Arc::new(store), url, "az", prefix))
    }

    /// Parse local filesystem path
    fn parse_local(url: &str) -> Result<Self> {
        let path = url.strip_prefix("file://").unwrap_or(url);

        if !std::path::Path::new(path).is_dir() {
            return Err(Error::config(format!(
                "Source directory does not exist: {path}"
            )));
        }

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self::from_parts(Arc::new(store), url, "file", ""))
    }

    fn from_parts(store: Arc<dyn ObjectStore>, url: &str, scheme: &str, prefix: &str) -> Self {
        let mut source = Self::new(store, url).with_prefix(prefix);
        source.scheme = scheme.to_string();
        source
    }

    /// Get the scheme (s3, r2, gs, az, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Check if this is a cloud source (not local)
    pub fn is_cloud(&self) -> bool {
        !matches!(self.scheme.as_str(), "file" | "memory")
    }
}

/// Split `scheme://bucket/prefix` into bucket and prefix
pub(super) fn split_bucket<'a>(url: &'a str, scheme: &str) -> Result<(&'a str, &'a str)> {
    let without_scheme = url
        .strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix("://"))
        .ok_or_else(|| Error::config(format!("Invalid {scheme} URL: {url}")))?;

    let (bucket, prefix) = without_scheme
        .split_once('/')
        .unwrap_or((without_scheme, ""));

    if bucket.is_empty() {
        return Err(Error::config(format!("Missing bucket in URL: {url}")));
    }
    Ok((bucket, prefix))
}

#[async_trait]
impl ObjectSource for StoreSource {
    async fn list(&self) -> Result<Vec<ObjectInfo>> {
        let metas: Vec<_> = self.store.list(self.prefix.as_ref()).try_collect().await?;

        Ok(metas
            .into_iter()
            .map(|meta| ObjectInfo {
                name: meta.location.to_string(),
                modified: meta.last_modified,
                size: meta.size as u64,
            })
            .collect())
    }

    async fn fetch(&self, name: &str) -> Result<Bytes> {
        if let Some(limiter) = &self.limiter {
            let waited = limiter.wait().await;
            if !waited.is_zero() {
                debug!(
                    object = name,
                    waited_ms = waited.as_millis() as u64,
                    "Download throttled"
                );
            }
        }

        // Listed names are already in encoded form
        let location = ObjectPath::parse(name)
            .map_err(|e| Error::processing(name, format!("Invalid object path: {e}")))?;
        let body = self.store.get(&location).await?.bytes().await?;
        Ok(body)
    }

    fn url(&self) -> &str {
        &self.url
    }
}
