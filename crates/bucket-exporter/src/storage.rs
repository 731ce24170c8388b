//! Object storage access
//!
//! [`BucketStore`] is the narrow surface the pipeline needs: list keys, open a
//! content stream, put bytes. [`BucketClient`] implements it on top of any
//! [`ObjectStore`]; [`StorageClient`] is the process-wide handle that hands out
//! a client per bucket.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, ObjectStore, ObjectStoreExt, PutOptions, PutPayload};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::Result;

pub type ContentStream = BoxStream<'static, object_store::Result<Bytes>>;

#[async_trait]
pub trait BucketStore: Send + Sync {
    /// All keys starting with `prefix`, in listing order
    async fn list(&self, prefix: &str) -> object_store::Result<Vec<String>>;

    /// Open a streaming read of the object at `key`
    async fn open(&self, key: &str) -> object_store::Result<ContentStream>;

    /// Store `body` at `key`, overwriting any existing object
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> object_store::Result<()>;
}

/// Bucket-scoped client over an [`ObjectStore`] backend
#[derive(Clone, Debug)]
pub struct BucketClient {
    store: Arc<dyn ObjectStore>,
}

impl BucketClient {
    pub fn new(store: impl ObjectStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_arc(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BucketStore for BucketClient {
    async fn list(&self, prefix: &str) -> object_store::Result<Vec<String>> {
        // object_store lists by path segment; list the enclosing directory and
        // match the raw prefix so "rep" still selects "reports/a.txt". A prefix
        // with no '/' therefore scans the whole bucket.
        let dir = prefix
            .rfind('/')
            .map(|idx| &prefix[..idx])
            .filter(|dir| !dir.is_empty())
            .map(ObjectPath::parse)
            .transpose()?;

        let mut keys = Vec::new();
        let mut scanned = 0usize;
        let mut stream = self.store.list(dir.as_ref());
        while let Some(meta) = stream.next().await {
            let key = meta?.location.to_string();
            scanned += 1;
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }

        debug!(prefix = %prefix, scanned, matched = keys.len(), "Listed objects");
        Ok(keys)
    }

    async fn open(&self, key: &str) -> object_store::Result<ContentStream> {
        // Keys are used as listed; `Path::from` would percent-encode '#', '%', '{' ...
        let path = ObjectPath::parse(key)?;
        let result = self.store.get(&path).await?;
        Ok(result.into_stream())
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> object_store::Result<()> {
        let path = ObjectPath::parse(key)?;
        let mut opts = PutOptions::default();
        opts.attributes
            .insert(Attribute::ContentType, content_type.to_string().into());
        // Content length is sent from the payload size.
        self.store
            .put_opts(&path, PutPayload::from(body), opts)
            .await?;
        Ok(())
    }
}

static SHARED: OnceCell<StorageClient> = OnceCell::new();

/// Process-wide S3 handle. Holds the resolved settings and credentials chain;
/// bucket-scoped clients are derived per request.
#[derive(Debug, Clone)]
pub struct StorageClient {
    builder: AmazonS3Builder,
}

impl StorageClient {
    /// Credentials and defaults come from the standard AWS environment
    /// (`AWS_ACCESS_KEY_ID`, `AWS_REGION`, ...), overridden by `config`.
    pub fn new(config: &StorageConfig) -> Self {
        let mut builder = AmazonS3Builder::from_env();

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        Self { builder }
    }

    /// Returns the process-wide client, building it on first use.
    /// `config` is only read by the first caller.
    pub fn shared(config: &StorageConfig) -> &'static StorageClient {
        SHARED.get_or_init(|| {
            info!(
                region = ?config.region,
                endpoint = ?config.endpoint,
                "Initializing shared storage client"
            );
            StorageClient::new(config)
        })
    }

    pub fn bucket(&self, bucket: &str) -> Result<BucketClient> {
        let store = self.builder.clone().with_bucket_name(bucket).build()?;
        Ok(BucketClient::new(store))
    }
}
