use tracing::info;

use crate::storage::BucketStore;
use crate::Result;

/// List every key under `prefix`, dropping the directory marker (the key equal to `prefix`).
pub async fn list_keys(store: &dyn BucketStore, bucket: &str, prefix: &str) -> Result<Vec<String>> {
    let keys: Vec<String> = store
        .list(prefix)
        .await?
        .into_iter()
        .filter(|key| key != prefix)
        .collect();

    info!(bucket = %bucket, prefix = %prefix, count = keys.len(), "Listed object keys");
    Ok(keys)
}
