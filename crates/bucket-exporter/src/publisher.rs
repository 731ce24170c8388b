use bytes::Bytes;
use tracing::{error, info, warn};

use crate::archiver::{ArchiveFile, ArchiveOutcome};
use crate::error::PublishError;
use crate::storage::BucketStore;

pub const ARCHIVES_PREFIX: &str = "archives/";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

pub fn upload_key(archive_name: &str) -> String {
    format!("{}{}", ARCHIVES_PREFIX, archive_name)
}

/// Upload the archive bytes to `archives/<name>`, returning the key written.
pub async fn publish(
    store: &dyn BucketStore,
    bucket: &str,
    archive: &ArchiveFile,
) -> Result<String, PublishError> {
    let content = archive.read().await.map_err(PublishError::Read)?;
    let key = upload_key(&archive.name);
    let size = content.len();

    store
        .put(&key, Bytes::from(content), ZIP_CONTENT_TYPE)
        .await
        .map_err(PublishError::Upload)?;

    info!(bucket = %bucket, key = %key, size, "Archive uploaded");
    Ok(key)
}

#[derive(Debug)]
pub enum Cleanup {
    Removed,
    Failed(std::io::Error),
    /// No archive file was ever created
    Skipped,
}

/// Delete the local archive if one was created
pub async fn cleanup(outcome: &ArchiveOutcome) -> Cleanup {
    let Some(archive) = outcome.archive() else {
        warn!("No archive file was created, nothing to delete");
        return Cleanup::Skipped;
    };

    match archive.remove().await {
        Ok(()) => {
            info!(path = ?archive.path, "Deleted local archive");
            Cleanup::Removed
        }
        Err(e) => {
            error!(path = ?archive.path, error = %e, "Failed to delete local archive");
            Cleanup::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveError;
    use crate::storage::BucketClient;
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectPath;
    use object_store::{Attribute, ObjectStore, ObjectStoreExt};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn archive_at(tmp: &TempDir, name: &str, body: &[u8]) -> ArchiveFile {
        let path = tmp.path().join(name);
        std::fs::write(&path, body).unwrap();
        ArchiveFile {
            path,
            name: name.to_string(),
            entries: 0,
        }
    }

    #[test]
    fn test_upload_key() {
        assert_eq!(upload_key("reports.zip"), "archives/reports.zip");
        assert_eq!(upload_key("reports/2024-01.zip"), "archives/reports/2024-01.zip");
    }

    #[tokio::test]
    async fn test_publish_uploads_bytes_with_content_type() {
        let tmp = TempDir::new().unwrap();
        let archive = archive_at(&tmp, "reports.zip", b"PK\x05\x06");
        let store = Arc::new(InMemory::new());
        let client = BucketClient::from_arc(store.clone());

        let key = publish(&client, "media", &archive).await.unwrap();
        assert_eq!(key, "archives/reports.zip");

        let result = store.get(&ObjectPath::from("archives/reports.zip")).await.unwrap();
        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| v.to_string());
        assert_eq!(content_type.as_deref(), Some(ZIP_CONTENT_TYPE));
        assert_eq!(result.bytes().await.unwrap().as_ref(), b"PK\x05\x06");
    }

    #[tokio::test]
    async fn test_publish_missing_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let archive = ArchiveFile {
            path: tmp.path().join("gone.zip"),
            name: "gone.zip".to_string(),
            entries: 0,
        };
        let client = BucketClient::new(InMemory::new());

        let err = publish(&client, "media", &archive).await.unwrap_err();
        assert!(matches!(err, PublishError::Read(_)));
    }

    #[tokio::test]
    async fn test_cleanup_removes_file() {
        let tmp = TempDir::new().unwrap();
        let archive = archive_at(&tmp, "reports.zip", b"PK");
        let path = archive.path.clone();

        let outcome = ArchiveOutcome::Complete { archive };
        assert!(matches!(cleanup(&outcome).await, Cleanup::Removed));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_removes_partial_file() {
        let tmp = TempDir::new().unwrap();
        let archive = archive_at(&tmp, "reports.zip", b"PK");
        let path = archive.path.clone();

        let outcome = ArchiveOutcome::Partial {
            archive,
            error: ArchiveError::Io(std::io::Error::other("disk full")),
        };
        assert!(matches!(cleanup(&outcome).await, Cleanup::Removed));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_skipped_without_archive() {
        let outcome = ArchiveOutcome::NotStarted {
            error: ArchiveError::Io(std::io::Error::other("read-only filesystem")),
        };
        assert!(matches!(cleanup(&outcome).await, Cleanup::Skipped));
    }

    #[tokio::test]
    async fn test_cleanup_reports_failure() {
        let tmp = TempDir::new().unwrap();
        let outcome = ArchiveOutcome::Complete {
            archive: ArchiveFile {
                path: tmp.path().join("already-gone.zip"),
                name: "already-gone.zip".to_string(),
                entries: 0,
            },
        };
        assert!(matches!(cleanup(&outcome).await, Cleanup::Failed(_)));
    }
}
