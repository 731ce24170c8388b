//! Invocation entry point: list, archive, publish, clean up

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::archiver::{archive_objects, ArchiveOutcome};
use crate::config::Config;
use crate::error::PublishError;
use crate::lister::list_keys;
use crate::publisher::{cleanup, publish, Cleanup};
use crate::request::Request;
use crate::storage::{BucketStore, StorageClient};
use crate::Result;

/// Runs invocations against the process-wide storage client
pub struct Exporter {
    client: &'static StorageClient,
    work_dir: PathBuf,
}

impl Exporter {
    pub fn new(config: &Config) -> Self {
        Self {
            client: StorageClient::shared(&config.storage),
            work_dir: config.work_dir(),
        }
    }

    /// Handle one raw invocation payload, returning the archive name
    pub async fn handle(&self, payload: serde_json::Value) -> Result<String> {
        let request = Request::from_value(payload)?;
        self.run(&request).await
    }

    pub async fn run(&self, request: &Request) -> Result<String> {
        let bucket = self.client.bucket(&request.bucket)?;
        export(&bucket, request, &self.work_dir).await
    }
}

/// Export `request.prefix` of `store` into `archives/<prefix>.zip`.
///
/// Listing, object-open and upload failures are returned as errors. Archive
/// failures and failures reading the local archive are logged only; the
/// returned name is empty when no archive file could be created. The local
/// archive is always deleted before returning.
pub async fn export(store: &dyn BucketStore, request: &Request, work_dir: &Path) -> Result<String> {
    let Request { bucket, prefix } = request;
    info!(bucket = %bucket, prefix = %prefix, "Export started");

    let keys = list_keys(store, bucket, prefix).await?;
    let outcome = archive_objects(store, bucket, prefix, &keys, work_dir).await?;

    match &outcome {
        ArchiveOutcome::NotStarted { error } => {
            error!(bucket = %bucket, prefix = %prefix, error = %error, "Error while zipping objects");
        }
        ArchiveOutcome::Partial { archive, error } => {
            error!(
                bucket = %bucket,
                archive = %archive.name,
                entries = archive.entries,
                error = %error,
                "Error while zipping objects, uploading incomplete archive"
            );
        }
        ArchiveOutcome::Complete { .. } => {}
    }

    let mut name = String::new();
    let mut uploaded = false;
    let mut upload_error = None;
    if let Some(archive) = outcome.archive() {
        name = archive.name.clone();
        match publish(store, bucket, archive).await {
            Ok(_) => uploaded = true,
            Err(PublishError::Read(e)) => {
                error!(bucket = %bucket, archive = %archive.name, error = %e, "Failed to read archive");
            }
            Err(PublishError::Upload(e)) => {
                error!(bucket = %bucket, archive = %archive.name, error = %e, "Failed to upload archive");
                upload_error = Some(e);
            }
        }
    }

    let cleaned = cleanup(&outcome).await;

    info!(
        bucket = %bucket,
        prefix = %prefix,
        keys = keys.len(),
        outcome = outcome.label(),
        uploaded,
        cleaned_up = matches!(cleaned, Cleanup::Removed),
        archive = %name,
        "Export finished"
    );

    if let Some(e) = upload_error {
        return Err(e.into());
    }
    Ok(name)
}
