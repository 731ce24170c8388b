//! Streams listed objects into a local ZIP archive

use std::path::{Path, PathBuf};

use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use futures_util::io::{AsyncWrite, AsyncWriteExt as _};
use futures_util::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::error::ArchiveError;
use crate::storage::{BucketStore, ContentStream};
use crate::Result;

pub const ARCHIVE_EXTENSION: &str = ".zip";

/// `<prefix>.zip`, prefix taken verbatim
pub fn archive_name(prefix: &str) -> String {
    format!("{}{}", prefix, ARCHIVE_EXTENSION)
}

/// Name of `key` inside the archive: the key with a leading `<prefix>/` removed,
/// or the key unchanged when it does not start with `<prefix>/`.
pub fn entry_name<'a>(key: &'a str, prefix: &str) -> &'a str {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(key)
}

/// Local archive produced for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub path: PathBuf,
    pub name: String,
    /// Entries fully written
    pub entries: usize,
}

impl ArchiveFile {
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        fs::read(&self.path).await
    }

    pub async fn remove(&self) -> std::io::Result<()> {
        fs::remove_file(&self.path).await
    }
}

#[derive(Debug)]
pub enum ArchiveOutcome {
    /// The archive file could not be created
    NotStarted { error: ArchiveError },
    /// The file exists but writing stopped early
    Partial {
        archive: ArchiveFile,
        error: ArchiveError,
    },
    Complete { archive: ArchiveFile },
}

impl ArchiveOutcome {
    pub fn archive(&self) -> Option<&ArchiveFile> {
        match self {
            ArchiveOutcome::NotStarted { .. } => None,
            ArchiveOutcome::Partial { archive, .. } | ArchiveOutcome::Complete { archive } => {
                Some(archive)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArchiveOutcome::NotStarted { .. } => "not_started",
            ArchiveOutcome::Partial { .. } => "partial",
            ArchiveOutcome::Complete { .. } => "complete",
        }
    }
}

/// Download every key into `<work_dir>/<prefix>.zip`.
///
/// ZIP and local write failures end the loop and yield [`ArchiveOutcome::Partial`].
/// A failure opening an object is returned as an error, after the file is removed.
pub async fn archive_objects(
    store: &dyn BucketStore,
    bucket: &str,
    prefix: &str,
    keys: &[String],
    work_dir: &Path,
) -> Result<ArchiveOutcome> {
    let name = archive_name(prefix);
    let path = work_dir.join(&name);

    let mut file = match create_file(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!(path = ?path, error = %e, "Failed to create archive file");
            return Ok(ArchiveOutcome::NotStarted { error: e.into() });
        }
    };

    info!(
        bucket = %bucket,
        keys = ?keys,
        archive = %name,
        "Compressing objects"
    );

    let written = write_entries(
        ZipFileWriter::with_tokio(&mut file),
        store,
        bucket,
        prefix,
        keys,
        &name,
    )
    .await;

    let (entries, mut failure) = match written {
        Ok(written) => written,
        Err(e) => {
            drop(file);
            let archive = ArchiveFile { path, name, entries: 0 };
            if let Err(rm) = archive.remove().await {
                error!(path = ?archive.path, error = %rm, "Failed to delete archive file");
            }
            return Err(e);
        }
    };

    if let Err(e) = file.flush().await {
        warn!(archive = %name, error = %e, "Failed to flush archive");
        failure.get_or_insert(e.into());
    }

    let archive = ArchiveFile { path, name, entries };
    match failure {
        None => {
            info!(archive = %archive.name, entries, "Objects compressed");
            Ok(ArchiveOutcome::Complete { archive })
        }
        Some(error) => Ok(ArchiveOutcome::Partial { archive, error }),
    }
}

async fn create_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    File::create(path).await
}

/// Write one entry per key and close the archive. Returns the entries written
/// and the first ZIP or stream failure; a key that cannot be opened is an error.
async fn write_entries<W>(
    mut writer: ZipFileWriter<W>,
    store: &dyn BucketStore,
    bucket: &str,
    prefix: &str,
    keys: &[String],
    name: &str,
) -> Result<(usize, Option<ArchiveError>)>
where
    W: AsyncWrite + Unpin,
{
    let mut entries = 0usize;
    let mut failure: Option<ArchiveError> = None;

    for key in keys {
        let filename = entry_name(key, prefix);

        info!(bucket = %bucket, key = %key, "Downloading object");
        let content = match store.open(key).await {
            Ok(content) => content,
            Err(e) => {
                error!(bucket = %bucket, key = %key, error = %e, "Failed to download object");
                return Err(e.into());
            }
        };

        match add_entry(&mut writer, key, filename, content).await {
            Ok(bytes) => {
                entries += 1;
                info!(key = %key, entry = %filename, bytes, archive = %name, "Object added to archive");
            }
            Err(e) => {
                error!(key = %key, entry = %filename, archive = %name, error = %e, "Failed to add object to archive");
                failure = Some(e);
                break;
            }
        }
    }

    // Close even after a failure so completed entries stay readable.
    if let Err(e) = writer.close().await {
        warn!(archive = %name, error = %e, "Failed to finalize archive");
        failure.get_or_insert(e.into());
    }

    Ok((entries, failure))
}

/// Stream one object into a new Deflate entry, returning bytes copied
async fn add_entry<W>(
    writer: &mut ZipFileWriter<W>,
    key: &str,
    filename: &str,
    mut content: ContentStream,
) -> std::result::Result<u64, ArchiveError>
where
    W: AsyncWrite + Unpin,
{
    let builder = ZipEntryBuilder::new(filename.to_string().into(), Compression::Deflate);
    let mut entry = writer.write_entry_stream(builder).await?;

    let mut copied = 0u64;
    while let Some(chunk) = content.next().await {
        let chunk = chunk.map_err(|source| ArchiveError::Stream {
            key: key.to_string(),
            source,
        })?;
        entry.write_all(&chunk).await?;
        copied += chunk.len() as u64;
    }

    entry.close().await?;
    Ok(copied)
}
