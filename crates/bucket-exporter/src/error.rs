use thiserror::Error;

/// Errors that fail an invocation
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("Invalid request: {0}")]
    Request(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while writing the archive. Logged, never surfaced to the caller.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("ZIP error: {0}")]
    Zip(#[from] async_zip::error::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed reading content of '{key}': {source}")]
    Stream {
        key: String,
        #[source]
        source: object_store::Error,
    },
}

/// Errors raised while publishing the archive. An upload failure fails the
/// invocation; a read failure is logged only.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to read archive: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to upload archive: {0}")]
    Upload(#[source] object_store::Error),
}
