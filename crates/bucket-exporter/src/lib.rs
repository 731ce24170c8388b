//! bucket-exporter: archive an object-store prefix into a single ZIP
//!
//! Lists every object under a bucket prefix, streams the objects into
//! `<prefix>.zip` in a local work directory, uploads the archive to
//! `archives/<prefix>.zip` in the same bucket and removes the local file.

pub mod archiver;
pub mod config;
pub mod error;
pub mod handler;
pub mod lister;
pub mod publisher;
pub mod request;
pub mod storage;

pub use config::Config;
pub use error::{ArchiveError, ExportError, PublishError};
pub use handler::{export, Exporter};
pub use request::Request;

pub type Result<T> = std::result::Result<T, ExportError>;
