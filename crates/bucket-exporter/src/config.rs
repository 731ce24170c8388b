use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{ExportError, Result};

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    /// Directory holding the temporary archive (defaults to the platform temp dir)
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct StorageConfig {
    /// AWS region; the standard AWS environment applies when unset
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint URL for S3-compatible services (e.g. MinIO)
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| ExportError::Config(e.to_string()))
    }

    pub fn from_env() -> Result<Self> {
        let region = std::env::var("EXPORTER_REGION")
            .or_else(|_| std::env::var("AWS_REGION"))
            .ok();

        let endpoint = std::env::var("EXPORTER_ENDPOINT").ok();

        let allow_http = match std::env::var("EXPORTER_ALLOW_HTTP") {
            Ok(v) => v.parse::<bool>().map_err(|_| {
                ExportError::Config(format!("EXPORTER_ALLOW_HTTP must be true or false, got '{}'", v))
            })?,
            Err(_) => false,
        };

        let work_dir = std::env::var("EXPORTER_WORK_DIR").ok().map(PathBuf::from);

        Ok(Self {
            storage: StorageConfig {
                region,
                endpoint,
                allow_http,
            },
            work_dir,
        })
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
storage:
  region: eu-west-1
  endpoint: http://localhost:9000
  allow_http: true

work_dir: /scratch
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.storage.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.storage.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.storage.allow_http);
        assert_eq!(config.work_dir(), PathBuf::from("/scratch"));
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{}\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.storage.region.is_none());
        assert!(config.storage.endpoint.is_none());
        assert!(!config.storage.allow_http);
        assert_eq!(config.work_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_config_ignores_unknown_fields() {
        let yaml = r#"
storage:
  region: us-east-1
  multipart: true
retries: 3
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.storage.region.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"storage: [:::").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }
}
