//! Manifest file sink.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{PersistError, SecretRecord, SecretSink, manifest};

/// Writes the secret manifest to a local file, readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl SecretSink for FileSink {
    async fn persist(&self, record: &SecretRecord) -> Result<(), PersistError> {
        let yaml = manifest::render(record)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await.map_err(|e| self.write_error(e))?;
        // A pre-existing file keeps its old mode on open.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.write_error(e))?;
        }

        file.write_all(yaml.as_bytes()).await.map_err(|e| self.write_error(e))?;
        file.flush().await.map_err(|e| self.write_error(e))?;

        tracing::info!(path = %self.path.display(), fields = record.data.len(), "wrote secret manifest");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
