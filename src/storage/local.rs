use bytes::Bytes;
use std::io::ErrorKind;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::path_guard::{ConfinedPath, PathGuard};

/// Flat local directory holding one container file per record
#[derive(Debug, Clone)]
pub struct LocalStorage {
    guard: PathGuard,
}

impl LocalStorage {
    pub fn new(guard: PathGuard) -> Self {
        Self { guard }
    }

    /// Confine a storage name to the upload root
    pub async fn resolve(&self, storage_name: &str) -> Result<ConfinedPath> {
        self.guard.resolve(storage_name).await
    }

    /// Write a new file. Fails rather than overwrite an existing one; a partial
    /// file left by a failed write is removed before the error is returned.
    pub async fn put_new(&self, path: &ConfinedPath, data: &[u8]) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let written = async {
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(path).await {
                tracing::error!("Failed to remove partial file {:?}: {}", path.as_path(), cleanup);
            }
            return Err(e.into());
        }

        tracing::debug!("Saved file to {:?}", path.as_path());
        Ok(())
    }

    pub async fn get(&self, path: &ConfinedPath) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::NotFound("File not found".to_string())
            } else {
                AppError::StorageIo(e)
            }
        })?;

        Ok(Bytes::from(data))
    }

    /// Remove a file. Returns `false` when it was already gone.
    pub async fn delete(&self, path: &ConfinedPath) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!("Deleted file {:?}", path.as_path());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, path: &ConfinedPath) -> Result<bool> {
        Ok(fs::try_exists(path).await?)
    }
}
