//! File-backed baseline flight batch.

use std::path::{Path, PathBuf};

use insight_core::Flight;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no flight data available")]
    NoData,
    #[error("flight store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("flight store contains invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted flight batch. Writes are serialized; the last one wins.
pub struct FlightStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl FlightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.backup")
    }

    pub async fn load(&self) -> Result<Vec<Flight>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NoData)
            }
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(StoreError::NoData);
        }

        let flights: Vec<Flight> = serde_json::from_slice(&bytes)?;
        if flights.is_empty() {
            return Err(StoreError::NoData);
        }
        Ok(flights)
    }

    /// Replace the baseline atomically, keeping the previous one as a backup.
    pub async fn save(&self, flights: &[Flight]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let payload = serde_json::to_vec_pretty(flights)?;
        let temp = sibling(&self.path, ".tmp");
        fs::write(&temp, payload).await?;

        if fs::try_exists(&self.path).await? {
            fs::copy(&self.path, self.backup_path()).await?;
        }
        fs::rename(&temp, &self.path).await?;

        tracing::info!(path = %self.path.display(), flights = flights.len(), "saved flight batch");
        Ok(())
    }
}
