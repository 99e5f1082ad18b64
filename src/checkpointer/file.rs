//! One JSON file per thread under a directory.
//!
//! Writes go to a temporary file that is synced and renamed over the
//! checkpoint, so a reader never sees a half-written record. Saves of version
//! `n` first create a claim file `.{thread_id}.v{n}.claim` with `create_new`;
//! only one writer, in any process, can hold it, which makes the
//! read-check-rename sequence a compare-and-swap across processes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::{Checkpointer, check_version, validate_thread_id};
use crate::error::CheckpointError;
use crate::types::Checkpoint;

/// Extension of checkpoint files.
pub const CHECKPOINT_EXTENSION: &str = "json";

/// A claim older than this belongs to a writer that died mid-save.
pub const STALE_CLAIM_AFTER: Duration = Duration::from_secs(30);

pub struct FileCheckpointer {
  dir: PathBuf,
  /// Serializes saves within this process; claims cover other processes.
  write_lock: Mutex<()>,
}

/// Held claim on one version of a thread. Removed on drop.
struct Claim {
  path: PathBuf,
}

impl Drop for Claim {
  fn drop(&mut self) {
    let _ = std::fs::remove_file(&self.path);
  }
}

impl FileCheckpointer {
  /// Uses `dir`, creating it on first save.
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      write_lock: Mutex::new(()),
    }
  }

  /// Path of `thread_id`'s checkpoint file.
  pub fn path_for(&self, thread_id: &str) -> PathBuf {
    self.dir.join(format!("{thread_id}.{CHECKPOINT_EXTENSION}"))
  }

  /// Path of the claim a writer of `version` holds while saving.
  pub fn claim_path_for(&self, thread_id: &str, version: u64) -> PathBuf {
    self.dir.join(format!(".{thread_id}.v{version}.claim"))
  }

  async fn read(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
    match tokio::fs::read(self.path_for(thread_id)).await {
      Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  /// Creates the claim for `version`, or `None` when another writer holds it.
  async fn claim(&self, thread_id: &str, version: u64) -> Result<Option<Claim>, CheckpointError> {
    let path = self.claim_path_for(thread_id, version);
    for _ in 0..2 {
      let created = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await;
      match created {
        Ok(_) => return Ok(Some(Claim { path })),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
          if !is_stale(&path).await {
            return Ok(None);
          }
          warn!(path = %path.display(), "removing stale checkpoint claim");
          match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
          }
        }
        Err(e) => return Err(e.into()),
      }
    }
    Ok(None)
  }

  /// Writes `bytes` to `path` through a synced temporary file.
  async fn write_durably(
    &self,
    path: &Path,
    thread_id: &str,
    bytes: &[u8],
  ) -> Result<(), CheckpointError> {
    let tmp = self
      .dir
      .join(format!(".{}.{}.tmp", thread_id, uuid::Uuid::new_v4()));
    let written = async {
      let mut file = tokio::fs::File::create(&tmp).await?;
      file.write_all(bytes).await?;
      file.sync_all().await?;
      drop(file);
      tokio::fs::rename(&tmp, path).await
    }
    .await;
    if let Err(e) = written {
      let _ = tokio::fs::remove_file(&tmp).await;
      return Err(e.into());
    }
    sync_dir(&self.dir).await?;
    Ok(())
  }
}

async fn is_stale(path: &Path) -> bool {
  match tokio::fs::metadata(path).await {
    Ok(meta) => meta
      .modified()
      .ok()
      .and_then(|at| at.elapsed().ok())
      .is_some_and(|age| age > STALE_CLAIM_AFTER),
    // Released between our create attempt and now.
    Err(_) => true,
  }
}

/// Makes the rename itself durable.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<(), CheckpointError> {
  tokio::fs::File::open(dir).await?.sync_all().await?;
  Ok(())
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<(), CheckpointError> {
  Ok(())
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
  #[instrument(level = "trace", skip(self))]
  async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
    validate_thread_id(thread_id)?;
    self.read(thread_id).await
  }

  #[instrument(level = "trace", skip(self, checkpoint), fields(thread_id = %checkpoint.thread_id, version = checkpoint.version))]
  async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
    let thread_id = checkpoint.thread_id.as_str();
    validate_thread_id(thread_id)?;
    let _guard = self.write_lock.lock().await;
    tokio::fs::create_dir_all(&self.dir).await?;

    let Some(_claim) = self.claim(thread_id, checkpoint.version).await? else {
      let stored = self.read(thread_id).await?.map(|c| c.version).unwrap_or(0);
      return Err(CheckpointError::Conflict {
        thread_id: thread_id.to_string(),
        expected: checkpoint.version.saturating_sub(1),
        found: stored.max(checkpoint.version),
      });
    };
    let stored = self.read(thread_id).await?.map(|c| c.version);
    check_version(thread_id, stored, checkpoint.version)?;

    let json = serde_json::to_vec_pretty(checkpoint)?;
    let path = self.path_for(thread_id);
    self.write_durably(&path, thread_id, &json).await?;
    debug!(path = %path.display(), bytes = json.len(), "checkpoint written");
    Ok(())
  }
}
