//! In-process checkpoint store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::instrument;

use super::{Checkpointer, check_version, validate_thread_id};
use crate::error::CheckpointError;
use crate::types::Checkpoint;

/// Keeps checkpoints in a map. Lost when the process exits.
#[derive(Default)]
pub struct MemoryCheckpointer {
  threads: Mutex<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointer {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn len(&self) -> usize {
    self.threads.lock().await.len()
  }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
  #[instrument(level = "trace", skip(self))]
  async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
    validate_thread_id(thread_id)?;
    Ok(self.threads.lock().await.get(thread_id).cloned())
  }

  #[instrument(level = "trace", skip(self, checkpoint), fields(thread_id = %checkpoint.thread_id, version = checkpoint.version))]
  async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
    validate_thread_id(&checkpoint.thread_id)?;
    let mut threads = self.threads.lock().await;
    let stored = threads.get(&checkpoint.thread_id).map(|c| c.version);
    check_version(&checkpoint.thread_id, stored, checkpoint.version)?;
    threads.insert(checkpoint.thread_id.clone(), checkpoint.clone());
    Ok(())
  }
}
