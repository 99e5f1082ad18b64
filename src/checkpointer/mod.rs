//! Durable per-thread checkpoint storage.
//!
//! All backends implement compare-and-swap saves: a checkpoint with `version
//! = n` only replaces a stored checkpoint with version `n - 1` (or nothing,
//! for `n = 1`). A slower concurrent writer gets [CheckpointError::Conflict].

#[cfg(test)]
mod contract_test;
mod file;
mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::error::CheckpointError;
use crate::types::Checkpoint;

pub use file::{CHECKPOINT_EXTENSION, FileCheckpointer, STALE_CLAIM_AFTER};
pub use memory::MemoryCheckpointer;
pub use sqlite::SqliteCheckpointer;

/// Longest accepted thread id.
pub const MAX_THREAD_ID_LEN: usize = 128;

/// Keyed checkpoint storage shared by every run.
#[async_trait]
pub trait Checkpointer: Send + Sync {
  /// Latest checkpoint of `thread_id`, if any.
  async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

  /// Stores `checkpoint` if the stored version is `checkpoint.version - 1`.
  async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
}

/// Thread ids are `[A-Za-z0-9_-]{1,128}` so every backend can use them as keys
/// and file names.
pub fn validate_thread_id(thread_id: &str) -> Result<(), CheckpointError> {
  let ok = !thread_id.is_empty()
    && thread_id.len() <= MAX_THREAD_ID_LEN
    && thread_id
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
  if ok {
    Ok(())
  } else {
    Err(CheckpointError::InvalidThreadId(thread_id.to_string()))
  }
}

/// Compare-and-swap check shared by the backends. `stored` is the version
/// currently persisted, if any.
pub(crate) fn check_version(
  thread_id: &str,
  stored: Option<u64>,
  incoming: u64,
) -> Result<(), CheckpointError> {
  let expected = incoming.saturating_sub(1);
  let found = stored.unwrap_or(0);
  if found == expected && incoming > 0 {
    Ok(())
  } else {
    Err(CheckpointError::Conflict {
      thread_id: thread_id.to_string(),
      expected,
      found,
    })
  }
}
