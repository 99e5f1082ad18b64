//! SQLite checkpoint store on a sqlx pool.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use super::{Checkpointer, validate_thread_id};
use crate::error::CheckpointError;
use crate::types::Checkpoint;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS checkpoints (
  thread_id  TEXT PRIMARY KEY NOT NULL,
  version    INTEGER NOT NULL,
  record     TEXT NOT NULL,
  updated_at TEXT NOT NULL
)";

/// Stores each thread as one row; saves are a conditional `UPDATE`.
pub struct SqliteCheckpointer {
  pool: SqlitePool,
}

impl SqliteCheckpointer {
  /// Connects to `url` (e.g. `sqlite://mailflow.db`), creating the file and table if needed.
  pub async fn connect(url: &str) -> Result<Self, CheckpointError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
      .max_connections(4)
      .connect_with(options)
      .await?;
    Self::with_pool(pool).await
  }

  /// Private in-memory database; a single connection so every query sees it.
  pub async fn in_memory() -> Result<Self, CheckpointError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await?;
    Self::with_pool(pool).await
  }

  pub async fn with_pool(pool: SqlitePool) -> Result<Self, CheckpointError> {
    sqlx::query(SCHEMA).execute(&pool).await?;
    Ok(Self { pool })
  }

  async fn stored_version(&self, thread_id: &str) -> Result<Option<u64>, CheckpointError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM checkpoints WHERE thread_id = ?")
      .bind(thread_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(|(v,)| v as u64))
  }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
  #[instrument(level = "trace", skip(self))]
  async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
    validate_thread_id(thread_id)?;
    let row: Option<(String,)> = sqlx::query_as("SELECT record FROM checkpoints WHERE thread_id = ?")
      .bind(thread_id)
      .fetch_optional(&self.pool)
      .await?;
    match row {
      Some((record,)) => Ok(Some(serde_json::from_str(&record)?)),
      None => Ok(None),
    }
  }

  #[instrument(level = "trace", skip(self, checkpoint), fields(thread_id = %checkpoint.thread_id, version = checkpoint.version))]
  async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
    validate_thread_id(&checkpoint.thread_id)?;
    let record = serde_json::to_string(checkpoint)?;
    let version = checkpoint.version as i64;
    let now = Utc::now().to_rfc3339();
    let result = if checkpoint.version == 1 {
      sqlx::query(
        "INSERT INTO checkpoints (thread_id, version, record, updated_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(thread_id) DO NOTHING",
      )
      .bind(&checkpoint.thread_id)
      .bind(version)
      .bind(&record)
      .bind(&now)
      .execute(&self.pool)
      .await?
    } else {
      sqlx::query(
        "UPDATE checkpoints SET version = ?, record = ?, updated_at = ?
         WHERE thread_id = ? AND version = ?",
      )
      .bind(version)
      .bind(&record)
      .bind(&now)
      .bind(&checkpoint.thread_id)
      .bind(version - 1)
      .execute(&self.pool)
      .await?
    };
    if result.rows_affected() == 0 {
      let found = self.stored_version(&checkpoint.thread_id).await?.unwrap_or(0);
      return Err(CheckpointError::Conflict {
        thread_id: checkpoint.thread_id.clone(),
        expected: checkpoint.version.saturating_sub(1),
        found,
      });
    }
    Ok(())
  }
}
