//! Error taxonomy for stages, checkpoint storage and the run boundary.
//!
//! Provider and storage errors are normalized into [RunError] before they reach
//! a caller of [crate::GraphRunner].

use thiserror::Error;

use crate::model::ModelError;
use crate::types::StageName;

/// Failure inside a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
  /// Model output or human-supplied data did not match the expected shape.
  #[error("structured output validation failed: {0}")]
  Validation(String),
  /// Language-model call failed after its retry policy was exhausted.
  #[error("upstream call failed: {0}")]
  Upstream(String),
  /// The stage was entered without the fields it depends on.
  #[error("stage precondition not met: {0}")]
  Precondition(String),
  /// CSS inlining or sanitization failed.
  #[error("html post-processing failed: {0}")]
  PostProcess(String),
}

impl From<ModelError> for StageError {
  fn from(e: ModelError) -> Self {
    match e {
      ModelError::InvalidResponse(msg) => StageError::Validation(msg),
      other => StageError::Upstream(other.to_string()),
    }
  }
}

/// Failure of a checkpoint backend.
#[derive(Debug, Error)]
pub enum CheckpointError {
  #[error("checkpoint io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("checkpoint serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("checkpoint database error: {0}")]
  Database(#[from] sqlx::Error),
  /// Compare-and-swap failed: someone else saved this thread in between.
  #[error("checkpoint conflict for thread {thread_id}: expected version {expected}, found {found}")]
  Conflict {
    thread_id: String,
    expected: u64,
    found: u64,
  },
  #[error("invalid thread id: {0:?}")]
  InvalidThreadId(String),
}

/// Coarse classification of a [RunError], used to pick HTTP status codes and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Bad input or bad model output; retry with clarified input.
  Validation,
  /// Model provider failed; retry later.
  Upstream,
  /// Caller broke the suspend/resume contract.
  Contract,
  /// Concurrent access to the same thread.
  Conflict,
  /// Checkpoint storage failed.
  Storage,
  NotFound,
}

/// The single error shape crossing the runner boundary.
#[derive(Debug, Error)]
pub enum RunError {
  #[error("invalid request: {0}")]
  InvalidRequest(String),
  #[error("thread {0} is suspended; a resume value is required")]
  ResumeRequired(String),
  #[error("thread {0} has no pending suspension to resume")]
  NothingToResume(String),
  #[error("resume key {given} does not match the pending interrupt of thread {thread_id}")]
  StaleResume { thread_id: String, given: String },
  #[error("thread {0} is already being run")]
  ThreadBusy(String),
  #[error("thread {0} already completed")]
  ThreadCompleted(String),
  #[error("thread {0} not found")]
  NotFound(String),
  #[error("{stage} stage failed: {source}")]
  Stage {
    stage: StageName,
    #[source]
    source: StageError,
  },
  #[error(transparent)]
  Checkpoint(#[from] CheckpointError),
}

impl RunError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      RunError::InvalidRequest(_)
      | RunError::ResumeRequired(_)
      | RunError::NothingToResume(_)
      | RunError::StaleResume { .. }
      | RunError::ThreadCompleted(_) => ErrorKind::Contract,
      RunError::ThreadBusy(_) => ErrorKind::Conflict,
      RunError::NotFound(_) => ErrorKind::NotFound,
      RunError::Stage { source, .. } => match source {
        StageError::Validation(_) => ErrorKind::Validation,
        StageError::Precondition(_) => ErrorKind::Contract,
        StageError::Upstream(_) | StageError::PostProcess(_) => ErrorKind::Upstream,
      },
      RunError::Checkpoint(CheckpointError::Conflict { .. }) => ErrorKind::Conflict,
      RunError::Checkpoint(CheckpointError::InvalidThreadId(_)) => ErrorKind::Contract,
      RunError::Checkpoint(_) => ErrorKind::Storage,
    }
  }

  /// Stable snake_case label for the kind, used in JSON error bodies.
  pub fn kind_label(&self) -> &'static str {
    match self.kind() {
      ErrorKind::Validation => "validation",
      ErrorKind::Upstream => "upstream",
      ErrorKind::Contract => "contract",
      ErrorKind::Conflict => "conflict",
      ErrorKind::Storage => "storage",
      ErrorKind::NotFound => "not_found",
    }
  }
}
