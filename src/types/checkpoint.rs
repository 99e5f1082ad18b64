//! Durable per-thread record: state, next stage and any pending suspension.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Interrupt, StageName, StepEntry, StepEvent, WorkflowState};

/// Checkpoint for one thread.
///
/// `version` starts at 1 on first save and increases by one on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
  pub thread_id: String,
  pub state: WorkflowState,
  /// Stage the runner executes next; `None` once the router terminated the run.
  pub next_stage: Option<StageName>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pending: Option<Interrupt>,
  pub version: u64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(default)]
  pub history: Vec<StepEntry>,
}

impl Checkpoint {
  /// A not-yet-saved checkpoint positioned at `entry`.
  pub fn new(thread_id: impl Into<String>, state: WorkflowState, entry: StageName) -> Self {
    let now = Utc::now();
    Self {
      thread_id: thread_id.into(),
      state,
      next_stage: Some(entry),
      pending: None,
      version: 0,
      created_at: now,
      updated_at: now,
      history: vec![],
    }
  }

  pub fn is_suspended(&self) -> bool {
    self.pending.is_some()
  }

  /// Appends a history entry for `stage`.
  pub fn record(&mut self, stage: StageName, event: StepEvent) {
    let step = self.history.len() as u32 + 1;
    self.history.push(StepEntry::new(step, stage, event));
  }

  /// Bumps the version and timestamp ahead of a save.
  pub fn advance_version(&mut self) {
    self.version += 1;
    self.updated_at = Utc::now();
  }
}
