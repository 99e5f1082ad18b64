//! History entries recorded on every persisted transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StageName;

/// What happened to a stage at one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEvent {
  /// Stage raised an interrupt and the run returned to the caller.
  Suspended,
  /// A resume value was accepted for the pending interrupt.
  Resumed,
  /// Stage produced its update and the router was consulted.
  Completed,
}

/// One recorded step in a thread's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEntry {
  /// 1-based step index.
  pub step: u32,
  pub stage: StageName,
  pub event: StepEvent,
  pub at: DateTime<Utc>,
}

impl StepEntry {
  pub fn new(step: u32, stage: StageName, event: StepEvent) -> Self {
    Self {
      step,
      stage,
      event,
      at: Utc::now(),
    }
  }
}
