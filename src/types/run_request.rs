//! Caller-facing request and outcome of one `invoke`.

use serde::{Deserialize, Serialize};

use super::{CollectedInputs, Interrupt, StageName, WorkflowState};

/// One call into the runner. At most one of `input` / `resume` may be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thread_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub input: Option<CollectedInputs>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resume: Option<String>,
  /// Optional echo of the interrupt's `resumeKey`; rejected when stale.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resume_key: Option<String>,
}

impl RunRequest {
  pub fn start(input: CollectedInputs) -> Self {
    Self {
      input: Some(input),
      ..Self::default()
    }
  }

  pub fn resume(thread_id: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      thread_id: Some(thread_id.into()),
      resume: Some(value.into()),
      ..Self::default()
    }
  }

  pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
    self.thread_id = Some(thread_id.into());
    self
  }
}

/// The part of a pending interrupt shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptView {
  pub stage: StageName,
  pub question: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub expected: Vec<String>,
  /// Material the question is about, verbatim (DraftContent: the draft block).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payload: Option<String>,
  pub resume_key: String,
}

impl From<&Interrupt> for InterruptView {
  fn from(interrupt: &Interrupt) -> Self {
    Self {
      stage: interrupt.stage,
      question: interrupt.question.clone(),
      expected: interrupt.expected.clone(),
      payload: interrupt.payload.clone(),
      resume_key: interrupt.resume_key.clone(),
    }
  }
}

/// Run paused on an interrupt. `state` is the state persisted alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendedRun {
  pub thread_id: String,
  pub interrupt: InterruptView,
  pub state: WorkflowState,
}

/// Run ended because the router terminated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedRun {
  pub thread_id: String,
  pub state: WorkflowState,
}

/// Result of one `invoke`: either a pending question or the final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunOutcome {
  Suspended(SuspendedRun),
  Completed(CompletedRun),
}

impl RunOutcome {
  pub fn thread_id(&self) -> &str {
    match self {
      RunOutcome::Suspended(s) => &s.thread_id,
      RunOutcome::Completed(c) => &c.thread_id,
    }
  }

  pub fn state(&self) -> &WorkflowState {
    match self {
      RunOutcome::Suspended(s) => &s.state,
      RunOutcome::Completed(c) => &c.state,
    }
  }

  pub fn interrupt(&self) -> Option<&InterruptView> {
    match self {
      RunOutcome::Suspended(s) => Some(&s.interrupt),
      RunOutcome::Completed(_) => None,
    }
  }
}
