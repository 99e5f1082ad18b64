//! Suspension signal raised by a stage and the value that answers it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StageName;

/// A stage's request for human input. Persisted with the checkpoint while pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interrupt {
  /// Stage that suspended and must be re-entered with the resume value.
  pub stage: StageName,
  /// Text shown to the human.
  pub question: String,
  /// Field names (or answer hints) the stage expects in the reply.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub expected: Vec<String>,
  /// Data the stage needs after resume; never shown to the caller.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payload: Option<String>,
  /// Identifies this particular suspension.
  pub resume_key: String,
  pub raised_at: DateTime<Utc>,
}

impl Interrupt {
  pub fn new(stage: StageName, question: impl Into<String>) -> Self {
    Self {
      stage,
      question: question.into(),
      expected: vec![],
      payload: None,
      resume_key: uuid::Uuid::new_v4().to_string(),
      raised_at: Utc::now(),
    }
  }

  pub fn with_expected<I, S>(mut self, expected: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.expected = expected.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
    self.payload = Some(payload.into());
    self
  }
}

/// Caller-supplied answer to a pending [Interrupt], handed to the paused stage.
#[derive(Debug, Clone)]
pub struct Resume {
  pub value: String,
  pub interrupt: Interrupt,
}
