//! Deterministic, queue-driven model for tests and dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{LanguageModel, ModelError, OutputSchema};

/// A recorded call made against a [ScriptedModel].
#[derive(Debug, Clone, PartialEq)]
pub enum ModelCall {
  Extract {
    schema: &'static str,
    system_prompt: String,
    user_text: String,
  },
  Generate {
    system_prompt: String,
    user_payload: String,
  },
}

/// Replies with queued responses in FIFO order and records every call.
///
/// An empty queue yields [ModelError::Unavailable].
#[derive(Default)]
pub struct ScriptedModel {
  extractions: Mutex<VecDeque<Result<Value, ModelError>>>,
  texts: Mutex<VecDeque<Result<String, ModelError>>>,
  calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedModel {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push_extraction(&self, value: Value) -> &Self {
    self.push_extraction_result(Ok(value))
  }

  pub fn push_extraction_result(&self, result: Result<Value, ModelError>) -> &Self {
    lock(&self.extractions).push_back(result);
    self
  }

  pub fn push_text(&self, text: impl Into<String>) -> &Self {
    self.push_text_result(Ok(text.into()))
  }

  pub fn push_text_result(&self, result: Result<String, ModelError>) -> &Self {
    lock(&self.texts).push_back(result);
    self
  }

  /// Calls made so far, oldest first.
  pub fn calls(&self) -> Vec<ModelCall> {
    lock(&self.calls).clone()
  }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
  m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LanguageModel for ScriptedModel {
  async fn extract_structured(
    &self,
    system_prompt: &str,
    schema: &OutputSchema,
    user_text: &str,
  ) -> Result<Value, ModelError> {
    lock(&self.calls).push(ModelCall::Extract {
      schema: schema.name,
      system_prompt: system_prompt.to_string(),
      user_text: user_text.to_string(),
    });
    lock(&self.extractions)
      .pop_front()
      .unwrap_or_else(|| Err(ModelError::Unavailable("no scripted extraction queued".to_string())))
  }

  async fn generate_text(
    &self,
    system_prompt: &str,
    user_payload: &str,
  ) -> Result<String, ModelError> {
    lock(&self.calls).push(ModelCall::Generate {
      system_prompt: system_prompt.to_string(),
      user_payload: user_payload.to_string(),
    });
    lock(&self.texts)
      .pop_front()
      .unwrap_or_else(|| Err(ModelError::Unavailable("no scripted text queued".to_string())))
  }
}
