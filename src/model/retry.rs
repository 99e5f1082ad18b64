//! Retry and timeout policy around any [LanguageModel].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::{LanguageModel, ModelError, OutputSchema};

/// Caller-supplied limits for one logical model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
  /// Total attempts including the first one. Values below 1 behave as 1.
  pub max_attempts: u32,
  /// Deadline per attempt.
  pub timeout: Duration,
  /// Sleep before attempt `n + 1` is `backoff * n`.
  pub backoff: Duration,
}

impl Default for CallPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      timeout: Duration::from_secs(60),
      backoff: Duration::from_millis(500),
    }
  }
}

impl CallPolicy {
  /// Runs `attempt` until it succeeds, fails with a non-retryable error, or attempts run out.
  pub async fn run<T, F, Fut>(&self, op: &str, mut attempt: F) -> Result<T, ModelError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ModelError>>,
  {
    let max = self.max_attempts.max(1);
    let mut n = 0;
    loop {
      n += 1;
      let result = match tokio::time::timeout(self.timeout, attempt()).await {
        Ok(r) => r,
        Err(_) => Err(ModelError::Timeout),
      };
      match result {
        Ok(v) => return Ok(v),
        Err(e) if e.is_retryable() && n < max => {
          warn!(op, attempt = n, max_attempts = max, error = %e, "model call failed, retrying");
          tokio::time::sleep(self.backoff * n).await;
        }
        Err(e) => return Err(e),
      }
    }
  }
}

/// Wraps a model so every call follows a [CallPolicy].
pub struct RetryingModel {
  inner: Arc<dyn LanguageModel>,
  policy: CallPolicy,
}

impl RetryingModel {
  pub fn new(inner: Arc<dyn LanguageModel>, policy: CallPolicy) -> Self {
    Self { inner, policy }
  }
}

#[async_trait]
impl LanguageModel for RetryingModel {
  async fn extract_structured(
    &self,
    system_prompt: &str,
    schema: &OutputSchema,
    user_text: &str,
  ) -> Result<Value, ModelError> {
    self
      .policy
      .run("extract_structured", || {
        self.inner.extract_structured(system_prompt, schema, user_text)
      })
      .await
  }

  async fn generate_text(
    &self,
    system_prompt: &str,
    user_payload: &str,
  ) -> Result<String, ModelError> {
    self
      .policy
      .run("generate_text", || {
        self.inner.generate_text(system_prompt, user_payload)
      })
      .await
  }
}
