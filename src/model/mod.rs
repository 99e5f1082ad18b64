//! Language-model boundary used by the stages.
//!
//! Stages only see [LanguageModel]; concrete providers and the retry wrapper
//! live behind it so tests can swap in [ScriptedModel].

mod openai;
mod retry;
mod scripted;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use openai::{OpenAiCompatibleModel, OpenAiConfig};
pub use retry::{CallPolicy, RetryingModel};
pub use scripted::{ModelCall, ScriptedModel};

/// Errors a provider can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
  #[error("network error: {0}")]
  Network(String),
  #[error("api error ({status}): {message}")]
  Api { status: u16, message: String },
  #[error("rate limited")]
  RateLimited,
  #[error("authentication error: {0}")]
  Authentication(String),
  #[error("model call timed out")]
  Timeout,
  /// Body was not JSON or did not match the requested schema.
  #[error("invalid model response: {0}")]
  InvalidResponse(String),
  #[error("model unavailable: {0}")]
  Unavailable(String),
}

impl ModelError {
  /// True for transient failures worth another attempt.
  pub fn is_retryable(&self) -> bool {
    match self {
      ModelError::Network(_) | ModelError::RateLimited | ModelError::Timeout => true,
      ModelError::Api { status, .. } => *status >= 500,
      ModelError::Authentication(_) | ModelError::InvalidResponse(_) | ModelError::Unavailable(_) => {
        false
      }
    }
  }
}

/// Named JSON schema for a structured-output request.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
  pub name: &'static str,
  pub schema: Value,
}

/// The two model operations the workflow consumes.
#[async_trait]
pub trait LanguageModel: Send + Sync {
  /// Asks for a JSON object shaped by `schema`, derived from `user_text`.
  async fn extract_structured(
    &self,
    system_prompt: &str,
    schema: &OutputSchema,
    user_text: &str,
  ) -> Result<Value, ModelError>;

  /// Asks for free text.
  async fn generate_text(&self, system_prompt: &str, user_payload: &str)
  -> Result<String, ModelError>;
}

/// Strips one surrounding markdown code fence (```lang ... ```), if present.
pub(crate) fn strip_code_fence(text: &str) -> &str {
  let trimmed = text.trim();
  let Some(rest) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  let Some(body) = rest.strip_suffix("```") else {
    return trimmed;
  };
  match body.find('\n') {
    Some(idx) if !body[..idx].contains(['<', '{', '[']) => body[idx + 1..].trim(),
    _ => body.trim(),
  }
}
