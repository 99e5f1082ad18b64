//! OpenAI-compatible chat-completions provider.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{LanguageModel, ModelError, OutputSchema, strip_code_fence};

/// Connection settings for [OpenAiCompatibleModel].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
  pub api_key: String,
  /// e.g. `https://api.openai.com/v1`
  pub base_url: String,
  pub model: String,
  pub temperature: Option<f64>,
}

/// Calls `{base_url}/chat/completions` with a system and a user message.
pub struct OpenAiCompatibleModel {
  config: OpenAiConfig,
  client: reqwest::Client,
}

impl OpenAiCompatibleModel {
  pub fn new(config: OpenAiConfig) -> Self {
    Self {
      config,
      client: reqwest::Client::new(),
    }
  }

  fn headers(&self) -> Result<HeaderMap, ModelError> {
    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", self.config.api_key);
    headers.insert(
      AUTHORIZATION,
      HeaderValue::from_str(&auth).map_err(|e| ModelError::Authentication(e.to_string()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
  }

  pub(crate) fn build_payload(
    &self,
    system_prompt: &str,
    user: &str,
    schema: Option<&OutputSchema>,
  ) -> Value {
    let mut payload = json!({
      "model": self.config.model,
      "messages": [
        { "role": "system", "content": system_prompt },
        { "role": "user", "content": user },
      ],
    });
    if let Some(t) = self.config.temperature {
      payload["temperature"] = json!(t);
    }
    if let Some(schema) = schema {
      payload["response_format"] = json!({
        "type": "json_schema",
        "json_schema": {
          "name": schema.name,
          "schema": schema.schema,
        },
      });
    }
    payload
  }

  /// Content of the first choice's message.
  pub(crate) fn parse_content(body: &Value) -> Result<String, ModelError> {
    body
      .get("choices")
      .and_then(|v| v.as_array())
      .and_then(|arr| arr.first())
      .and_then(|c| c.get("message"))
      .and_then(|m| m.get("content"))
      .and_then(|v| v.as_str())
      .map(str::to_string)
      .ok_or_else(|| ModelError::InvalidResponse("response has no message content".to_string()))
  }

  pub(crate) fn map_error(status: u16, body: &str) -> ModelError {
    match status {
      401 | 403 => ModelError::Authentication(body.to_string()),
      429 => ModelError::RateLimited,
      _ => ModelError::Api {
        status,
        message: body.to_string(),
      },
    }
  }

  async fn chat(&self, payload: Value) -> Result<String, ModelError> {
    let url = format!(
      "{}/chat/completions",
      self.config.base_url.trim_end_matches('/')
    );
    let response = self
      .client
      .post(url)
      .headers(self.headers()?)
      .json(&payload)
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          ModelError::Timeout
        } else {
          ModelError::Network(e.to_string())
        }
      })?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| ModelError::Network(e.to_string()))?;
    if !status.is_success() {
      return Err(Self::map_error(status.as_u16(), &text));
    }
    let body: Value = serde_json::from_str(&text)
      .map_err(|e| ModelError::InvalidResponse(format!("provider body is not json: {}", e)))?;
    Self::parse_content(&body)
  }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
  #[instrument(level = "trace", skip(self, system_prompt, user_text), fields(schema = schema.name))]
  async fn extract_structured(
    &self,
    system_prompt: &str,
    schema: &OutputSchema,
    user_text: &str,
  ) -> Result<Value, ModelError> {
    let payload = self.build_payload(system_prompt, user_text, Some(schema));
    let content = self.chat(payload).await?;
    debug!(bytes = content.len(), "structured output received");
    let value: Value = serde_json::from_str(strip_code_fence(&content))
      .map_err(|e| ModelError::InvalidResponse(format!("structured output is not json: {}", e)))?;
    if !value.is_object() {
      return Err(ModelError::InvalidResponse(
        "structured output is not a json object".to_string(),
      ));
    }
    Ok(value)
  }

  #[instrument(level = "trace", skip(self, system_prompt, user_payload))]
  async fn generate_text(
    &self,
    system_prompt: &str,
    user_payload: &str,
  ) -> Result<String, ModelError> {
    let payload = self.build_payload(system_prompt, user_payload, None);
    self.chat(payload).await
  }
}
