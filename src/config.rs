//! Runtime settings.
//!
//! The binary fills [Settings] from command-line flags, then
//! [Settings::apply_env] lets `MAILFLOW_*` environment variables override them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::checkpointer::{Checkpointer, FileCheckpointer, MemoryCheckpointer, SqliteCheckpointer};
use crate::error::CheckpointError;
use crate::model::{CallPolicy, LanguageModel, OpenAiCompatibleModel, OpenAiConfig, RetryingModel};

pub const ENV_API_KEY: &str = "MAILFLOW_API_KEY";
pub const ENV_BASE_URL: &str = "MAILFLOW_BASE_URL";
pub const ENV_MODEL: &str = "MAILFLOW_MODEL";
pub const ENV_MODEL_TIMEOUT_SECS: &str = "MAILFLOW_MODEL_TIMEOUT_SECS";
pub const ENV_MODEL_MAX_ATTEMPTS: &str = "MAILFLOW_MODEL_MAX_ATTEMPTS";
pub const ENV_STORE_DIR: &str = "MAILFLOW_STORE_DIR";
pub const ENV_DATABASE_URL: &str = "MAILFLOW_DATABASE_URL";
pub const ENV_ADDR: &str = "MAILFLOW_ADDR";
pub const ENV_ALLOW_ORIGIN: &str = "MAILFLOW_ALLOW_ORIGIN";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_STORE_DIR: &str = ".mailflow/threads";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{name}: invalid value {value:?}: {reason}")]
  InvalidValue {
    name: &'static str,
    value: String,
    reason: String,
  },
  #[error("no api key configured (set {ENV_API_KEY} or --api-key)")]
  MissingApiKey,
  #[error(transparent)]
  Store(#[from] CheckpointError),
}

/// Language-model provider and call policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
  pub base_url: String,
  pub api_key: Option<String>,
  pub model: String,
  /// Per-attempt deadline.
  pub timeout: Duration,
  pub max_attempts: u32,
  pub backoff: Duration,
}

impl Default for ModelSettings {
  fn default() -> Self {
    let policy = CallPolicy::default();
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      api_key: None,
      model: DEFAULT_MODEL.to_string(),
      timeout: policy.timeout,
      max_attempts: policy.max_attempts,
      backoff: policy.backoff,
    }
  }
}

impl ModelSettings {
  pub fn policy(&self) -> CallPolicy {
    CallPolicy {
      max_attempts: self.max_attempts,
      timeout: self.timeout,
      backoff: self.backoff,
    }
  }

  /// OpenAI-compatible provider wrapped in the retry policy.
  pub fn build(&self) -> Result<Arc<dyn LanguageModel>, ConfigError> {
    let api_key = self
      .api_key
      .clone()
      .filter(|k| !k.trim().is_empty())
      .ok_or(ConfigError::MissingApiKey)?;
    let provider = OpenAiCompatibleModel::new(OpenAiConfig {
      api_key,
      base_url: self.base_url.clone(),
      model: self.model.clone(),
      temperature: None,
    });
    Ok(Arc::new(RetryingModel::new(Arc::new(provider), self.policy())))
  }
}

/// Where checkpoints live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
  Memory,
  Dir(PathBuf),
  /// sqlx connection URL, e.g. `sqlite://mailflow.db`.
  Sqlite(String),
}

impl Default for StoreSettings {
  fn default() -> Self {
    StoreSettings::Dir(PathBuf::from(DEFAULT_STORE_DIR))
  }
}

impl StoreSettings {
  pub async fn open(&self) -> Result<Arc<dyn Checkpointer>, ConfigError> {
    Ok(match self {
      StoreSettings::Memory => Arc::new(MemoryCheckpointer::new()),
      StoreSettings::Dir(dir) => Arc::new(FileCheckpointer::new(dir.clone())),
      StoreSettings::Sqlite(url) => Arc::new(SqliteCheckpointer::connect(url).await?),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
  pub addr: SocketAddr,
  /// Browser origin allowed to call the API, if any.
  pub allow_origin: Option<String>,
}

impl Default for ServerSettings {
  fn default() -> Self {
    Self {
      addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
      allow_origin: None,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
  pub model: ModelSettings,
  pub store: StoreSettings,
  pub server: ServerSettings,
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  value
    .trim()
    .parse()
    .map_err(|e: T::Err| ConfigError::InvalidValue {
      name,
      reason: e.to_string(),
      value,
    })
}

impl Settings {
  /// Overrides fields from the process environment.
  pub fn apply_env(self) -> Result<Self, ConfigError> {
    self.apply_env_with(|name| std::env::var(name).ok())
  }

  /// Overrides fields from `lookup`. Empty values are ignored.
  /// A database URL takes precedence over a store directory.
  pub fn apply_env_with(
    mut self,
    lookup: impl Fn(&str) -> Option<String>,
  ) -> Result<Self, ConfigError> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = get(ENV_API_KEY) {
      self.model.api_key = Some(key);
    }
    if let Some(url) = get(ENV_BASE_URL) {
      self.model.base_url = url;
    }
    if let Some(model) = get(ENV_MODEL) {
      self.model.model = model;
    }
    if let Some(secs) = get(ENV_MODEL_TIMEOUT_SECS) {
      let secs: u64 = parse(ENV_MODEL_TIMEOUT_SECS, secs)?;
      self.model.timeout = Duration::from_secs(secs);
    }
    if let Some(attempts) = get(ENV_MODEL_MAX_ATTEMPTS) {
      let attempts: u32 = parse(ENV_MODEL_MAX_ATTEMPTS, attempts)?;
      if attempts == 0 {
        return Err(ConfigError::InvalidValue {
          name: ENV_MODEL_MAX_ATTEMPTS,
          value: "0".to_string(),
          reason: "must be at least 1".to_string(),
        });
      }
      self.model.max_attempts = attempts;
    }
    if let Some(dir) = get(ENV_STORE_DIR) {
      self.store = StoreSettings::Dir(PathBuf::from(dir));
    }
    if let Some(url) = get(ENV_DATABASE_URL) {
      self.store = StoreSettings::Sqlite(url);
    }
    if let Some(addr) = get(ENV_ADDR) {
      self.server.addr = parse(ENV_ADDR, addr)?;
    }
    if let Some(origin) = get(ENV_ALLOW_ORIGIN) {
      self.server.allow_origin = Some(origin);
    }
    Ok(self)
  }
}
