//! CLI: serve the workflow over HTTP or drive a single thread from the shell.
//!
//! Usage:
//!   `mailflow serve [--addr 127.0.0.1:8080]`
//!   `mailflow run [--thread-id ID] [--input JSON | --resume TEXT]`
//!   `mailflow show <thread-id>`
//!
//! Set RUST_LOG=mailflow=trace for TRACE-level span enter/exit and events.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::{Args, Parser, Subcommand};
use mailflow::checkpointer::Checkpointer;
use mailflow::config::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_STORE_DIR, Settings, StoreSettings};
use mailflow::types::{CollectedInputs, RunRequest};
use mailflow::{GraphRunner, server};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Resumable email content workflow.
#[derive(Parser, Debug)]
#[command(name = "mailflow")]
#[command(
  after_help = r#"Environment variables (override the matching flags when set):
  MAILFLOW_API_KEY              API key for the OpenAI-compatible provider
  MAILFLOW_BASE_URL             Provider base url (default: https://api.openai.com/v1)
  MAILFLOW_MODEL                Model name (default: gpt-4o-mini)
  MAILFLOW_MODEL_TIMEOUT_SECS   Per-attempt model timeout
  MAILFLOW_MODEL_MAX_ATTEMPTS   Attempts per model call
  MAILFLOW_STORE_DIR            Checkpoint directory (default: .mailflow/threads)
  MAILFLOW_DATABASE_URL         SQLite url; replaces the checkpoint directory
  MAILFLOW_ADDR                 Listen address for `serve`
  MAILFLOW_ALLOW_ORIGIN         Browser origin allowed by CORS

Examples:
  mailflow run --input '{"topic":"solar panels"}'
  mailflow run --thread-id 7c1e... --resume approve
  mailflow serve --database-url sqlite://mailflow.db"#
)]
struct Cli {
  #[command(flatten)]
  common: CommonArgs,

  #[command(subcommand)]
  command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
  /// Provider API key. Overridden by MAILFLOW_API_KEY.
  #[arg(long, global = true, value_name = "KEY")]
  api_key: Option<String>,

  #[arg(long, global = true, value_name = "URL", default_value = DEFAULT_BASE_URL)]
  base_url: String,

  #[arg(long, global = true, value_name = "NAME", default_value = DEFAULT_MODEL)]
  model: String,

  /// Per-attempt model timeout in seconds.
  #[arg(long, global = true, value_name = "SECS", default_value_t = 60)]
  timeout_secs: u64,

  /// Attempts per model call, at least 1. Overridden by MAILFLOW_MODEL_MAX_ATTEMPTS.
  #[arg(
    long,
    global = true,
    value_name = "N",
    default_value_t = 3,
    value_parser = clap::value_parser!(u32).range(1..)
  )]
  max_attempts: u32,

  /// Directory holding one JSON checkpoint per thread.
  #[arg(long, global = true, value_name = "DIR", default_value = DEFAULT_STORE_DIR)]
  store_dir: PathBuf,

  /// SQLite url; takes precedence over --store-dir.
  #[arg(long, global = true, value_name = "URL")]
  database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Serve POST /run and GET /threads/:thread_id.
  Serve {
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    #[arg(long, value_name = "ORIGIN")]
    allow_origin: Option<String>,
  },
  /// One invoke; prints the outcome as JSON.
  Run {
    #[arg(long, value_name = "ID")]
    thread_id: Option<String>,

    /// Initial fields as JSON, e.g. '{"topic":"...","urls":["https://..."]}'.
    #[arg(long, value_name = "JSON", conflicts_with = "resume")]
    input: Option<String>,

    /// Answer to the pending question.
    #[arg(long, value_name = "TEXT")]
    resume: Option<String>,

    /// Resume key of the question being answered.
    #[arg(long, value_name = "KEY", requires = "resume")]
    resume_key: Option<String>,
  },
  /// Print a thread's checkpoint as JSON.
  Show {
    #[arg(value_name = "THREAD_ID")]
    thread_id: String,
  },
}

fn settings_from_flags(cli: &Cli) -> Settings {
  let mut settings = Settings::default();
  let common = &cli.common;
  settings.model.api_key = common.api_key.clone();
  settings.model.base_url = common.base_url.clone();
  settings.model.model = common.model.clone();
  settings.model.timeout = std::time::Duration::from_secs(common.timeout_secs);
  settings.model.max_attempts = common.max_attempts;
  settings.store = match &common.database_url {
    Some(url) => StoreSettings::Sqlite(url.clone()),
    None => StoreSettings::Dir(common.store_dir.clone()),
  };
  if let Command::Serve { addr, allow_origin } = &cli.command {
    settings.server.addr = *addr;
    settings.server.allow_origin = allow_origin.clone();
  }
  settings
}

fn fail(message: impl std::fmt::Display) -> ! {
  eprintln!("Error: {message}");
  process::exit(1);
}

fn print_json(value: &impl serde::Serialize) {
  match serde_json::to_string_pretty(value) {
    Ok(json) => println!("{json}"),
    Err(e) => fail(e),
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  // Env vars override flags.
  let settings = match settings_from_flags(&cli).apply_env() {
    Ok(s) => s,
    Err(e) => fail(e),
  };
  info!(store = ?settings.store, model = %settings.model.model, "settings (env or flags)");

  let store = match settings.store.open().await {
    Ok(s) => s,
    Err(e) => fail(e),
  };

  if let Command::Show { thread_id } = &cli.command {
    match store.load(thread_id).await {
      Ok(Some(cp)) => print_json(&cp),
      Ok(None) => fail(format!("thread {thread_id} not found")),
      Err(e) => fail(e),
    }
    return;
  }

  let model = match settings.model.build() {
    Ok(m) => m,
    Err(e) => fail(e),
  };
  let runner = Arc::new(GraphRunner::new(model, store));

  match cli.command {
    Command::Serve { .. } => {
      let origin = match settings.server.allow_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(v)) => Some(v),
        Some(Err(e)) => fail(format!("invalid allow origin: {e}")),
        None => None,
      };
      let app = server::router(runner, origin);
      if let Err(e) = server::serve(app, settings.server.addr).await {
        fail(e);
      }
    }
    Command::Run {
      thread_id,
      input,
      resume,
      resume_key,
    } => {
      let input = match input.as_deref().map(serde_json::from_str::<CollectedInputs>) {
        Some(Ok(i)) => Some(i),
        Some(Err(e)) => fail(format!("--input is not valid JSON: {e}")),
        None => None,
      };
      let request = RunRequest {
        thread_id,
        input,
        resume,
        resume_key,
      };
      match runner.invoke(request).await {
        Ok(outcome) => print_json(&outcome),
        Err(e) => fail(format!("[{}] {}", e.kind_label(), e)),
      }
    }
    Command::Show { .. } => {}
  }
}
