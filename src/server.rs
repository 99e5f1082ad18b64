//! HTTP surface: `POST /run` and `GET /threads/:thread_id`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{CheckpointError, ErrorKind, RunError};
use crate::runner::GraphRunner;
use crate::types::{Checkpoint, RunOutcome, RunRequest};

/// A [RunError] rendered as `{"error": {"kind", "message"}}`.
pub struct ApiError(pub RunError);

impl From<RunError> for ApiError {
  fn from(e: RunError) -> Self {
    Self(e)
  }
}

/// HTTP status for a run-level error.
pub fn status_for(error: &RunError) -> StatusCode {
  match error {
    RunError::InvalidRequest(_) | RunError::Checkpoint(CheckpointError::InvalidThreadId(_)) => {
      StatusCode::BAD_REQUEST
    }
    _ => match error.kind() {
      ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
      ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
      ErrorKind::Contract | ErrorKind::Conflict => StatusCode::CONFLICT,
      ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
    },
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = status_for(&self.0);
    if status.is_server_error() {
      warn!(error = %self.0, "request failed");
    }
    let body = json!({
      "error": {
        "kind": self.0.kind_label(),
        "message": self.0.to_string(),
      }
    });
    (status, Json(body)).into_response()
  }
}

/// Builds the router. `allow_origin` enables CORS for one browser origin.
pub fn router(runner: Arc<GraphRunner>, allow_origin: Option<HeaderValue>) -> Router {
  let app = Router::new()
    .route("/run", post(run))
    .route("/threads/:thread_id", get(thread))
    .route("/health", get(health))
    .with_state(runner)
    .layer(TraceLayer::new_for_http());
  match allow_origin {
    Some(origin) => app.layer(
      CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]),
    ),
    None => app,
  }
}

async fn run(
  State(runner): State<Arc<GraphRunner>>,
  Json(request): Json<RunRequest>,
) -> Result<Json<RunOutcome>, ApiError> {
  Ok(Json(runner.invoke(request).await?))
}

async fn thread(
  State(runner): State<Arc<GraphRunner>>,
  Path(thread_id): Path<String>,
) -> Result<Json<Checkpoint>, ApiError> {
  Ok(Json(runner.thread(&thread_id).await?))
}

async fn health() -> &'static str {
  "ok"
}

/// Serves `app` on `addr` until Ctrl-C.
pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
  let listener = tokio::net::TcpListener::bind(addr).await?;
  info!(addr = %listener.local_addr()?, "listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!("shutting down");
    })
    .await
}
