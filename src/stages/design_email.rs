//! DesignEmail: render the approved draft as client-safe HTML. Never suspends.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use super::prompts;
use super::{Stage, StageOutcome};
use crate::error::StageError;
use crate::html::{Allowlist, inline_css, sanitize_html};
use crate::model::{LanguageModel, strip_code_fence};
use crate::types::{DesignedEmail, Resume, StageName, WorkflowState};

pub struct DesignEmail {
  model: Arc<dyn LanguageModel>,
  allowlist: Allowlist,
}

impl DesignEmail {
  pub fn new(model: Arc<dyn LanguageModel>, allowlist: Allowlist) -> Self {
    Self { model, allowlist }
  }

  /// Code fence removal, CSS inlining, then sanitization.
  pub fn post_process(&self, raw: &str) -> Result<String, StageError> {
    let inlined = inline_css(strip_code_fence(raw));
    let clean = sanitize_html(&inlined, &self.allowlist);
    if clean.trim().is_empty() {
      return Err(StageError::PostProcess(
        "no markup left after sanitization".to_string(),
      ));
    }
    Ok(clean)
  }
}

#[async_trait]
impl Stage for DesignEmail {
  type Update = DesignedEmail;

  const NAME: StageName = StageName::Design;

  #[instrument(level = "trace", skip(self, state, _resume))]
  async fn run(
    &self,
    state: &WorkflowState,
    _resume: Option<Resume>,
  ) -> Result<StageOutcome<DesignedEmail>, StageError> {
    let Some(draft) = state.plain_text_draft.as_deref().filter(|d| !d.is_empty()) else {
      return Err(StageError::Precondition(
        "design needs a plain-text draft".to_string(),
      ));
    };
    let payload = json!({
      "plainTextDraft": draft,
      "brandStyle": state.brand_style,
      "images": state.images,
      "urls": state.urls,
    });
    let raw = self
      .model
      .generate_text(prompts::DESIGN_SYSTEM, &payload.to_string())
      .await?;
    debug!(bytes = raw.len(), "design markup received");
    let final_html = self.post_process(&raw)?;
    Ok(StageOutcome::Completed(DesignedEmail { final_html }))
  }
}
