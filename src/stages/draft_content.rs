//! DraftContent: generate a draft, then always ask the human to approve or replace it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::prompts;
use super::{Stage, StageOutcome};
use crate::error::StageError;
use crate::model::LanguageModel;
use crate::types::{DraftDecision, Interrupt, Resume, StageName, WorkflowState};

/// Reply that accepts the generated draft as-is (trimmed, any case).
pub const APPROVAL_TOKEN: &str = "approve";

pub fn is_approval(reply: &str) -> bool {
  reply.trim().eq_ignore_ascii_case(APPROVAL_TOKEN)
}

/// Structured draft returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
  pub subject: String,
  #[serde(default)]
  pub preheader: String,
  pub body: String,
}

impl EmailDraft {
  /// `Subject: …\nPreheader: …\n\n{body}`
  pub fn to_plain_text(&self) -> String {
    format!(
      "Subject: {}\nPreheader: {}\n\n{}",
      self.subject.trim(),
      self.preheader.trim(),
      self.body.trim()
    )
  }

  fn validate(&self) -> Result<(), StageError> {
    if self.subject.trim().is_empty() {
      return Err(StageError::Validation("draft has an empty subject".to_string()));
    }
    if self.body.trim().is_empty() {
      return Err(StageError::Validation("draft has an empty body".to_string()));
    }
    Ok(())
  }
}

pub struct DraftContent {
  model: Arc<dyn LanguageModel>,
}

impl DraftContent {
  pub fn new(model: Arc<dyn LanguageModel>) -> Self {
    Self { model }
  }

  async fn generate(&self, state: &WorkflowState) -> Result<String, StageError> {
    let payload = json!({
      "topic": state.topic,
      "audience": state.audience,
      "contentDraft": state.content_draft,
      "urls": state.urls,
      "tone": state.brand_style.as_ref().and_then(|b| b.tone.as_deref()),
    });
    let value = self
      .model
      .extract_structured(prompts::DRAFT_SYSTEM, &prompts::draft_schema(), &payload.to_string())
      .await?;
    let draft: EmailDraft = serde_json::from_value(value)
      .map_err(|e| StageError::Validation(format!("email draft: {e}")))?;
    draft.validate()?;
    Ok(draft.to_plain_text())
  }
}

fn review_question(draft: &str) -> String {
  format!(
    "Reply \"{APPROVAL_TOKEN}\" to use this draft, or send the complete corrected text \
     to replace it.\n\n{draft}"
  )
}

#[async_trait]
impl Stage for DraftContent {
  type Update = DraftDecision;

  const NAME: StageName = StageName::Draft;

  #[instrument(level = "trace", skip(self, state, resume), fields(resuming = resume.is_some()))]
  async fn run(
    &self,
    state: &WorkflowState,
    resume: Option<Resume>,
  ) -> Result<StageOutcome<DraftDecision>, StageError> {
    match resume {
      None => {
        if !state.input_collection_complete() {
          return Err(StageError::Precondition(
            "draft needs a topic and a content draft or urls".to_string(),
          ));
        }
        let draft = self.generate(state).await?;
        let interrupt = Interrupt::new(StageName::Draft, review_question(&draft))
          .with_expected([APPROVAL_TOKEN])
          .with_payload(draft);
        Ok(StageOutcome::suspend(interrupt))
      }
      Some(resume) => {
        let generated = resume.interrupt.payload.ok_or_else(|| {
          StageError::Precondition("pending draft review has no draft attached".to_string())
        })?;
        let decision = if is_approval(&resume.value) {
          DraftDecision {
            plain_text_draft: generated,
            confirmed_plain_text: true,
          }
        } else {
          DraftDecision {
            plain_text_draft: resume.value,
            confirmed_plain_text: false,
          }
        };
        Ok(StageOutcome::Completed(decision))
      }
    }
  }
}
