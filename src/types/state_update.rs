//! Typed, per-stage state updates.
//!
//! Each stage returns its own update type; the type decides which fields of
//! [WorkflowState] the stage may write. Nothing else can be touched.

use serde::{Deserialize, Serialize};

use super::{BrandStyle, EmailImage, StageName, WorkflowState};

/// A write-set owned by exactly one stage.
pub trait StateUpdate {
  /// Stage recorded in `WorkflowState::stage` after merging.
  const STAGE: StageName;

  /// Writes the owned fields into `state`. Absent values leave fields untouched.
  fn apply_to(self, state: &mut WorkflowState);
}

/// Fields CollectInputs gathers, either from the caller's initial payload or
/// from the model's structured extraction of a human reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedInputs {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub topic: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub audience: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_draft: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub urls: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub images: Option<Vec<EmailImage>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub brand_style: Option<BrandStyle>,
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

fn non_empty<T>(value: Option<Vec<T>>) -> Option<Vec<T>> {
  value.filter(|v| !v.is_empty())
}

impl CollectedInputs {
  /// True when no field would be written.
  pub fn is_empty(&self) -> bool {
    self.topic.as_deref().is_none_or(|v| v.trim().is_empty())
      && self.audience.as_deref().is_none_or(|v| v.trim().is_empty())
      && self
        .content_draft
        .as_deref()
        .is_none_or(|v| v.trim().is_empty())
      && self.urls.as_ref().is_none_or(Vec::is_empty)
      && self.images.as_ref().is_none_or(Vec::is_empty)
      && self.brand_style.as_ref().is_none_or(BrandStyle::is_empty)
  }
}

impl StateUpdate for CollectedInputs {
  const STAGE: StageName = StageName::Collect;

  fn apply_to(self, state: &mut WorkflowState) {
    if let Some(topic) = non_blank(self.topic) {
      state.topic = Some(topic);
    }
    if let Some(audience) = non_blank(self.audience) {
      state.audience = Some(audience);
    }
    if let Some(draft) = non_blank(self.content_draft) {
      state.content_draft = Some(draft);
    }
    if let Some(urls) = non_empty(self.urls) {
      state.urls = urls;
    }
    if let Some(images) = non_empty(self.images) {
      state.images = images;
    }
    if let Some(incoming) = self.brand_style.filter(|b| !b.is_empty()) {
      let style = state.brand_style.get_or_insert_with(BrandStyle::default);
      if let Some(tone) = non_blank(incoming.tone) {
        style.tone = Some(tone);
      }
      if !incoming.palette.is_empty() {
        style.palette = incoming.palette;
      }
      if !incoming.fonts.is_empty() {
        style.fonts = incoming.fonts;
      }
      if let Some(logo) = non_blank(incoming.logo_url) {
        style.logo_url = Some(logo);
      }
    }
  }
}

/// Outcome of the human review of a generated draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftDecision {
  pub plain_text_draft: String,
  pub confirmed_plain_text: bool,
}

impl StateUpdate for DraftDecision {
  const STAGE: StageName = StageName::Draft;

  fn apply_to(self, state: &mut WorkflowState) {
    state.plain_text_draft = Some(self.plain_text_draft);
    state.confirmed_plain_text = self.confirmed_plain_text;
  }
}

/// Sanitized, CSS-inlined email HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignedEmail {
  pub final_html: String,
}

impl StateUpdate for DesignedEmail {
  const STAGE: StageName = StageName::Design;

  fn apply_to(self, state: &mut WorkflowState) {
    state.final_html = Some(self.final_html);
  }
}
