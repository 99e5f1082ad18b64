//! The record threaded through every stage of a run.

use serde::{Deserialize, Serialize};

use super::{BrandStyle, CollectedInputs, EmailImage, StageName, StateUpdate};

/// Field names CollectInputs may ask the human for, in question order.
pub const COLLECTIBLE_FIELDS: [&str; 4] = ["topic", "audience", "contentDraft", "urls"];

/// Workflow state for one thread.
///
/// Stages never mutate a state in place: [WorkflowState::merged] returns a new
/// record with exactly the fields the stage's update type owns written on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub topic: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub audience: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_draft: Option<String>,
  #[serde(default)]
  pub urls: Vec<String>,
  #[serde(default)]
  pub images: Vec<EmailImage>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub brand_style: Option<BrandStyle>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub plain_text_draft: Option<String>,
  #[serde(default)]
  pub confirmed_plain_text: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub final_html: Option<String>,
  /// Last stage that completed (observability only; routing never reads it).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stage: Option<StageName>,
}

fn is_present(value: Option<&str>) -> bool {
  value.is_some_and(|v| !v.trim().is_empty())
}

impl WorkflowState {
  /// Seeds a fresh state from caller input. Does not mark any stage as completed.
  pub fn seeded(input: CollectedInputs) -> Self {
    let mut state = WorkflowState::default();
    input.apply_to(&mut state);
    state
  }

  /// Returns a new state with `update` written on top and `stage` set to the update's stage.
  pub fn merged<U: StateUpdate>(&self, update: U) -> Self {
    let mut next = self.clone();
    update.apply_to(&mut next);
    next.stage = Some(U::STAGE);
    next
  }

  /// `topic` plus either a content draft or at least one reference link.
  pub fn input_collection_complete(&self) -> bool {
    is_present(self.topic.as_deref())
      && (is_present(self.content_draft.as_deref()) || !self.urls.is_empty())
  }

  /// A plain-text draft exists (approved or replaced by the human).
  pub fn content_draft_complete(&self) -> bool {
    self
      .plain_text_draft
      .as_deref()
      .is_some_and(|d| !d.is_empty())
  }

  /// DesignEmail ran to completion.
  pub fn is_terminal(&self) -> bool {
    self.stage == Some(StageName::Design) && self.final_html.is_some()
  }

  /// Collectible fields still missing, named as in the wire format.
  ///
  /// `contentDraft` and `urls` are alternatives; both are listed until one is present.
  pub fn missing_inputs(&self) -> Vec<&'static str> {
    let has_body_source = is_present(self.content_draft.as_deref()) || !self.urls.is_empty();
    COLLECTIBLE_FIELDS
      .into_iter()
      .filter(|field| match *field {
        "topic" => !is_present(self.topic.as_deref()),
        "audience" => !is_present(self.audience.as_deref()),
        "contentDraft" | "urls" => !has_body_source,
        _ => false,
      })
      .collect()
  }
}
