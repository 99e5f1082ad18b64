//! CollectInputs: make sure topic and a body source exist, asking the human otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use super::prompts;
use super::{Stage, StageOutcome};
use crate::error::StageError;
use crate::model::LanguageModel;
use crate::types::{CollectedInputs, Interrupt, Resume, StageName, WorkflowState};
use crate::validation::validate_inputs;

/// Asks for whatever is missing of `topic`, `audience`, `contentDraft` / `urls`.
pub struct CollectInputs {
  model: Arc<dyn LanguageModel>,
}

impl CollectInputs {
  pub fn new(model: Arc<dyn LanguageModel>) -> Self {
    Self { model }
  }

  /// The fixed question template, listing the missing fields.
  pub fn question(missing: &[&str]) -> Interrupt {
    let question = format!(
      "To write this email I still need: {}. Reply in your own words; \
       either a content draft or a few reference links is enough for the body.",
      missing.join(", ")
    );
    Interrupt::new(StageName::Collect, question).with_expected(missing.iter().copied())
  }

  async fn extract(&self, resume: &Resume) -> Result<CollectedInputs, StageError> {
    let system = prompts::collect_system_prompt(&resume.interrupt.expected);
    let value = self
      .model
      .extract_structured(&system, &prompts::collect_schema(), &resume.value)
      .await?;
    let extracted: CollectedInputs = serde_json::from_value(value)
      .map_err(|e| StageError::Validation(format!("extracted inputs: {e}")))?;
    validate_inputs(&extracted)?;
    Ok(extracted)
  }
}

#[async_trait]
impl Stage for CollectInputs {
  type Update = CollectedInputs;

  const NAME: StageName = StageName::Collect;

  #[instrument(level = "trace", skip(self, state, resume), fields(resuming = resume.is_some()))]
  async fn run(
    &self,
    state: &WorkflowState,
    resume: Option<Resume>,
  ) -> Result<StageOutcome<CollectedInputs>, StageError> {
    let Some(resume) = resume else {
      if state.input_collection_complete() {
        return Ok(StageOutcome::Completed(CollectedInputs::default()));
      }
      return Ok(StageOutcome::suspend(Self::question(&state.missing_inputs())));
    };

    let extracted = self.extract(&resume).await?;
    let merged = state.merged(extracted.clone());
    if merged.input_collection_complete() {
      return Ok(StageOutcome::Completed(extracted));
    }
    let missing = merged.missing_inputs();
    info!(missing = ?missing, "inputs still incomplete, asking again");
    Ok(StageOutcome::Suspended {
      update: Some(extracted),
      interrupt: Self::question(&missing),
    })
  }
}
