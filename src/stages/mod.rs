//! The three workflow stages.
//!
//! A stage never blocks waiting for a human. It either completes with its
//! typed update or returns [StageOutcome::Suspended]; the runner persists the
//! suspension and later re-enters the same stage with a [Resume].

mod collect_inputs;
mod design_email;
#[cfg(test)]
mod design_email_test;
mod draft_content;
pub(crate) mod prompts;

use async_trait::async_trait;

use crate::error::StageError;
use crate::types::{Interrupt, Resume, StageName, StateUpdate, WorkflowState};

pub use collect_inputs::CollectInputs;
pub use design_email::DesignEmail;
pub use draft_content::{APPROVAL_TOKEN, DraftContent, EmailDraft, is_approval};

/// Result of running a stage once.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<U> {
  /// The stage finished; merge the update and consult the router.
  Completed(U),
  /// The stage needs human input. `update` holds fields gathered so far,
  /// persisted together with the interrupt.
  Suspended {
    update: Option<U>,
    interrupt: Interrupt,
  },
}

impl<U> StageOutcome<U> {
  pub fn suspend(interrupt: Interrupt) -> Self {
    StageOutcome::Suspended {
      update: None,
      interrupt,
    }
  }
}

/// One pipeline step over [WorkflowState].
#[async_trait]
pub trait Stage: Send + Sync {
  /// The only fields this stage may write.
  type Update: StateUpdate + Send;

  const NAME: StageName;

  /// Runs the stage. `resume` is set when re-entering after a suspension this
  /// stage raised.
  async fn run(
    &self,
    state: &WorkflowState,
    resume: Option<Resume>,
  ) -> Result<StageOutcome<Self::Update>, StageError>;
}
