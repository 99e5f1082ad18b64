//! Stage routing: a pure function of the state after a stage completed.
//!
//! Never consulted after a suspension; the runner returns to the caller instead.

use tracing::instrument;

use crate::types::{StageName, WorkflowState};

/// Stage every new thread starts at.
pub const ENTRY_STAGE: StageName = StageName::Collect;

/// Where the run goes after a completed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  Next(StageName),
  End,
}

/// Picks the next stage after `completed`.
///
/// Collect with incomplete inputs ends the run. CollectInputs never completes
/// in that condition (it suspends again), so this branch is a fallback only.
#[instrument(level = "trace", skip(state))]
pub fn route_after(completed: StageName, state: &WorkflowState) -> Route {
  match completed {
    StageName::Collect if state.input_collection_complete() => Route::Next(StageName::Draft),
    StageName::Draft if state.content_draft_complete() => Route::Next(StageName::Design),
    StageName::Collect | StageName::Draft | StageName::Design => Route::End,
  }
}

impl Route {
  pub fn next_stage(self) -> Option<StageName> {
    match self {
      Route::Next(stage) => Some(stage),
      Route::End => None,
    }
  }
}
