//! Workflow data model: state, per-stage updates, suspensions and checkpoints.
//!
//! These types are pure data; every behavior lives in `stages`, `router` and `runner`.

mod brand_style;
mod checkpoint;
mod email_image;
mod interrupt;
mod run_request;
mod stage_name;
mod state_update;
mod step_entry;
mod workflow_state;
#[cfg(test)]
mod workflow_state_test;

pub use brand_style::BrandStyle;
pub use checkpoint::Checkpoint;
pub use email_image::EmailImage;
pub use interrupt::{Interrupt, Resume};
pub use run_request::{CompletedRun, InterruptView, RunOutcome, RunRequest, SuspendedRun};
pub use stage_name::StageName;
pub use state_update::{CollectedInputs, DesignedEmail, DraftDecision, StateUpdate};
pub use step_entry::{StepEntry, StepEvent};
pub use workflow_state::{COLLECTIBLE_FIELDS, WorkflowState};
