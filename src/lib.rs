//! # mailflow
//!
//! Resumable, checkpointed email content workflow with human-in-the-loop
//! suspensions.
//!
//! ## Architecture
//!
//! A thread moves through three stages, chosen by [router::route_after]:
//!
//! - [stages::CollectInputs]: extracts topic, audience, brand and links from free text,
//!   suspending until the required fields are present.
//! - [stages::DraftContent]: writes a plain-text draft and suspends for approval.
//! - [stages::DesignEmail]: renders approved copy to HTML, inlines CSS and sanitizes it.
//!
//! [GraphRunner] persists a [types::Checkpoint] through a [Checkpointer] after
//! every transition, so a thread can be resumed from another process.

pub mod checkpointer;
pub mod config;
pub mod error;
pub mod html;
pub mod model;
pub mod router;
pub mod runner;
#[cfg(test)]
mod runner_test;
pub mod server;
pub mod stages;
pub mod types;
pub mod validation;

pub use checkpointer::{Checkpointer, FileCheckpointer, MemoryCheckpointer, SqliteCheckpointer};
pub use error::{CheckpointError, ErrorKind, RunError, StageError};
pub use model::{LanguageModel, ModelError, ScriptedModel};
pub use runner::GraphRunner;
pub use types::{Checkpoint, CollectedInputs, RunOutcome, RunRequest, WorkflowState};
