//! Workflow runner: load or seed a thread, drive stages through the router and
//! persist every transition before returning.
//!
//! - [GraphRunner::invoke]: one call of the `run` contract (fresh input or resume value).
//! - [GraphRunner::thread]: the latest durable checkpoint of a thread.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{info, instrument, warn};

use crate::checkpointer::{Checkpointer, validate_thread_id};
use crate::error::RunError;
use crate::html::Allowlist;
use crate::model::LanguageModel;
use crate::router::{ENTRY_STAGE, route_after};
use crate::stages::{CollectInputs, DesignEmail, DraftContent, Stage, StageOutcome};
use crate::types::{
  Checkpoint, CompletedRun, InterruptView, Resume, RunOutcome, RunRequest, StageName, StateUpdate,
  StepEvent, SuspendedRun, WorkflowState,
};

/// Drives threads through CollectInputs, DraftContent and DesignEmail.
///
/// All continuity between calls lives in the injected [Checkpointer]; a
/// runner built in another process over the same store resumes any thread.
pub struct GraphRunner {
  checkpointer: Arc<dyn Checkpointer>,
  collect: CollectInputs,
  draft: DraftContent,
  design: DesignEmail,
  in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Marks a thread as running in this process until dropped.
struct Lease {
  in_flight: Arc<Mutex<HashSet<String>>>,
  thread_id: String,
}

impl Drop for Lease {
  fn drop(&mut self) {
    lock(&self.in_flight).remove(&self.thread_id);
  }
}

fn lock(set: &Mutex<HashSet<String>>) -> std::sync::MutexGuard<'_, HashSet<String>> {
  set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GraphRunner {
  pub fn new(model: Arc<dyn LanguageModel>, checkpointer: Arc<dyn Checkpointer>) -> Self {
    Self {
      collect: CollectInputs::new(model.clone()),
      draft: DraftContent::new(model.clone()),
      design: DesignEmail::new(model, Allowlist::email()),
      checkpointer,
      in_flight: Arc::new(Mutex::new(HashSet::new())),
    }
  }

  /// Latest durable checkpoint of `thread_id`.
  #[instrument(level = "trace", skip(self))]
  pub async fn thread(&self, thread_id: &str) -> Result<Checkpoint, RunError> {
    self
      .checkpointer
      .load(thread_id)
      .await?
      .ok_or_else(|| RunError::NotFound(thread_id.to_string()))
  }

  /// Runs `request` until a stage suspends or the router ends the run.
  ///
  /// Contract violations are rejected before any stage executes. A stage
  /// failure leaves the last durable checkpoint untouched.
  #[instrument(level = "trace", skip(self, request), fields(thread_id = ?request.thread_id))]
  pub async fn invoke(&self, request: RunRequest) -> Result<RunOutcome, RunError> {
    let RunRequest {
      thread_id,
      input,
      resume,
      resume_key,
    } = request;
    if input.is_some() && resume.is_some() {
      return Err(RunError::InvalidRequest(
        "input and resume are mutually exclusive".to_string(),
      ));
    }
    let thread_id = thread_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    validate_thread_id(&thread_id)?;
    let _lease = self.acquire(&thread_id)?;

    let Some(mut checkpoint) = self.checkpointer.load(&thread_id).await? else {
      if resume.is_some() {
        return Err(RunError::NothingToResume(thread_id));
      }
      let state = WorkflowState::seeded(input.unwrap_or_default());
      let mut checkpoint = Checkpoint::new(thread_id, state, ENTRY_STAGE);
      self.persist(&mut checkpoint).await?;
      info!(thread_id = %checkpoint.thread_id, "thread created");
      return self.drive(checkpoint, None).await;
    };

    match (checkpoint.pending.clone(), resume) {
      (Some(pending), Some(value)) => {
        if let Some(given) = resume_key.filter(|k| *k != pending.resume_key) {
          return Err(RunError::StaleResume { thread_id, given });
        }
        info!(thread_id = %thread_id, stage = %pending.stage, "resuming");
        let resume = Resume {
          value,
          interrupt: pending,
        };
        self.drive(checkpoint, Some(resume)).await
      }
      (Some(_), None) => Err(RunError::ResumeRequired(thread_id)),
      (None, Some(_)) => Err(RunError::NothingToResume(thread_id)),
      (None, None) => {
        if checkpoint.state.is_terminal() {
          if input.is_some() {
            return Err(RunError::ThreadCompleted(thread_id));
          }
          return Ok(RunOutcome::Completed(CompletedRun {
            thread_id,
            state: checkpoint.state,
          }));
        }
        let restart = checkpoint.next_stage.is_none();
        if restart {
          checkpoint.next_stage = Some(ENTRY_STAGE);
        }
        if let Some(input) = input {
          input.apply_to(&mut checkpoint.state);
          self.persist(&mut checkpoint).await?;
        } else if restart {
          self.persist(&mut checkpoint).await?;
        }
        self.drive(checkpoint, None).await
      }
    }
  }

  fn acquire(&self, thread_id: &str) -> Result<Lease, RunError> {
    let mut running = lock(&self.in_flight);
    if !running.insert(thread_id.to_string()) {
      return Err(RunError::ThreadBusy(thread_id.to_string()));
    }
    Ok(Lease {
      in_flight: self.in_flight.clone(),
      thread_id: thread_id.to_string(),
    })
  }

  async fn persist(&self, checkpoint: &mut Checkpoint) -> Result<(), RunError> {
    checkpoint.advance_version();
    self.checkpointer.save(checkpoint).await?;
    Ok(())
  }

  async fn drive(
    &self,
    mut checkpoint: Checkpoint,
    mut resume: Option<Resume>,
  ) -> Result<RunOutcome, RunError> {
    while let Some(stage) = checkpoint.next_stage {
      let suspended = match stage {
        StageName::Collect => self.step(&self.collect, &mut checkpoint, resume.take()).await?,
        StageName::Draft => self.step(&self.draft, &mut checkpoint, resume.take()).await?,
        StageName::Design => self.step(&self.design, &mut checkpoint, resume.take()).await?,
      };
      if let Some(suspended) = suspended {
        return Ok(RunOutcome::Suspended(suspended));
      }
    }
    info!(
      thread_id = %checkpoint.thread_id,
      terminal = checkpoint.state.is_terminal(),
      steps = checkpoint.history.len(),
      "run ended"
    );
    Ok(RunOutcome::Completed(CompletedRun {
      thread_id: checkpoint.thread_id,
      state: checkpoint.state,
    }))
  }

  /// Runs one stage and persists its transition. Returns the suspension, if any.
  async fn step<S: Stage>(
    &self,
    stage: &S,
    checkpoint: &mut Checkpoint,
    resume: Option<Resume>,
  ) -> Result<Option<SuspendedRun>, RunError> {
    let resumed = resume.is_some();
    let outcome = match stage.run(&checkpoint.state, resume).await {
      Ok(outcome) => outcome,
      Err(source) => {
        warn!(thread_id = %checkpoint.thread_id, stage = %S::NAME, error = %source, "stage failed");
        return Err(RunError::Stage {
          stage: S::NAME,
          source,
        });
      }
    };
    if resumed {
      checkpoint.record(S::NAME, StepEvent::Resumed);
    }

    match outcome {
      StageOutcome::Suspended { update, interrupt } => {
        if let Some(update) = update {
          checkpoint.state = checkpoint.state.merged(update);
        }
        let view = InterruptView::from(&interrupt);
        checkpoint.pending = Some(interrupt);
        checkpoint.next_stage = Some(S::NAME);
        checkpoint.record(S::NAME, StepEvent::Suspended);
        self.persist(checkpoint).await?;
        info!(thread_id = %checkpoint.thread_id, stage = %S::NAME, "run suspended");
        Ok(Some(SuspendedRun {
          thread_id: checkpoint.thread_id.clone(),
          interrupt: view,
          state: checkpoint.state.clone(),
        }))
      }
      StageOutcome::Completed(update) => {
        checkpoint.state = checkpoint.state.merged(update);
        checkpoint.pending = None;
        checkpoint.next_stage = route_after(S::NAME, &checkpoint.state).next_stage();
        checkpoint.record(S::NAME, StepEvent::Completed);
        self.persist(checkpoint).await?;
        info!(
          thread_id = %checkpoint.thread_id,
          stage = %S::NAME,
          next = ?checkpoint.next_stage,
          "stage completed"
        );
        Ok(None)
      }
    }
  }
}
