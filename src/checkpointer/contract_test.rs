//! Behaviour every `Checkpointer` backend must share.

use crate::checkpointer::Checkpointer;
use crate::error::CheckpointError;
use crate::types::{
  Checkpoint, CollectedInputs, Interrupt, StageName, StepEvent, WorkflowState,
};

pub(crate) fn fresh(thread_id: &str) -> Checkpoint {
  let state = WorkflowState::seeded(CollectedInputs {
    topic: Some("solar".to_string()),
    ..CollectedInputs::default()
  });
  let mut cp = Checkpoint::new(thread_id, state, StageName::Collect);
  cp.advance_version();
  cp
}

pub(crate) async fn missing_thread_loads_none(store: &dyn Checkpointer) {
  assert!(store.load("nobody").await.unwrap().is_none());
}

pub(crate) async fn save_then_load_round_trips(store: &dyn Checkpointer) {
  let mut cp = fresh("t-1");
  cp.pending = Some(Interrupt::new(StageName::Collect, "what topic?").with_expected(["topic"]));
  cp.record(StageName::Collect, StepEvent::Suspended);
  store.save(&cp).await.unwrap();
  let loaded = store.load("t-1").await.unwrap().unwrap();
  assert_eq!(loaded, cp);
}

pub(crate) async fn versions_must_advance_by_one(store: &dyn Checkpointer) {
  let mut cp = fresh("t-2");
  store.save(&cp).await.unwrap();

  // Re-saving version 1 means someone else created the thread first.
  let err = store.save(&cp).await.unwrap_err();
  assert!(matches!(
    err,
    CheckpointError::Conflict {
      expected: 0,
      found: 1,
      ..
    }
  ));

  cp.advance_version();
  store.save(&cp).await.unwrap();

  let mut stale = cp.clone();
  stale.version = 2;
  let err = store.save(&stale).await.unwrap_err();
  assert!(matches!(err, CheckpointError::Conflict { found: 2, .. }));

  let mut skipped = cp.clone();
  skipped.version = 5;
  assert!(store.save(&skipped).await.is_err());
  assert_eq!(store.load("t-2").await.unwrap().unwrap().version, 2);
}

pub(crate) async fn rejects_bad_thread_ids(store: &dyn Checkpointer) {
  for bad in ["", "../etc/passwd", "a b", "x".repeat(129).as_str()] {
    assert!(
      matches!(store.load(bad).await, Err(CheckpointError::InvalidThreadId(_))),
      "{bad}"
    );
  }
  let mut cp = fresh("ok");
  cp.thread_id = "a/b".to_string();
  assert!(matches!(
    store.save(&cp).await,
    Err(CheckpointError::InvalidThreadId(_))
  ));
}

pub(crate) async fn threads_are_independent(store: &dyn Checkpointer) {
  store.save(&fresh("alpha")).await.unwrap();
  store.save(&fresh("beta")).await.unwrap();
  let mut alpha = store.load("alpha").await.unwrap().unwrap();
  alpha.state.audience = Some("homeowners".to_string());
  alpha.advance_version();
  store.save(&alpha).await.unwrap();
  let beta = store.load("beta").await.unwrap().unwrap();
  assert_eq!(beta.version, 1);
  assert!(beta.state.audience.is_none());
}

pub(crate) async fn run_all(store: &dyn Checkpointer) {
  missing_thread_loads_none(store).await;
  save_then_load_round_trips(store).await;
  versions_must_advance_by_one(store).await;
  rejects_bad_thread_ids(store).await;
  threads_are_independent(store).await;
}

#[test]
fn thread_id_rules() {
  use crate::checkpointer::validate_thread_id;
  assert!(validate_thread_id("abc-DEF_123").is_ok());
  assert!(validate_thread_id(&"a".repeat(128)).is_ok());
  assert!(validate_thread_id(&"a".repeat(129)).is_err());
  assert!(validate_thread_id("a.b").is_err());
}

#[test]
fn version_check() {
  use crate::checkpointer::check_version;
  assert!(check_version("t", None, 1).is_ok());
  assert!(check_version("t", Some(3), 4).is_ok());
  assert!(check_version("t", None, 0).is_err());
  assert!(check_version("t", Some(1), 1).is_err());
  assert!(check_version("t", None, 2).is_err());
}
