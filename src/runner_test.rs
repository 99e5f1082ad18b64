//! Tests for `GraphRunner`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::checkpointer::{Checkpointer, MemoryCheckpointer};
use crate::error::{ErrorKind, RunError, StageError};
use crate::model::{LanguageModel, ModelError, OutputSchema, ScriptedModel};
use crate::runner::GraphRunner;
use crate::types::{CollectedInputs, RunOutcome, RunRequest, StageName, StepEvent};

const DESIGN_HTML: &str = "<table><tr><td>Go solar</td></tr></table><script>alert(1)</script>";

fn setup() -> (Arc<ScriptedModel>, Arc<MemoryCheckpointer>, GraphRunner) {
  let model = Arc::new(ScriptedModel::new());
  let store = Arc::new(MemoryCheckpointer::new());
  let runner = GraphRunner::new(model.clone(), store.clone());
  (model, store, runner)
}

fn script_collect(model: &ScriptedModel) {
  model.push_extraction(json!({
    "topic": "solar panels",
    "audience": "homeowners",
    "contentDraft": "Panels pay for themselves."
  }));
}

fn script_draft(model: &ScriptedModel) {
  model.push_extraction(json!({
    "subject": "Go solar",
    "preheader": "Lower bills",
    "body": "Dear homeowner, panels pay for themselves."
  }));
}

const DRAFT_BLOCK: &str =
  "Subject: Go solar\nPreheader: Lower bills\n\nDear homeowner, panels pay for themselves.";

/// Starts a thread with no input; it suspends in CollectInputs.
async fn suspended_thread(runner: &GraphRunner) -> String {
  let outcome = runner
    .invoke(RunRequest::start(CollectedInputs::default()))
    .await
    .unwrap();
  outcome.thread_id().to_string()
}

#[tokio::test]
async fn empty_input_suspends_and_persists_what_it_returns() {
  let (model, store, runner) = setup();
  let outcome = runner
    .invoke(RunRequest::start(CollectedInputs::default()))
    .await
    .unwrap();
  let interrupt = outcome.interrupt().unwrap();
  assert_eq!(interrupt.stage, StageName::Collect);
  assert!(interrupt.expected.contains(&"topic".to_string()));
  assert!(model.calls().is_empty());

  let cp = store.load(outcome.thread_id()).await.unwrap().unwrap();
  assert_eq!(&cp.state, outcome.state());
  assert_eq!(cp.version, 2);
  assert_eq!(cp.next_stage, Some(StageName::Collect));
  assert_eq!(cp.pending.unwrap().resume_key, interrupt.resume_key);
}

#[tokio::test]
async fn full_run_with_approval() {
  let (model, store, runner) = setup();
  let thread_id = suspended_thread(&runner).await;

  script_collect(&model);
  script_draft(&model);
  let outcome = runner
    .invoke(RunRequest::resume(&thread_id, "Topic: solar panels, audience: homeowners"))
    .await
    .unwrap();
  let interrupt = outcome.interrupt().unwrap();
  assert_eq!(interrupt.stage, StageName::Draft);
  assert!(interrupt.question.contains(DRAFT_BLOCK));
  assert_eq!(outcome.state().topic.as_deref(), Some("solar panels"));
  assert_eq!(outcome.state().stage, Some(StageName::Collect));

  model.push_text(DESIGN_HTML);
  let outcome = runner
    .invoke(RunRequest::resume(&thread_id, " Approve "))
    .await
    .unwrap();
  let RunOutcome::Completed(done) = outcome else {
    panic!("expected terminal state");
  };
  assert_eq!(done.state.plain_text_draft.as_deref(), Some(DRAFT_BLOCK));
  assert!(done.state.confirmed_plain_text);
  assert_eq!(done.state.stage, Some(StageName::Design));
  let html = done.state.final_html.as_deref().unwrap();
  assert!(html.contains("Go solar"));
  assert!(!html.contains("<script"));

  let cp = store.load(&thread_id).await.unwrap().unwrap();
  assert_eq!(cp.state, done.state);
  assert!(cp.pending.is_none());
  assert_eq!(cp.next_stage, None);
  let events: Vec<(StageName, StepEvent)> = cp.history.iter().map(|e| (e.stage, e.event)).collect();
  assert_eq!(
    events,
    vec![
      (StageName::Collect, StepEvent::Suspended),
      (StageName::Collect, StepEvent::Resumed),
      (StageName::Collect, StepEvent::Completed),
      (StageName::Draft, StepEvent::Suspended),
      (StageName::Draft, StepEvent::Resumed),
      (StageName::Draft, StepEvent::Completed),
      (StageName::Design, StepEvent::Completed),
    ]
  );
}

#[tokio::test]
async fn draft_suspension_returns_the_exact_draft_block() {
  let (model, _store, runner) = setup();
  let thread_id = suspended_thread(&runner).await;
  script_collect(&model);
  script_draft(&model);
  let outcome = runner
    .invoke(RunRequest::resume(&thread_id, "solar panels for homeowners"))
    .await
    .unwrap();
  let interrupt = outcome.interrupt().unwrap();
  assert_eq!(interrupt.stage, StageName::Draft);
  assert_eq!(interrupt.payload.as_deref(), Some(DRAFT_BLOCK));

  let draft = interrupt.payload.clone().unwrap();
  model.push_text(DESIGN_HTML);
  let outcome = runner
    .invoke(RunRequest::resume(&thread_id, "APPROVE"))
    .await
    .unwrap();
  assert_eq!(outcome.state().plain_text_draft.as_deref(), Some(draft.as_str()));
  assert!(outcome.state().confirmed_plain_text);
}

#[tokio::test]
async fn rejection_replaces_draft_and_still_designs() {
  let (model, _store, runner) = setup();
  script_draft(&model);
  let outcome = runner
    .invoke(RunRequest::start(CollectedInputs {
      topic: Some("solar".to_string()),
      urls: Some(vec!["https://solar.example".to_string()]),
      ..CollectedInputs::default()
    }))
    .await
    .unwrap();
  assert_eq!(outcome.interrupt().unwrap().stage, StageName::Draft);

  model.push_text("<p>mine</p>");
  let outcome = runner
    .invoke(RunRequest::resume(outcome.thread_id(), "My own email text"))
    .await
    .unwrap();
  let state = outcome.state();
  assert_eq!(state.plain_text_draft.as_deref(), Some("My own email text"));
  assert!(!state.confirmed_plain_text);
  assert_eq!(state.final_html.as_deref(), Some("<p>mine</p>"));
}

#[tokio::test]
async fn partial_reply_reasks_and_keeps_merged_fields() {
  let (model, store, runner) = setup();
  let thread_id = suspended_thread(&runner).await;

  model.push_extraction(json!({"topic": "T"}));
  let outcome = runner
    .invoke(RunRequest::resume(&thread_id, "it is about T"))
    .await
    .unwrap();
  let interrupt = outcome.interrupt().unwrap();
  assert_eq!(interrupt.stage, StageName::Collect);
  assert!(!interrupt.expected.contains(&"topic".to_string()));
  assert_eq!(outcome.state().topic.as_deref(), Some("T"));
  assert_eq!(outcome.state().stage, Some(StageName::Collect));
  assert_eq!(
    store.load(&thread_id).await.unwrap().unwrap().state.topic.as_deref(),
    Some("T")
  );

  model.push_extraction(json!({"contentDraft": "body text"}));
  script_draft(&model);
  let outcome = runner
    .invoke(RunRequest::resume(&thread_id, "body text"))
    .await
    .unwrap();
  assert_eq!(outcome.interrupt().unwrap().stage, StageName::Draft);
}

#[tokio::test]
async fn contract_violations_are_rejected_before_stages_run() {
  let (model, _store, runner) = setup();

  let both = RunRequest {
    input: Some(CollectedInputs::default()),
    resume: Some("x".to_string()),
    ..RunRequest::default()
  };
  assert!(matches!(
    runner.invoke(both).await,
    Err(RunError::InvalidRequest(_))
  ));
  assert!(matches!(
    runner.invoke(RunRequest::resume("unknown", "x")).await,
    Err(RunError::NothingToResume(_))
  ));
  assert!(matches!(
    runner
      .invoke(RunRequest::default().with_thread_id("bad id!"))
      .await
      .map_err(|e| e.kind()),
    Err(ErrorKind::Contract)
  ));

  let thread_id = suspended_thread(&runner).await;
  let err = runner
    .invoke(RunRequest::default().with_thread_id(&thread_id))
    .await
    .unwrap_err();
  assert!(matches!(err, RunError::ResumeRequired(_)));
  let err = runner
    .invoke(RunRequest::start(CollectedInputs::default()).with_thread_id(&thread_id))
    .await
    .unwrap_err();
  assert!(matches!(err, RunError::ResumeRequired(_)));

  let stale = RunRequest {
    resume_key: Some("not-the-key".to_string()),
    ..RunRequest::resume(&thread_id, "x")
  };
  assert!(matches!(
    runner.invoke(stale).await,
    Err(RunError::StaleResume { .. })
  ));
  assert!(model.calls().is_empty());
}

#[tokio::test]
async fn matching_resume_key_is_accepted() {
  let (model, store, runner) = setup();
  let thread_id = suspended_thread(&runner).await;
  let key = store
    .load(&thread_id)
    .await
    .unwrap()
    .unwrap()
    .pending
    .unwrap()
    .resume_key;
  script_collect(&model);
  script_draft(&model);
  let request = RunRequest {
    resume_key: Some(key),
    ..RunRequest::resume(&thread_id, "all of it")
  };
  let outcome = runner.invoke(request).await.unwrap();
  assert_eq!(outcome.interrupt().unwrap().stage, StageName::Draft);
}

#[tokio::test]
async fn stage_failure_keeps_last_checkpoint_and_can_be_retried() {
  let (model, store, runner) = setup();
  let thread_id = suspended_thread(&runner).await;
  let before = store.load(&thread_id).await.unwrap().unwrap();

  model.push_extraction_result(Err(ModelError::InvalidResponse("garbled".to_string())));
  let err = runner
    .invoke(RunRequest::resume(&thread_id, "solar"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    RunError::Stage {
      stage: StageName::Collect,
      source: StageError::Validation(_),
    }
  ));
  assert_eq!(store.load(&thread_id).await.unwrap().unwrap(), before);

  script_collect(&model);
  model.push_extraction_result(Err(ModelError::Api {
    status: 503,
    message: "overloaded".to_string(),
  }));
  let err = runner
    .invoke(RunRequest::resume(&thread_id, "solar, homeowners, panels"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Upstream);
  let cp = store.load(&thread_id).await.unwrap().unwrap();
  assert_eq!(cp.next_stage, Some(StageName::Draft));
  assert!(cp.pending.is_none());
  assert_eq!(cp.state.topic.as_deref(), Some("solar panels"));

  script_draft(&model);
  let outcome = runner
    .invoke(RunRequest::default().with_thread_id(&thread_id))
    .await
    .unwrap();
  assert_eq!(outcome.interrupt().unwrap().stage, StageName::Draft);
}

#[tokio::test]
async fn terminal_thread_is_idempotent_and_refuses_new_input() {
  let (model, _store, runner) = setup();
  script_draft(&model);
  let outcome = runner
    .invoke(RunRequest::start(CollectedInputs {
      topic: Some("solar".to_string()),
      content_draft: Some("panels".to_string()),
      ..CollectedInputs::default()
    }))
    .await
    .unwrap();
  let thread_id = outcome.thread_id().to_string();
  model.push_text("<p>done</p>");
  let done = runner
    .invoke(RunRequest::resume(&thread_id, "approve"))
    .await
    .unwrap();

  let again = runner
    .invoke(RunRequest::default().with_thread_id(&thread_id))
    .await
    .unwrap();
  assert_eq!(again, done);
  assert!(matches!(
    runner
      .invoke(RunRequest::start(CollectedInputs::default()).with_thread_id(&thread_id))
      .await,
    Err(RunError::ThreadCompleted(_))
  ));
  assert!(matches!(
    runner.invoke(RunRequest::resume(&thread_id, "approve")).await,
    Err(RunError::NothingToResume(_))
  ));
}

#[tokio::test]
async fn thread_lookup() {
  let (_model, _store, runner) = setup();
  assert!(matches!(
    runner.thread("missing").await,
    Err(RunError::NotFound(_))
  ));
  let thread_id = suspended_thread(&runner).await;
  let cp = runner.thread(&thread_id).await.unwrap();
  assert!(cp.is_suspended());
}

/// Delays every call so a second caller can arrive mid-run.
struct SlowModel {
  inner: ScriptedModel,
  delay: Duration,
}

#[async_trait]
impl LanguageModel for SlowModel {
  async fn extract_structured(
    &self,
    system_prompt: &str,
    schema: &OutputSchema,
    user_text: &str,
  ) -> Result<Value, ModelError> {
    tokio::time::sleep(self.delay).await;
    self
      .inner
      .extract_structured(system_prompt, schema, user_text)
      .await
  }

  async fn generate_text(
    &self,
    system_prompt: &str,
    user_payload: &str,
  ) -> Result<String, ModelError> {
    tokio::time::sleep(self.delay).await;
    self.inner.generate_text(system_prompt, user_payload).await
  }
}

fn slow(delay_ms: u64) -> Arc<SlowModel> {
  Arc::new(SlowModel {
    inner: ScriptedModel::new(),
    delay: Duration::from_millis(delay_ms),
  })
}

#[tokio::test]
async fn second_caller_on_same_thread_is_rejected() {
  let model = slow(200);
  let store = Arc::new(MemoryCheckpointer::new());
  let runner = Arc::new(GraphRunner::new(model.clone(), store));
  let thread_id = suspended_thread(&runner).await;
  script_collect(&model.inner);
  script_draft(&model.inner);

  let first = {
    let runner = runner.clone();
    let thread_id = thread_id.clone();
    tokio::spawn(async move { runner.invoke(RunRequest::resume(thread_id, "solar")).await })
  };
  tokio::time::sleep(Duration::from_millis(20)).await;
  let err = runner
    .invoke(RunRequest::resume(&thread_id, "again"))
    .await
    .unwrap_err();
  assert!(matches!(err, RunError::ThreadBusy(_)));
  assert_eq!(err.kind(), ErrorKind::Conflict);

  let outcome = first.await.unwrap().unwrap();
  assert_eq!(outcome.interrupt().unwrap().stage, StageName::Draft);
  // The lease is released once the first call returns.
  assert!(runner.thread(&thread_id).await.is_ok());
}

#[tokio::test]
async fn slower_writer_from_another_runner_gets_conflict() {
  let store = Arc::new(MemoryCheckpointer::new());
  let slow_model = slow(200);
  let fast_model = Arc::new(ScriptedModel::new());
  let slow_runner = Arc::new(GraphRunner::new(slow_model.clone(), store.clone()));
  let fast_runner = GraphRunner::new(fast_model.clone(), store.clone());
  let thread_id = suspended_thread(&fast_runner).await;

  script_collect(&slow_model.inner);
  script_draft(&slow_model.inner);
  script_collect(&fast_model);
  script_draft(&fast_model);

  let slow_call = {
    let runner = slow_runner.clone();
    let thread_id = thread_id.clone();
    tokio::spawn(async move { runner.invoke(RunRequest::resume(thread_id, "solar")).await })
  };
  tokio::time::sleep(Duration::from_millis(20)).await;
  let fast = fast_runner
    .invoke(RunRequest::resume(&thread_id, "solar"))
    .await
    .unwrap();
  assert_eq!(fast.interrupt().unwrap().stage, StageName::Draft);

  let err = slow_call.await.unwrap().unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert_eq!(store.load(&thread_id).await.unwrap().unwrap().version, 4);
}
