//! Tests for `DesignEmail`.

use std::sync::Arc;

use super::{DesignEmail, Stage, StageOutcome};
use crate::error::StageError;
use crate::html::Allowlist;
use crate::model::{ModelCall, ModelError, ScriptedModel};
use crate::types::{BrandStyle, CollectedInputs, DraftDecision, EmailImage, WorkflowState};

fn drafted_state() -> WorkflowState {
  WorkflowState::seeded(CollectedInputs {
    topic: Some("solar".to_string()),
    urls: Some(vec!["https://solar.example".to_string()]),
    images: Some(vec![EmailImage {
      url: "https://cdn.example/panel.png".to_string(),
      alt: Some("Panel".to_string()),
    }]),
    brand_style: Some(BrandStyle {
      palette: vec!["#ffaa00".to_string()],
      ..BrandStyle::default()
    }),
    ..CollectedInputs::default()
  })
  .merged(DraftDecision {
    plain_text_draft: "Subject: s\nPreheader: p\n\nbody".to_string(),
    confirmed_plain_text: true,
  })
}

#[tokio::test]
async fn renders_inlined_sanitized_html() {
  let model = Arc::new(ScriptedModel::new());
  model.push_text(
    "```html\n<html><head><style>td { color: #ffaa00 }</style></head><body>\
     <table><tr><td onclick=\"x()\">Hello</td></tr></table>\
     <script>alert(1)</script></body></html>\n```",
  );
  let outcome = DesignEmail::new(model.clone(), Allowlist::email())
    .run(&drafted_state(), None)
    .await
    .unwrap();
  let StageOutcome::Completed(designed) = outcome else {
    panic!("design never suspends");
  };
  let html = designed.final_html;
  assert!(html.contains(r#"<td style="color: #ffaa00">Hello</td>"#), "{html}");
  assert!(!html.contains("<script"), "{html}");
  assert!(!html.contains("<style"), "{html}");
  assert!(!html.contains("```"), "{html}");

  let calls = model.calls();
  let ModelCall::Generate { user_payload, .. } = &calls[0] else {
    panic!("design must call generate_text");
  };
  let payload: serde_json::Value = serde_json::from_str(user_payload).unwrap();
  assert_eq!(payload["images"][0]["alt"], "Panel");
  assert_eq!(payload["brandStyle"]["palette"][0], "#ffaa00");
  assert_eq!(payload["urls"][0], "https://solar.example");
}

#[tokio::test]
async fn missing_draft_fails_precondition() {
  let model = Arc::new(ScriptedModel::new());
  let err = DesignEmail::new(model, Allowlist::email())
    .run(&WorkflowState::default(), None)
    .await
    .unwrap_err();
  assert!(matches!(err, StageError::Precondition(_)));
}

#[tokio::test]
async fn model_failure_is_upstream() {
  let model = Arc::new(ScriptedModel::new());
  model.push_text_result(Err(ModelError::Api {
    status: 500,
    message: "boom".to_string(),
  }));
  let err = DesignEmail::new(model, Allowlist::email())
    .run(&drafted_state(), None)
    .await
    .unwrap_err();
  assert!(matches!(err, StageError::Upstream(_)));
}

#[test]
fn script_only_output_is_post_process_error() {
  let stage = DesignEmail::new(Arc::new(ScriptedModel::new()), Allowlist::email());
  assert!(matches!(
    stage.post_process("<script>alert(1)</script>"),
    Err(StageError::PostProcess(_))
  ));
}
