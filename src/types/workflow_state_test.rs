//! Tests for `WorkflowState`.

use super::{CollectedInputs, DesignedEmail, DraftDecision, StageName, WorkflowState};

fn inputs(topic: Option<&str>, draft: Option<&str>, urls: &[&str]) -> CollectedInputs {
  CollectedInputs {
    topic: topic.map(String::from),
    content_draft: draft.map(String::from),
    urls: if urls.is_empty() {
      None
    } else {
      Some(urls.iter().map(|u| u.to_string()).collect())
    },
    ..CollectedInputs::default()
  }
}

#[test]
fn empty_state_is_incomplete_and_missing_everything() {
  let state = WorkflowState::default();
  assert!(!state.input_collection_complete());
  assert!(!state.content_draft_complete());
  assert_eq!(
    state.missing_inputs(),
    vec!["topic", "audience", "contentDraft", "urls"]
  );
}

#[test]
fn topic_with_draft_is_complete() {
  let state = WorkflowState::seeded(inputs(Some("Solar"), Some("Body"), &[]));
  assert!(state.input_collection_complete());
  assert_eq!(state.missing_inputs(), vec!["audience"]);
}

#[test]
fn topic_with_urls_is_complete() {
  let state = WorkflowState::seeded(inputs(Some("Solar"), None, &["https://example.com"]));
  assert!(state.input_collection_complete());
}

#[test]
fn blank_topic_does_not_count() {
  let mut state = WorkflowState::seeded(inputs(None, Some("Body"), &[]));
  state.topic = Some("   ".to_string());
  assert!(!state.input_collection_complete());
  assert!(state.missing_inputs().contains(&"topic"));
}

#[test]
fn seeded_does_not_mark_a_stage() {
  let state = WorkflowState::seeded(inputs(Some("Solar"), Some("Body"), &[]));
  assert_eq!(state.stage, None);
}

#[test]
fn merged_returns_new_record_and_sets_stage() {
  let before = WorkflowState::seeded(inputs(Some("Solar"), Some("Body"), &[]));
  let after = before.merged(DraftDecision {
    plain_text_draft: "Subject: Hi".to_string(),
    confirmed_plain_text: true,
  });
  assert_eq!(before.plain_text_draft, None);
  assert_eq!(after.plain_text_draft.as_deref(), Some("Subject: Hi"));
  assert_eq!(after.stage, Some(StageName::Draft));
  assert_eq!(after.topic, before.topic);
  assert!(after.content_draft_complete());
}

#[test]
fn empty_plain_text_draft_is_not_complete() {
  let state = WorkflowState::default().merged(DraftDecision {
    plain_text_draft: String::new(),
    confirmed_plain_text: false,
  });
  assert!(!state.content_draft_complete());
}

#[test]
fn terminal_requires_design_stage_and_html() {
  let state = WorkflowState::default();
  assert!(!state.is_terminal());
  let designed = state.merged(DesignedEmail {
    final_html: "<p>x</p>".to_string(),
  });
  assert!(designed.is_terminal());
}

#[test]
fn serializes_with_camel_case_keys() {
  let state = WorkflowState::seeded(inputs(Some("Solar"), Some("Body"), &["https://a.example"]));
  let json = serde_json::to_value(&state).unwrap();
  assert_eq!(json["topic"], "Solar");
  assert_eq!(json["contentDraft"], "Body");
  assert_eq!(json["urls"], serde_json::json!(["https://a.example"]));
  assert_eq!(json["confirmedPlainText"], false);
  assert!(json.get("finalHtml").is_none());
}
