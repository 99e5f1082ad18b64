//! System prompts and structured-output schemas.

use serde_json::json;

use crate::model::OutputSchema;

pub(crate) const COLLECT_SYSTEM: &str = "You extract email campaign inputs from a user's reply. \
Return only fields the reply actually states. Leave everything else null. \
urls and image urls must be absolute http(s) links.";

pub(crate) const DRAFT_SYSTEM: &str = "You are an email copywriter. Write a marketing email for \
the given topic and audience using the supplied draft notes and reference links. Return a subject \
line, a short preheader and a plain-text body.";

pub(crate) const DESIGN_SYSTEM: &str = "You are an email developer. Turn the approved plain-text \
email into a complete HTML email. Use table-based layout, inline CSS only, no scripts, no external \
stylesheets, no forms. Reflect the brand style (tone, palette, fonts, logo) when given, place the \
listed images with their alt text and link the reference urls. Return only the HTML document.";

/// Extra instruction naming the fields the human was asked for.
pub(crate) fn collect_system_prompt(expected: &[String]) -> String {
  if expected.is_empty() {
    return COLLECT_SYSTEM.to_string();
  }
  format!("{COLLECT_SYSTEM} The user was asked for: {}.", expected.join(", "))
}

fn nullable_string() -> serde_json::Value {
  json!({ "type": ["string", "null"] })
}

pub(crate) fn collect_schema() -> OutputSchema {
  OutputSchema {
    name: "collected_inputs",
    schema: json!({
      "type": "object",
      "properties": {
        "topic": nullable_string(),
        "audience": nullable_string(),
        "contentDraft": nullable_string(),
        "urls": { "type": ["array", "null"], "items": { "type": "string" } },
        "images": {
          "type": ["array", "null"],
          "items": {
            "type": "object",
            "properties": { "url": { "type": "string" }, "alt": nullable_string() },
            "required": ["url"]
          }
        },
        "brandStyle": {
          "type": ["object", "null"],
          "properties": {
            "tone": nullable_string(),
            "palette": { "type": "array", "items": { "type": "string" } },
            "fonts": { "type": "array", "items": { "type": "string" } },
            "logoUrl": nullable_string()
          }
        }
      }
    }),
  }
}

pub(crate) fn draft_schema() -> OutputSchema {
  OutputSchema {
    name: "email_draft",
    schema: json!({
      "type": "object",
      "properties": {
        "subject": { "type": "string" },
        "preheader": { "type": "string" },
        "body": { "type": "string" }
      },
      "required": ["subject", "preheader", "body"],
      "additionalProperties": false
    }),
  }
}
