//! Image reference embedded in the designed email.

use serde::{Deserialize, Serialize};

/// An image the email should reference, with optional alt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailImage {
  pub url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub alt: Option<String>,
}
