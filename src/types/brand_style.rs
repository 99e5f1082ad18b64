//! Brand styling hints passed to the design stage.

use serde::{Deserialize, Serialize};

/// Optional brand styling: tone, color palette, fonts and logo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandStyle {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tone: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub palette: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub fonts: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub logo_url: Option<String>,
}

impl BrandStyle {
  /// True when no field carries a value.
  pub fn is_empty(&self) -> bool {
    self.tone.as_deref().is_none_or(|t| t.trim().is_empty())
      && self.palette.is_empty()
      && self.fonts.is_empty()
      && self.logo_url.is_none()
  }
}
