//! Names of the workflow stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
  Collect,
  Draft,
  Design,
}

impl StageName {
  /// All stages in pipeline order.
  pub const ALL: [StageName; 3] = [StageName::Collect, StageName::Draft, StageName::Design];

  pub fn as_str(&self) -> &'static str {
    match self {
      StageName::Collect => "collect",
      StageName::Draft => "draft",
      StageName::Design => "design",
    }
  }
}

impl fmt::Display for StageName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
