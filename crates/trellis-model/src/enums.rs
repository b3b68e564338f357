use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Lifecycle state of a transformation revision.
///
/// States only move forward: a draft can be released, a released revision can
/// be disabled. No other transition is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionState {
  Draft,
  Released,
  Disabled,
}

impl RevisionState {
  pub fn as_str(&self) -> &'static str {
    match self {
      RevisionState::Draft => "draft",
      RevisionState::Released => "released",
      RevisionState::Disabled => "disabled",
    }
  }
}

impl fmt::Display for RevisionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RevisionState {
  type Err = ModelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "draft" => Ok(RevisionState::Draft),
      "released" => Ok(RevisionState::Released),
      "disabled" => Ok(RevisionState::Disabled),
      other => Err(ModelError::UnknownState(other.to_string())),
    }
  }
}

/// Kind discriminator of a transformation revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationType {
  /// Atomic unit carrying executable code.
  Component,
  /// Composite unit nesting other transformation revisions as operators.
  Workflow,
}

impl TransformationType {
  pub fn as_str(&self) -> &'static str {
    match self {
      TransformationType::Component => "component",
      TransformationType::Workflow => "workflow",
    }
  }
}

impl fmt::Display for TransformationType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TransformationType {
  type Err = ModelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "component" => Ok(TransformationType::Component),
      "workflow" => Ok(TransformationType::Workflow),
      other => Err(ModelError::UnknownType(other.to_string())),
    }
  }
}
