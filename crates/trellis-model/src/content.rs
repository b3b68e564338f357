use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::TransformationType;

/// The composition graph carried by a workflow revision.
///
/// Nesting is structural containment: every operator instantiates another
/// transformation revision inside this workflow. The closure maintainer walks
/// these operators (and, for workflow operators, the operators of the
/// referenced revision's own content) to materialize transitive reachability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContent {
  #[serde(default)]
  pub operators: Vec<Operator>,
}

impl WorkflowContent {
  /// Content with no operators, the starting point of a new workflow draft.
  pub fn empty() -> Self {
    Self::default()
  }
}

/// An instance of a child transformation embedded in a workflow's content.
///
/// The operator id is unique within the owning workflow; the same
/// transformation revision can be instantiated more than once under distinct
/// operator ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
  pub id: Uuid,
  pub name: String,
  pub transformation_id: Uuid,
  #[serde(rename = "type")]
  pub transformation_type: TransformationType,
  pub version_tag: String,
}

impl Operator {
  /// Create an operator instantiating the given transformation revision.
  pub fn new(
    name: impl Into<String>,
    transformation_id: Uuid,
    transformation_type: TransformationType,
    version_tag: impl Into<String>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      transformation_id,
      transformation_type,
      version_tag: version_tag.into(),
    }
  }
}

/// New content for a draft revision, one variant per transformation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionContent {
  Code(String),
  Workflow(WorkflowContent),
}
