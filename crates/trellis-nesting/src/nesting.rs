use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trellis_model::Operator;

/// One closure-table row: a transformation reachable inside `workflow_id`'s
/// transitive composition graph.
///
/// `via_transformation_id`/`via_operator_id` name the *direct child* operator
/// of `workflow_id` through which the nested transformation is reached; at
/// depth 1 the direct child is the nested entity itself, so the via and
/// nested pairs coincide. `(workflow_id, via_operator_id, depth,
/// nested_operator_id)` identifies a row uniquely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nesting {
  pub workflow_id: Uuid,
  pub via_transformation_id: Uuid,
  pub via_operator_id: Uuid,
  pub depth: u32,
  pub nested_transformation_id: Uuid,
  pub nested_operator_id: Uuid,
}

impl Nesting {
  /// Row for a direct child operator of the workflow.
  pub fn direct(workflow_id: Uuid, operator: &Operator) -> Self {
    Self {
      workflow_id,
      via_transformation_id: operator.transformation_id,
      via_operator_id: operator.id,
      depth: 1,
      nested_transformation_id: operator.transformation_id,
      nested_operator_id: operator.id,
    }
  }

  pub fn is_direct(&self) -> bool {
    self.depth == 1
  }

  /// The depth/identity coupling invariant: at depth 1 the via pair equals
  /// the nested pair, below depth 1 they differ in at least one component.
  pub fn holds_depth_invariant(&self) -> bool {
    let identical = self.via_transformation_id == self.nested_transformation_id
      && self.via_operator_id == self.nested_operator_id;
    (self.depth == 1) == identical
  }
}

/// A reachable transformation at a given depth, as returned by closure
/// queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descendant {
  pub depth: u32,
  pub transformation_id: Uuid,
  pub operator_id: Uuid,
}
