use std::collections::HashMap;

use uuid::Uuid;

use trellis_model::{TransformationType, WorkflowContent};

use crate::error::NestingError;
use crate::nesting::{Descendant, Nesting};

/// Recompute the complete closure row set for one workflow.
///
/// `contents` maps every workflow revision id to its content; the workflow
/// being rebuilt passes its (possibly not yet persisted) content separately
/// so the pass can run before the entity write lands.
///
/// The traversal is depth-first over operator instances. Every direct child
/// operator yields a depth-1 row, and for workflow operators every descendant
/// of the referenced revision is re-emitted one level deeper with the direct
/// child as its via pair.
///
/// # Errors
/// Returns `NestingError::CyclicDependency` if a transformation is reachable
/// from itself, and `NestingError::MissingContent` if a workflow operator
/// references a revision absent from `contents`. In both cases no rows are
/// produced; the caller keeps the previously stored closure.
pub fn build_nestings(
  workflow_id: Uuid,
  content: &WorkflowContent,
  contents: &HashMap<Uuid, WorkflowContent>,
) -> Result<Vec<Nesting>, NestingError> {
  let mut traversal = Traversal::new(contents);
  let root = traversal.enter(workflow_id)?;

  let mut rows = Vec::new();
  for operator in &content.operators {
    rows.push(Nesting::direct(workflow_id, operator));

    if operator.transformation_type == TransformationType::Workflow {
      for descendant in traversal.descend(operator.transformation_id)? {
        rows.push(Nesting {
          workflow_id,
          via_transformation_id: operator.transformation_id,
          via_operator_id: operator.id,
          depth: descendant.depth + 1,
          nested_transformation_id: descendant.transformation_id,
          nested_operator_id: descendant.operator_id,
        });
      }
    }
  }

  traversal.leave(root);
  Ok(rows)
}

/// Arena-style cycle-checking traversal state.
///
/// Transformations get dense indices on first visit; `on_path` marks the
/// indices of the current nesting path, so a back-edge is a single bit test.
struct Traversal<'a> {
  contents: &'a HashMap<Uuid, WorkflowContent>,
  indices: HashMap<Uuid, usize>,
  on_path: Vec<bool>,
}

impl<'a> Traversal<'a> {
  fn new(contents: &'a HashMap<Uuid, WorkflowContent>) -> Self {
    Self {
      contents,
      indices: HashMap::new(),
      on_path: Vec::new(),
    }
  }

  fn slot(&mut self, transformation_id: Uuid) -> usize {
    match self.indices.get(&transformation_id) {
      Some(&slot) => slot,
      None => {
        let slot = self.on_path.len();
        self.indices.insert(transformation_id, slot);
        self.on_path.push(false);
        slot
      }
    }
  }

  fn enter(&mut self, transformation_id: Uuid) -> Result<usize, NestingError> {
    let slot = self.slot(transformation_id);
    if self.on_path[slot] {
      return Err(NestingError::CyclicDependency(transformation_id));
    }
    self.on_path[slot] = true;
    Ok(slot)
  }

  fn leave(&mut self, slot: usize) {
    self.on_path[slot] = false;
  }

  /// All transformations reachable inside the given workflow, with depths
  /// relative to it.
  fn descend(&mut self, workflow_id: Uuid) -> Result<Vec<Descendant>, NestingError> {
    let slot = self.enter(workflow_id)?;
    let content = self
      .contents
      .get(&workflow_id)
      .ok_or(NestingError::MissingContent(workflow_id))?;

    let mut descendants = Vec::new();
    for operator in &content.operators {
      descendants.push(Descendant {
        depth: 1,
        transformation_id: operator.transformation_id,
        operator_id: operator.id,
      });

      if operator.transformation_type == TransformationType::Workflow {
        for descendant in self.descend(operator.transformation_id)? {
          descendants.push(Descendant {
            depth: descendant.depth + 1,
            ..descendant
          });
        }
      }
    }

    self.leave(slot);
    Ok(descendants)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use trellis_model::Operator;

  fn component_operator(name: &str) -> Operator {
    Operator::new(name, Uuid::new_v4(), TransformationType::Component, "1.0.0")
  }

  fn workflow_operator(name: &str, transformation_id: Uuid) -> Operator {
    Operator::new(name, transformation_id, TransformationType::Workflow, "1.0.0")
  }

  #[test]
  fn test_empty_workflow_has_no_rows() {
    let rows = build_nestings(Uuid::new_v4(), &WorkflowContent::empty(), &HashMap::new())
      .expect("empty content");
    assert!(rows.is_empty());
  }

  #[test]
  fn test_direct_child_component() {
    let workflow_id = Uuid::new_v4();
    let operator = component_operator("c1");
    let content = WorkflowContent {
      operators: vec![operator.clone()],
    };

    let rows = build_nestings(workflow_id, &content, &HashMap::new()).expect("build");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], Nesting::direct(workflow_id, &operator));
    assert!(rows[0].is_direct());
  }

  #[test]
  fn test_nested_workflow_depths_and_via() {
    // w1 contains w2 (via o2), w2 contains c1 (via o3).
    let w1 = Uuid::new_v4();
    let w2 = Uuid::new_v4();

    let o3 = component_operator("c1");
    let c1 = o3.transformation_id;
    let o2 = workflow_operator("w2", w2);

    let mut contents = HashMap::new();
    contents.insert(
      w2,
      WorkflowContent {
        operators: vec![o3.clone()],
      },
    );
    let w1_content = WorkflowContent {
      operators: vec![o2.clone()],
    };

    let rows = build_nestings(w1, &w1_content, &contents).expect("build");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], Nesting::direct(w1, &o2));
    assert_eq!(
      rows[1],
      Nesting {
        workflow_id: w1,
        via_transformation_id: w2,
        via_operator_id: o2.id,
        depth: 2,
        nested_transformation_id: c1,
        nested_operator_id: o3.id,
      }
    );
  }

  #[test]
  fn test_depth_invariant_holds_for_all_rows() {
    // Three levels: w1 -> w2 -> w3 -> c1, plus a direct component in w1.
    let w1 = Uuid::new_v4();
    let w2 = Uuid::new_v4();
    let w3 = Uuid::new_v4();

    let inner = component_operator("c1");
    let mut contents = HashMap::new();
    contents.insert(
      w3,
      WorkflowContent {
        operators: vec![inner],
      },
    );
    contents.insert(
      w2,
      WorkflowContent {
        operators: vec![workflow_operator("w3", w3)],
      },
    );
    let w1_content = WorkflowContent {
      operators: vec![workflow_operator("w2", w2), component_operator("c2")],
    };

    let rows = build_nestings(w1, &w1_content, &contents).expect("build");

    assert_eq!(rows.len(), 4);
    assert_eq!(rows.iter().map(|r| r.depth).max(), Some(3));
    for row in &rows {
      assert!(row.holds_depth_invariant(), "row violates invariant: {row:?}");
    }
  }

  #[test]
  fn test_same_subworkflow_instantiated_twice() {
    // w1 holds two operator instances of w2; the inner operator of w2 is
    // reached once per via operator.
    let w1 = Uuid::new_v4();
    let w2 = Uuid::new_v4();

    let inner = component_operator("c1");
    let mut contents = HashMap::new();
    contents.insert(
      w2,
      WorkflowContent {
        operators: vec![inner.clone()],
      },
    );

    let first = workflow_operator("left", w2);
    let second = workflow_operator("right", w2);
    let w1_content = WorkflowContent {
      operators: vec![first.clone(), second.clone()],
    };

    let rows = build_nestings(w1, &w1_content, &contents).expect("build");

    assert_eq!(rows.len(), 4);
    let deep: Vec<&Nesting> = rows.iter().filter(|r| r.depth == 2).collect();
    assert_eq!(deep.len(), 2);
    assert!(deep.iter().all(|r| r.nested_operator_id == inner.id));
    assert_ne!(deep[0].via_operator_id, deep[1].via_operator_id);
  }

  #[test]
  fn test_rebuild_is_idempotent() {
    let w1 = Uuid::new_v4();
    let w2 = Uuid::new_v4();

    let mut contents = HashMap::new();
    contents.insert(
      w2,
      WorkflowContent {
        operators: vec![component_operator("c1")],
      },
    );
    let content = WorkflowContent {
      operators: vec![workflow_operator("w2", w2)],
    };

    let first = build_nestings(w1, &content, &contents).expect("first pass");
    let second = build_nestings(w1, &content, &contents).expect("second pass");
    assert_eq!(first, second);
  }

  #[test]
  fn test_direct_self_nesting_is_cyclic() {
    let w1 = Uuid::new_v4();
    let content = WorkflowContent {
      operators: vec![workflow_operator("self", w1)],
    };

    let result = build_nestings(w1, &content, &HashMap::new());
    assert_eq!(result, Err(NestingError::CyclicDependency(w1)));
  }

  #[test]
  fn test_transitive_self_nesting_is_cyclic() {
    // w1 -> w2 -> w1
    let w1 = Uuid::new_v4();
    let w2 = Uuid::new_v4();

    let mut contents = HashMap::new();
    contents.insert(
      w2,
      WorkflowContent {
        operators: vec![workflow_operator("w1", w1)],
      },
    );
    let content = WorkflowContent {
      operators: vec![workflow_operator("w2", w2)],
    };

    let result = build_nestings(w1, &content, &contents);
    assert_eq!(result, Err(NestingError::CyclicDependency(w1)));
  }

  #[test]
  fn test_missing_subworkflow_content_is_an_error() {
    let w1 = Uuid::new_v4();
    let w2 = Uuid::new_v4();
    let content = WorkflowContent {
      operators: vec![workflow_operator("w2", w2)],
    };

    let result = build_nestings(w1, &content, &HashMap::new());
    assert_eq!(result, Err(NestingError::MissingContent(w2)));
  }

  #[test]
  fn test_diamond_is_not_a_cycle() {
    // w1 -> w2 -> w4 and w1 -> w3 -> w4: w4 is visited twice but never
    // while already on the nesting path.
    let w1 = Uuid::new_v4();
    let w2 = Uuid::new_v4();
    let w3 = Uuid::new_v4();
    let w4 = Uuid::new_v4();

    let mut contents = HashMap::new();
    contents.insert(
      w4,
      WorkflowContent {
        operators: vec![component_operator("c1")],
      },
    );
    contents.insert(
      w2,
      WorkflowContent {
        operators: vec![workflow_operator("w4", w4)],
      },
    );
    contents.insert(
      w3,
      WorkflowContent {
        operators: vec![workflow_operator("w4", w4)],
      },
    );
    let content = WorkflowContent {
      operators: vec![workflow_operator("w2", w2), workflow_operator("w3", w3)],
    };

    let rows = build_nestings(w1, &content, &contents).expect("diamond builds");
    // 2 direct + (w4 + c1) under each branch.
    assert_eq!(rows.len(), 6);
    for row in &rows {
      assert!(row.holds_depth_invariant());
    }
  }
}
