use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use trellis_model::{FilterParams, RevisionState, TransformationRevision};
use trellis_nesting::Nesting;

/// The filter/query engine: compute the result set for a filter over the
/// store's revisions and closure rows.
///
/// The base pass keeps every revision matching the specified predicates
/// (with the `include_deprecated` default rule), then the `unused` flag
/// restricts that set to revisions nested in no active (non-disabled)
/// workflow. Dependency expansion runs last: the closure descendants of
/// every matching workflow join the result, keeping their membership even
/// when they fail the predicates themselves. Disabled dependents are the
/// exception and are never added this way.
///
/// The output is deduplicated and ordered by `(category, name, version_tag,
/// id)`.
pub fn select_revisions(
  revisions: Vec<TransformationRevision>,
  nestings: &[Nesting],
  filter: &FilterParams,
) -> Vec<TransformationRevision> {
  let by_id: HashMap<Uuid, &TransformationRevision> =
    revisions.iter().map(|revision| (revision.id, revision)).collect();

  let mut selected: Vec<&TransformationRevision> =
    revisions.iter().filter(|revision| filter.matches(revision)).collect();

  if filter.unused {
    let actively_nested: HashSet<Uuid> = nestings
      .iter()
      .filter(|nesting| {
        by_id
          .get(&nesting.workflow_id)
          .is_some_and(|workflow| workflow.state != RevisionState::Disabled)
      })
      .map(|nesting| nesting.nested_transformation_id)
      .collect();
    selected.retain(|revision| !actively_nested.contains(&revision.id));
  }

  if filter.include_dependencies {
    let mut members: HashSet<Uuid> = selected.iter().map(|revision| revision.id).collect();
    let mut expanded = selected.clone();

    for revision in &selected {
      if !revision.is_workflow() {
        continue;
      }
      for nesting in nestings.iter().filter(|n| n.workflow_id == revision.id) {
        if members.contains(&nesting.nested_transformation_id) {
          continue;
        }
        let Some(dependency) = by_id.get(&nesting.nested_transformation_id).copied() else {
          continue;
        };
        if dependency.state == RevisionState::Disabled {
          continue;
        }
        members.insert(dependency.id);
        expanded.push(dependency);
      }
    }

    selected = expanded;
  }

  selected.sort_by(|a, b| {
    (&a.category, &a.name, &a.version_tag, a.id).cmp(&(&b.category, &b.name, &b.version_tag, b.id))
  });
  selected.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use trellis_model::{Operator, TransformationType, WorkflowContent};

  fn component(name: &str, category: &str) -> TransformationRevision {
    TransformationRevision::new_component(name, category, "1.0.0", "code").expect("valid component")
  }

  fn workflow_over(name: &str, children: &[&TransformationRevision]) -> TransformationRevision {
    let operators = children
      .iter()
      .map(|child| {
        Operator::new(
          child.name.clone(),
          child.id,
          child.transformation_type,
          child.version_tag.clone(),
        )
      })
      .collect();
    TransformationRevision::new_workflow(name, "flows", "1.0.0", WorkflowContent { operators })
  }

  fn direct_nestings(workflow: &TransformationRevision) -> Vec<Nesting> {
    workflow
      .workflow_content
      .as_ref()
      .expect("workflow content")
      .operators
      .iter()
      .map(|operator| Nesting::direct(workflow.id, operator))
      .collect()
  }

  fn released(mut revision: TransformationRevision) -> TransformationRevision {
    revision.release(Utc::now()).expect("release");
    revision
  }

  fn disabled(revision: TransformationRevision) -> TransformationRevision {
    let mut revision = released(revision);
    revision.disable(Utc::now()).expect("disable");
    revision
  }

  #[test]
  fn test_ordering_is_deterministic() {
    let a = component("mean", "statistics");
    let b = component("add", "arithmetic");
    let c = component("sub", "arithmetic");

    let result = select_revisions(vec![a, b, c], &[], &FilterParams::default());

    let names: Vec<&str> = result.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["add", "sub", "mean"]);
  }

  #[test]
  fn test_dependencies_surface_despite_failing_predicates() {
    // Released workflow depends on a draft component; filtering for
    // released revisions with dependencies must surface both.
    let c2 = component("c2", "parts");
    let w1 = released(workflow_over("w1", &[&c2]));
    let nestings = direct_nestings(&w1);

    let mut filter = FilterParams::default();
    filter.state = Some(RevisionState::Released);
    filter.include_dependencies = true;

    let result = select_revisions(vec![w1.clone(), c2.clone()], &nestings, &filter);
    let ids: HashSet<Uuid> = result.iter().map(|r| r.id).collect();
    assert_eq!(ids, HashSet::from([w1.id, c2.id]));

    // Without expansion only the workflow matches.
    filter.include_dependencies = false;
    let result = select_revisions(vec![w1.clone(), c2], &nestings, &filter);
    let ids: Vec<Uuid> = result.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![w1.id]);
  }

  #[test]
  fn test_disabled_dependents_are_never_added() {
    let dead = disabled(component("dead", "parts"));
    let live = component("live", "parts");
    let w1 = released(workflow_over("w1", &[&dead, &live]));
    let nestings = direct_nestings(&w1);

    let mut filter = FilterParams::default();
    filter.state = Some(RevisionState::Released);
    filter.include_dependencies = true;

    let result = select_revisions(vec![w1.clone(), dead.clone(), live.clone()], &nestings, &filter);
    let ids: HashSet<Uuid> = result.iter().map(|r| r.id).collect();
    assert!(ids.contains(&live.id));
    assert!(!ids.contains(&dead.id));
  }

  #[test]
  fn test_expansion_deduplicates_shared_dependencies() {
    let shared = component("shared", "parts");
    let w1 = released(workflow_over("w1", &[&shared]));
    let w2 = released(workflow_over("w2", &[&shared]));
    let mut nestings = direct_nestings(&w1);
    nestings.extend(direct_nestings(&w2));

    let mut filter = FilterParams::default();
    filter.include_dependencies = true;

    let result = select_revisions(vec![w1, w2, shared.clone()], &nestings, &filter);
    let count = result.iter().filter(|r| r.id == shared.id).count();
    assert_eq!(count, 1);
  }

  #[test]
  fn test_unused_ignores_disabled_workflows() {
    // c3 is nested only in a disabled workflow: it counts as unused. Once
    // an active workflow adopts it, it no longer does.
    let c3 = component("c3", "parts");
    let retired = disabled(workflow_over("retired", &[&c3]));
    let nestings = direct_nestings(&retired);

    let mut filter = FilterParams::default();
    filter.unused = true;
    filter.transformation_type = Some(TransformationType::Component);

    let result = select_revisions(vec![retired.clone(), c3.clone()], &nestings, &filter);
    let ids: Vec<Uuid> = result.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![c3.id]);

    let adopter = released(workflow_over("adopter", &[&c3]));
    let mut nestings = direct_nestings(&retired);
    nestings.extend(direct_nestings(&adopter));

    let result = select_revisions(vec![retired, adopter, c3], &nestings, &filter);
    assert!(result.is_empty());
  }

  #[test]
  fn test_unused_and_dependencies_are_independent() {
    // An unused workflow still has its dependencies expanded.
    let c1 = component("c1", "parts");
    let lonely = workflow_over("lonely", &[&c1]);
    let nestings = direct_nestings(&lonely);

    let mut filter = FilterParams::default();
    filter.unused = true;
    filter.include_dependencies = true;

    let result = select_revisions(vec![lonely.clone(), c1.clone()], &nestings, &filter);
    let ids: HashSet<Uuid> = result.iter().map(|r| r.id).collect();
    // c1 fails the unused restriction (it is nested in an active workflow)
    // but re-enters through dependency expansion of the unused workflow.
    assert_eq!(ids, HashSet::from([lonely.id, c1.id]));
  }
}
