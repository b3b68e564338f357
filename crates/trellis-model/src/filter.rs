use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{RevisionState, TransformationType};
use crate::revision::TransformationRevision;

fn default_true() -> bool {
  true
}

/// Predicates and flags for listing transformation revisions.
///
/// Every predicate is independently optional; unspecified predicates impose
/// no constraint. The flags control how the base match set is widened or
/// narrowed:
/// - `include_deprecated` (default true): with no explicit `state` predicate,
///   setting this to false drops disabled revisions from the base match.
/// - `include_dependencies` (default false): expand the result with every
///   transformation reachable from a matching workflow, whether or not the
///   dependency matches the predicates itself.
/// - `unused` (default false): keep only revisions nested in no workflow that
///   is still active (i.e. not disabled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub transformation_type: Option<TransformationType>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state: Option<RevisionState>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub revision_group_id: Option<Uuid>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ids: Option<Vec<Uuid>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub names: Option<Vec<String>>,
  #[serde(default = "default_true")]
  pub include_deprecated: bool,
  #[serde(default)]
  pub include_dependencies: bool,
  #[serde(default)]
  pub unused: bool,
}

impl Default for FilterParams {
  /// No predicates: matches every revision, deprecated ones included.
  fn default() -> Self {
    Self {
      transformation_type: None,
      state: None,
      category: None,
      revision_group_id: None,
      ids: None,
      names: None,
      include_deprecated: true,
      include_dependencies: false,
      unused: false,
    }
  }
}

impl FilterParams {
  /// Base predicate match: does this revision satisfy every specified
  /// predicate?
  ///
  /// An explicit `state` predicate takes precedence over the
  /// `include_deprecated` default rule; dependency expansion and the
  /// `unused` restriction are applied by the query engine, not here.
  pub fn matches(&self, revision: &TransformationRevision) -> bool {
    if let Some(transformation_type) = self.transformation_type {
      if revision.transformation_type != transformation_type {
        return false;
      }
    }

    match self.state {
      Some(state) => {
        if revision.state != state {
          return false;
        }
      }
      None => {
        if !self.include_deprecated && revision.state == RevisionState::Disabled {
          return false;
        }
      }
    }

    if let Some(category) = &self.category {
      if &revision.category != category {
        return false;
      }
    }

    if let Some(revision_group_id) = self.revision_group_id {
      if revision.revision_group_id != revision_group_id {
        return false;
      }
    }

    if let Some(ids) = &self.ids {
      if !ids.contains(&revision.id) {
        return false;
      }
    }

    if let Some(names) = &self.names {
      if !names.contains(&revision.name) {
        return false;
      }
    }

    true
  }
}
