use thiserror::Error;
use uuid::Uuid;

use trellis_model::{ModelError, RevisionState};
use trellis_nesting::NestingError;

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
  /// The requested revision does not exist.
  #[error("transformation revision not found: {0}")]
  NotFound(Uuid),

  /// The `(revision_group_id, version_tag)` pair is already taken.
  #[error("duplicate version tag {version_tag:?} in revision group {revision_group_id}")]
  DuplicateVersionTag {
    revision_group_id: Uuid,
    version_tag: String,
  },

  /// The operation is only permitted for draft revisions.
  #[error("transformation revision {id} must be a draft for this operation (state {state})")]
  NotDraft { id: Uuid, state: RevisionState },

  /// Deletion guard: the revision is still contained in a workflow's
  /// closure.
  #[error("transformation revision {id} is still nested in workflow {workflow_id}")]
  NestedInWorkflow { id: Uuid, workflow_id: Uuid },

  /// A content or state-machine invariant was violated.
  #[error(transparent)]
  Model(#[from] ModelError),

  /// Closure rebuild failed; previously stored rows are kept.
  #[error(transparent)]
  Nesting(#[from] NestingError),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}
