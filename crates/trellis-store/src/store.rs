use async_trait::async_trait;
use uuid::Uuid;

use trellis_model::{FilterParams, RevisionContent, TransformationRevision};
use trellis_nesting::Descendant;

use crate::error::StoreError;

/// Storage trait for transformation revisions and their nesting closure.
///
/// Implementations must run each mutation and its closure rebuild as one
/// atomic unit: either both persist or neither does.
#[async_trait]
pub trait RevisionStore: Send + Sync {
  /// Insert a new draft revision.
  ///
  /// Fails if the revision is not a draft, if its content violates the
  /// exactly-one-of-code-or-content invariant, or if its
  /// `(revision_group_id, version_tag)` pair is already taken. Workflows get
  /// their closure rows built as part of the insert.
  async fn create(&self, revision: &TransformationRevision) -> Result<(), StoreError>;

  /// Get a revision by id.
  async fn get(&self, id: Uuid) -> Result<TransformationRevision, StoreError>;

  /// Transition a draft to released, stamping the release timestamp.
  ///
  /// Returns the updated revision.
  async fn release(&self, id: Uuid) -> Result<TransformationRevision, StoreError>;

  /// Transition a released revision to disabled, stamping the disabled
  /// timestamp. The revision stays addressable but drops out of default
  /// listings.
  async fn disable(&self, id: Uuid) -> Result<TransformationRevision, StoreError>;

  /// Replace a draft revision's content and rebuild its closure if it is a
  /// workflow. Revisions are immutable once released.
  async fn update_content(
    &self,
    id: Uuid,
    content: RevisionContent,
  ) -> Result<TransformationRevision, StoreError>;

  /// Delete a draft revision.
  ///
  /// Refused while any workflow's closure still contains the revision.
  async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

  /// List revisions matching the filter, in `(category, name, version_tag,
  /// id)` order.
  async fn list(&self, filter: &FilterParams) -> Result<Vec<TransformationRevision>, StoreError>;

  /// All transformations reachable from the given workflow, any depth.
  async fn descendants(&self, workflow_id: Uuid) -> Result<Vec<Descendant>, StoreError>;

  /// Every workflow whose closure contains the given transformation at any
  /// depth.
  async fn ancestors(&self, transformation_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
}
