use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NestingError {
  /// The composition graph reaches a transformation that is already on the
  /// current nesting path. Fatal for this rebuild only; previously stored
  /// closure rows must be kept.
  #[error("cyclic nesting detected at transformation {0}")]
  CyclicDependency(Uuid),

  /// A workflow operator references a transformation whose content was not
  /// provided to the traversal.
  #[error("workflow content missing for transformation {0}")]
  MissingContent(Uuid),
}
