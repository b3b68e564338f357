use thiserror::Error;

use crate::enums::RevisionState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
  #[error("a component requires non-empty component code")]
  MissingComponentCode,

  #[error("a workflow requires workflow content")]
  MissingWorkflowContent,

  #[error("component code and workflow content are mutually exclusive")]
  ConflictingContent,

  #[error("content kind does not match transformation type")]
  ContentTypeMismatch,

  #[error("invalid state transition: {from} -> {to}")]
  InvalidStateTransition {
    from: RevisionState,
    to: RevisionState,
  },

  #[error("content can only be updated in draft state (currently {0})")]
  NotDraft(RevisionState),

  #[error("unknown state: {0}")]
  UnknownState(String),

  #[error("unknown transformation type: {0}")]
  UnknownType(String),
}
