use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{RevisionContent, WorkflowContent};
use crate::enums::{RevisionState, TransformationType};
use crate::error::ModelError;
use crate::io::IoInterface;
use crate::wiring::TestWiring;

/// A versioned transformation revision.
///
/// All revisions sharing a `revision_group_id` are the historical versions of
/// one logical transformation; within a group every `version_tag` exists at
/// most once. A revision is either a component (non-empty `component_code`)
/// or a workflow (`workflow_content` present), never both and never neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationRevision {
  pub id: Uuid,
  pub revision_group_id: Uuid,
  pub name: String,
  pub description: String,
  pub category: String,
  pub version_tag: String,
  pub state: RevisionState,
  #[serde(rename = "type")]
  pub transformation_type: TransformationType,
  pub documentation: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub component_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub workflow_content: Option<WorkflowContent>,
  #[serde(default)]
  pub io_interface: IoInterface,
  #[serde(default)]
  pub test_wiring: TestWiring,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub released_timestamp: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub disabled_timestamp: Option<DateTime<Utc>>,
}

impl TransformationRevision {
  /// Create a component draft carrying the given code.
  ///
  /// # Errors
  /// Returns `ModelError::MissingComponentCode` if `code` is empty.
  pub fn new_component(
    name: impl Into<String>,
    category: impl Into<String>,
    version_tag: impl Into<String>,
    code: impl Into<String>,
  ) -> Result<Self, ModelError> {
    let code = code.into();
    if code.is_empty() {
      return Err(ModelError::MissingComponentCode);
    }

    Ok(Self {
      id: Uuid::new_v4(),
      revision_group_id: Uuid::new_v4(),
      name: name.into(),
      description: String::new(),
      category: category.into(),
      version_tag: version_tag.into(),
      state: RevisionState::Draft,
      transformation_type: TransformationType::Component,
      documentation: String::new(),
      component_code: Some(code),
      workflow_content: None,
      io_interface: IoInterface::default(),
      test_wiring: TestWiring::default(),
      released_timestamp: None,
      disabled_timestamp: None,
    })
  }

  /// Create a workflow draft with the given content.
  pub fn new_workflow(
    name: impl Into<String>,
    category: impl Into<String>,
    version_tag: impl Into<String>,
    content: WorkflowContent,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      revision_group_id: Uuid::new_v4(),
      name: name.into(),
      description: String::new(),
      category: category.into(),
      version_tag: version_tag.into(),
      state: RevisionState::Draft,
      transformation_type: TransformationType::Workflow,
      documentation: String::new(),
      component_code: None,
      workflow_content: Some(content),
      io_interface: IoInterface::default(),
      test_wiring: TestWiring::default(),
      released_timestamp: None,
      disabled_timestamp: None,
    }
  }

  pub fn is_workflow(&self) -> bool {
    self.transformation_type == TransformationType::Workflow
  }

  pub fn is_component(&self) -> bool {
    self.transformation_type == TransformationType::Component
  }

  /// Check the content-type invariant: exactly one of component code or
  /// workflow content, and the present one matches the transformation type.
  ///
  /// # Errors
  /// Returns the specific `ModelError` variant describing the violation.
  pub fn validate_content(&self) -> Result<(), ModelError> {
    match (&self.component_code, &self.workflow_content) {
      (Some(_), Some(_)) => Err(ModelError::ConflictingContent),
      (None, None) => {
        if self.is_component() {
          Err(ModelError::MissingComponentCode)
        } else {
          Err(ModelError::MissingWorkflowContent)
        }
      }
      (Some(code), None) => {
        if !self.is_component() {
          Err(ModelError::ContentTypeMismatch)
        } else if code.is_empty() {
          Err(ModelError::MissingComponentCode)
        } else {
          Ok(())
        }
      }
      (None, Some(_)) => {
        if !self.is_workflow() {
          Err(ModelError::ContentTypeMismatch)
        } else {
          Ok(())
        }
      }
    }
  }

  /// Transition draft -> released, stamping the release timestamp.
  ///
  /// # Errors
  /// Returns `ModelError::InvalidStateTransition` if the revision is not a
  /// draft.
  pub fn release(&mut self, at: DateTime<Utc>) -> Result<(), ModelError> {
    if self.state != RevisionState::Draft {
      return Err(ModelError::InvalidStateTransition {
        from: self.state,
        to: RevisionState::Released,
      });
    }

    self.state = RevisionState::Released;
    self.released_timestamp = Some(at);
    Ok(())
  }

  /// Transition released -> disabled, stamping the disabled timestamp.
  ///
  /// A disabled revision stays addressable but drops out of default listings.
  ///
  /// # Errors
  /// Returns `ModelError::InvalidStateTransition` if the revision is not
  /// released.
  pub fn disable(&mut self, at: DateTime<Utc>) -> Result<(), ModelError> {
    if self.state != RevisionState::Released {
      return Err(ModelError::InvalidStateTransition {
        from: self.state,
        to: RevisionState::Disabled,
      });
    }

    self.state = RevisionState::Disabled;
    self.disabled_timestamp = Some(at);
    Ok(())
  }

  /// Replace the revision's content. Only drafts are mutable.
  ///
  /// # Errors
  /// Returns `ModelError::NotDraft` once the revision has been released, and
  /// `ModelError::ContentTypeMismatch` if the content kind does not match the
  /// transformation type.
  pub fn update_content(&mut self, content: RevisionContent) -> Result<(), ModelError> {
    if self.state != RevisionState::Draft {
      return Err(ModelError::NotDraft(self.state));
    }

    match (self.transformation_type, content) {
      (TransformationType::Component, RevisionContent::Code(code)) => {
        if code.is_empty() {
          return Err(ModelError::MissingComponentCode);
        }
        self.component_code = Some(code);
      }
      (TransformationType::Workflow, RevisionContent::Workflow(content)) => {
        self.workflow_content = Some(content);
      }
      _ => return Err(ModelError::ContentTypeMismatch),
    }

    Ok(())
  }
}
