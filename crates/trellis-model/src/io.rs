use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single named input or output of a transformation revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Io {
  pub id: Uuid,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  pub data_type: String,
}

impl Io {
  pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      name: Some(name.into()),
      data_type: data_type.into(),
    }
  }
}

/// The declared inputs and outputs of a transformation revision.
///
/// Opaque to the closure and filter machinery; carried along so consumers
/// (execution engine, API layer) can wire revisions together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoInterface {
  #[serde(default)]
  pub inputs: Vec<Io>,
  #[serde(default)]
  pub outputs: Vec<Io>,
}
