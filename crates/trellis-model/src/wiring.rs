use serde::{Deserialize, Serialize};

/// Sample test data recorded against a revision's interface.
///
/// The wiring payloads are free-form JSON owned by the test tooling around
/// the registry; this core stores and returns them untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestWiring {
  #[serde(default)]
  pub input_wirings: Vec<serde_json::Value>,
  #[serde(default)]
  pub output_wirings: Vec<serde_json::Value>,
}
