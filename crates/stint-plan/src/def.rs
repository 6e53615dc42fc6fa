use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stint_engine::FaultKind;

use crate::error::PlanError;

/// A declarative command: what it needs, what it writes, what it runs and
/// how it ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDef {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub trace_key: Option<String>,
  /// Context keys that must be present before the plan runs.
  #[serde(default)]
  pub requires: Vec<String>,
  /// Values merged into the context when the plan runs.
  #[serde(default)]
  pub set: BTreeMap<String, Value>,
  #[serde(default)]
  pub steps: Vec<StepDef>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub outcome: Option<OutcomeDef>,
}

/// A child plan with an optional guard on a context key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  pub plan: PlanDef,
  /// Run only when this context key is truthy.
  #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
  pub if_key: Option<String>,
  /// Skip when this context key is truthy.
  #[serde(default, rename = "unless", skip_serializing_if = "Option::is_none")]
  pub unless_key: Option<String>,
  /// Propagate any non-success of the child, noop included.
  #[serde(default)]
  pub strict: bool,
}

/// How a plan ends once its steps are done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDef {
  pub kind: OutcomeKind,
  pub reason: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
  Noop,
  Invalid,
  Failure,
  Error,
  /// Return an error the engine does not recognize as a fault.
  Raise,
}

impl OutcomeKind {
  /// The fault kind raised for this outcome, `None` for `raise`.
  pub fn fault_kind(&self) -> Option<FaultKind> {
    match self {
      OutcomeKind::Noop => Some(FaultKind::Noop),
      OutcomeKind::Invalid => Some(FaultKind::Invalid),
      OutcomeKind::Failure => Some(FaultKind::Failure),
      OutcomeKind::Error => Some(FaultKind::Error),
      OutcomeKind::Raise => None,
    }
  }
}

impl PlanDef {
  pub fn from_json_str(input: &str) -> Result<Self, PlanError> {
    serde_json::from_str(input).map_err(|source| PlanError::Parse { source })
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PlanError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
      path: path.display().to_string(),
      source,
    })?;
    Self::from_json_str(&content)
  }

  /// Number of plans in this tree, this one included.
  pub fn size(&self) -> usize {
    1 + self.steps.iter().map(|step| step.plan.size()).sum::<usize>()
  }
}
