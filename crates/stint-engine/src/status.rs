//! Lifecycle states and the closed outcome taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where an invocation is in its lifecycle.
///
/// `Complete` and `Interrupted` are terminal and mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
  Pending,
  Executing,
  Complete,
  Interrupted,
}

impl State {
  pub fn as_str(&self) -> &'static str {
    match self {
      State::Pending => "pending",
      State::Executing => "executing",
      State::Complete => "complete",
      State::Interrupted => "interrupted",
    }
  }

  /// True for `Complete` and `Interrupted`.
  pub fn is_terminal(&self) -> bool {
    matches!(self, State::Complete | State::Interrupted)
  }
}

impl fmt::Display for State {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How an invocation ended. `Success` is the absence of a fault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  #[default]
  Success,
  Noop,
  Invalid,
  Failure,
  Error,
}

impl Status {
  pub fn as_str(&self) -> &'static str {
    match self {
      Status::Success => "success",
      Status::Noop => "noop",
      Status::Invalid => "invalid",
      Status::Failure => "failure",
      Status::Error => "error",
    }
  }

  /// The fault kind behind this status, `None` for success.
  pub fn fault_kind(&self) -> Option<FaultKind> {
    match self {
      Status::Success => None,
      Status::Noop => Some(FaultKind::Noop),
      Status::Invalid => Some(FaultKind::Invalid),
      Status::Failure => Some(FaultKind::Failure),
      Status::Error => Some(FaultKind::Error),
    }
  }

  /// Success or noop: callers with skip semantics may carry on.
  pub fn is_ok(&self) -> bool {
    matches!(self, Status::Success | Status::Noop)
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The four concrete fault kinds. There is no base kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
  /// Expected early stop, generally tolerated.
  Noop,
  /// Missing or bad input data.
  Invalid,
  /// A business rule blocks continuation.
  Failure,
  /// An unexpected error was caught and wrapped.
  Error,
}

impl FaultKind {
  pub fn as_str(&self) -> &'static str {
    self.status().as_str()
  }

  pub fn status(&self) -> Status {
    match self {
      FaultKind::Noop => Status::Noop,
      FaultKind::Invalid => Status::Invalid,
      FaultKind::Failure => Status::Failure,
      FaultKind::Error => Status::Error,
    }
  }
}

impl From<FaultKind> for Status {
  fn from(kind: FaultKind) -> Self {
    kind.status()
  }
}

impl fmt::Display for FaultKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// What a log reader should see first: the state while pending or when the
/// invocation only re-threw someone else's fault, the status otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
  State(State),
  Status(Status),
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Outcome::State(state) => state.fmt(f),
      Outcome::Status(status) => status.fmt(f),
    }
  }
}
