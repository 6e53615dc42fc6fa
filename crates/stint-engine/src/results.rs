//! Snapshots and the ordered result log.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::status::{Outcome, State, Status};

/// Terminal record of one invocation, the unit stored in the result log.
///
/// Fault-only fields are left out of the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub index: u64,
  pub execution_id: Uuid,
  pub command: String,
  pub outcome: Outcome,
  pub state: State,
  pub status: Status,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub caused_by: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thrown_by: Option<u64>,
  /// The unrecognized error behind an `error` status, as `[<kind>] <message>`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exception: Option<String>,
  /// Formatted trace, e.g. `3[1^2]`.
  ///
  /// Only the index belongs to an untraced invocation. Its coordinates are
  /// those of the last traced invocation begun before it.
  pub trace: String,
  pub runtime_ms: f64,
}

/// Append-only log of snapshots, kept sorted by invocation index.
///
/// Children finish before their parents, so appends arrive out of order;
/// re-sorting after each append restores begin order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultLog {
  entries: Vec<Snapshot>,
}

impl ResultLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn push(&mut self, snapshot: Snapshot) {
    self.entries.push(snapshot);
    self.entries.sort_by_key(|s| s.index);
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
    self.entries.iter()
  }

  pub fn as_slice(&self) -> &[Snapshot] {
    &self.entries
  }

  /// Look up the snapshot of the invocation with `index`.
  pub fn get(&self, index: u64) -> Option<&Snapshot> {
    self
      .entries
      .binary_search_by_key(&index, |s| s.index)
      .ok()
      .map(|i| &self.entries[i])
  }

  /// Command names in log order.
  pub fn commands(&self) -> Vec<&str> {
    self.entries.iter().map(|s| s.command.as_str()).collect()
  }

  pub fn into_vec(self) -> Vec<Snapshot> {
    self.entries
  }
}

impl IntoIterator for ResultLog {
  type Item = Snapshot;
  type IntoIter = std::vec::IntoIter<Snapshot>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_iter()
  }
}

impl<'a> IntoIterator for &'a ResultLog {
  type Item = &'a Snapshot;
  type IntoIter = std::slice::Iter<'a, Snapshot>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.iter()
  }
}
