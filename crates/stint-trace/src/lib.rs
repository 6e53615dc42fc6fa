//! Stint Trace
//!
//! A [`Trace`] is the ordering record attached to every invocation in a call
//! tree. It carries:
//!
//! - a reserved `index`, incremented once per invocation, which gives the
//!   total order used to sort the result log
//! - named counters in declaration order, one per trace key seen so far
//! - a `position`, the counter names identifying the current nesting chain
//!
//! Keys starting with `__` are *dependent* keys: they nest under the current
//! position instead of replacing it. Any other key starts a new position.
//!
//! Traces are values. [`Trace::advance`] and [`Trace::step`] derive a new
//! trace and leave the original untouched.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix marking a dependent (sub) trace key.
pub const DEPENDENT_PREFIX: &str = "__";

/// Returns true when `key` nests under the current position.
pub fn is_dependent(key: &str) -> bool {
  key.starts_with(DEPENDENT_PREFIX)
}

/// Hierarchical position of one invocation within a call tree.
///
/// Equality and ordering look at `index` only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
  index: u64,
  counters: Vec<(String, u64)>,
  position: Vec<String>,
}

impl Trace {
  /// An empty trace with index 0. The first invocation of a call tree
  /// derives index 1 from it.
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a trace from explicit parts.
  ///
  /// Counter order is declaration order and is what [`Trace::advance`]
  /// trims against.
  pub fn from_parts<K, P>(
    index: u64,
    counters: impl IntoIterator<Item = (K, u64)>,
    position: impl IntoIterator<Item = P>,
  ) -> Self
  where
    K: Into<String>,
    P: Into<String>,
  {
    Self {
      index,
      counters: counters.into_iter().map(|(k, v)| (k.into(), v)).collect(),
      position: position.into_iter().map(Into::into).collect(),
    }
  }

  /// The total-order index.
  pub fn index(&self) -> u64 {
    self.index
  }

  /// Value of a named counter, if the key has been seen at this depth.
  pub fn counter(&self, key: &str) -> Option<u64> {
    self
      .counters
      .iter()
      .find(|(name, _)| name == key)
      .map(|(_, value)| *value)
  }

  /// Counters in declaration order.
  pub fn counters(&self) -> impl Iterator<Item = (&str, u64)> {
    self.counters.iter().map(|(k, v)| (k.as_str(), *v))
  }

  /// Counter names making up the current nesting chain.
  pub fn position(&self) -> &[String] {
    &self.position
  }

  /// Derive the trace for a traced invocation entering under `key`.
  ///
  /// Counters declared after `key` belong to deeper nesting levels and are
  /// dropped. The `index` and the `key` counter are then incremented. A
  /// dependent key joins the current position, any other key replaces it.
  pub fn advance(&self, key: &str) -> Trace {
    let depth = self
      .counters
      .iter()
      .position(|(name, _)| name == key)
      .map_or(self.counters.len(), |i| i + 1);

    let counters = self.counters[..depth].to_vec();
    let mut position: Vec<String> = self
      .position
      .iter()
      .filter(|p| counters.iter().any(|(name, _)| name == *p))
      .cloned()
      .collect();

    if is_dependent(key) {
      if !position.iter().any(|p| p == key) {
        position.push(key.to_string());
      }
    } else {
      position = vec![key.to_string()];
    }

    let mut next = Trace {
      index: self.index + 1,
      counters,
      position,
    };
    next.increment(key);
    next
  }

  /// Derive the trace for an untraced invocation: only the index moves.
  ///
  /// The result keeps this trace's counters and position, so it renders at the
  /// coordinates of the previous traced sibling, e.g. `4[1^2]` after `3[1^2]`.
  pub fn step(&self) -> Trace {
    Trace {
      index: self.index + 1,
      ..self.clone()
    }
  }

  fn increment(&mut self, key: &str) {
    match self.counters.iter_mut().find(|(name, _)| name == key) {
      Some((_, value)) => *value += 1,
      None => self.counters.push((key.to_string(), 1)),
    }
  }

  /// Position counter values joined with `^`, e.g. `1^2`.
  pub fn position_string(&self) -> String {
    self
      .position
      .iter()
      .filter_map(|key| self.counter(key))
      .map(|value| value.to_string())
      .collect::<Vec<_>>()
      .join("^")
  }

  /// Every counter value, dependent counters joined to the preceding group
  /// with `^` and groups joined with `.`, e.g. `1.1^1`.
  pub fn coordinates(&self) -> String {
    let mut groups: Vec<Vec<String>> = Vec::new();

    for (key, value) in &self.counters {
      match groups.last_mut() {
        Some(group) if is_dependent(key) => group.push(value.to_string()),
        _ => groups.push(vec![value.to_string()]),
      }
    }

    groups
      .iter()
      .map(|group| group.join("^"))
      .collect::<Vec<_>>()
      .join(".")
  }
}

impl PartialEq for Trace {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index
  }
}

impl Eq for Trace {}

impl PartialOrd for Trace {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Trace {
  fn cmp(&self, other: &Self) -> Ordering {
    self.index.cmp(&other.index)
  }
}

/// `<index>[<position>]`, or just `<index>` when nothing is traced.
impl fmt::Display for Trace {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let position = self.position_string();
    if position.is_empty() {
      write!(f, "{}", self.index)
    } else {
      write!(f, "{}[{}]", self.index, position)
    }
  }
}
