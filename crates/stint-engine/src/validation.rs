//! Input validation errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reason recorded when validation rejects the context.
pub const INVALID_INPUT_REASON: &str = "Invalid context attributes";

/// Field name to messages, collected by [`Command::validate`](crate::Command::validate).
///
/// A non-empty set turns the invocation `invalid` before `call` runs, with the
/// set as the fault metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a message against a field. Duplicate messages are dropped.
  pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
    let message = message.into();
    let messages = self.0.entry(field.into()).or_default();
    if !messages.contains(&message) {
      messages.push(message);
    }
  }

  pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
    self.add(field, message);
    self
  }

  pub fn extend(&mut self, other: ValidationErrors) {
    for (field, messages) in other.0 {
      for message in messages {
        self.add(field.clone(), message);
      }
    }
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Number of fields with at least one message.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
    self.0.iter().map(|(field, messages)| (field.as_str(), messages.as_slice()))
  }

  pub fn to_value(&self) -> Value {
    Value::Object(
      self
        .0
        .iter()
        .map(|(field, messages)| (field.clone(), Value::from(messages.clone())))
        .collect(),
    )
  }
}
