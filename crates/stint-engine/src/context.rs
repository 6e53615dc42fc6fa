//! Shared context for a call tree.
//!
//! A [`Context`] is a cheap handle to one key/value bag shared by every
//! invocation of a call tree. Besides the data it carries the tree's
//! bookkeeping: execution id, configuration, current trace, nesting depth and
//! the result log.
//!
//! Execution is single-threaded and strictly nested, so the handle is an
//! `Rc` with interior mutability and no locking. Borrows never outlive a
//! single method call.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use stint_config::Configuration;
use stint_trace::Trace;
use tracing::debug;
use uuid::Uuid;

use crate::error::ContextError;
use crate::results::ResultLog;

/// Shared, freezable key/value bag passed by reference through a call tree.
#[derive(Clone)]
pub struct Context {
  inner: Rc<Inner>,
}

struct Inner {
  data: RefCell<Map<String, Value>>,
  frozen: Cell<bool>,
  ledger: RefCell<Ledger>,
}

/// Per-tree bookkeeping owned by the context.
#[derive(Debug)]
pub(crate) struct Ledger {
  pub(crate) execution_id: Uuid,
  pub(crate) config: Configuration,
  pub(crate) trace: Trace,
  pub(crate) depth: usize,
  pub(crate) results: ResultLog,
}

impl Ledger {
  fn new(config: Configuration) -> Self {
    Self {
      execution_id: Uuid::new_v4(),
      config,
      trace: Trace::new(),
      depth: 0,
      results: ResultLog::new(),
    }
  }
}

impl Context {
  /// An empty context with the default configuration.
  pub fn new() -> Self {
    Self::with_config(Configuration::default())
  }

  /// An empty context whose call tree runs under `config`.
  pub fn with_config(config: Configuration) -> Self {
    Self::from_parts(Map::new(), config)
  }

  fn from_parts(data: Map<String, Value>, config: Configuration) -> Self {
    Self {
      inner: Rc::new(Inner {
        data: RefCell::new(data),
        frozen: Cell::new(false),
        ledger: RefCell::new(Ledger::new(config)),
      }),
    }
  }

  /// Reuse `seed` if it is still writable, otherwise start a new context
  /// holding a copy of its data and configuration.
  pub fn build(seed: Context) -> Context {
    if seed.is_frozen() {
      seed.copy()
    } else {
      seed
    }
  }

  fn copy(&self) -> Context {
    let data = self.inner.data.borrow().clone();
    let config = self.inner.ledger.borrow().config.clone();
    Self::from_parts(data, config)
  }

  /// True if both handles point at the same context.
  pub fn ptr_eq(&self, other: &Context) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }

  /// Read a value. Unknown keys are absent, never defaulted.
  pub fn get(&self, key: &str) -> Option<Value> {
    self.inner.data.borrow().get(key).cloned()
  }

  /// Read a value and deserialize it into `T`.
  pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
    self
      .get(key)
      .map(|value| {
        serde_json::from_value(value).map_err(|source| ContextError::Deserialize {
          key: key.to_string(),
          source,
        })
      })
      .transpose()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.inner.data.borrow().contains_key(key)
  }

  /// Insert or replace a value.
  pub fn set<V: Serialize>(&self, key: impl Into<String>, value: V) -> Result<(), ContextError> {
    let key = key.into();
    self.ensure_writable(&key)?;

    let value = serde_json::to_value(value).map_err(|source| ContextError::Serialize {
      key: key.clone(),
      source,
    })?;
    self.inner.data.borrow_mut().insert(key, value);
    Ok(())
  }

  /// Upsert every pair. Nothing is written once the context is frozen.
  pub fn merge<I, K, V>(&self, pairs: I) -> Result<(), ContextError>
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
  {
    let pairs: Vec<(String, Value)> = pairs
      .into_iter()
      .map(|(k, v)| (k.into(), v.into()))
      .collect();

    if self.is_frozen() {
      let key = pairs.first().map(|(k, _)| k.clone()).unwrap_or_default();
      return Err(ContextError::Frozen { key });
    }

    self.inner.data.borrow_mut().extend(pairs);
    Ok(())
  }

  /// Remove a value, returning it if present.
  pub fn remove(&self, key: &str) -> Result<Option<Value>, ContextError> {
    self.ensure_writable(key)?;
    Ok(self.inner.data.borrow_mut().remove(key))
  }

  fn ensure_writable(&self, key: &str) -> Result<(), ContextError> {
    if self.is_frozen() {
      return Err(ContextError::Frozen {
        key: key.to_string(),
      });
    }
    Ok(())
  }

  pub fn keys(&self) -> Vec<String> {
    self.inner.data.borrow().keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.inner.data.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.data.borrow().is_empty()
  }

  /// Snapshot of the data as a JSON object.
  pub fn to_json(&self) -> Value {
    Value::Object(self.inner.data.borrow().clone())
  }

  /// Make the context read-only. Further writes fail with
  /// [`ContextError::Frozen`].
  pub fn freeze(&self) {
    if !self.inner.frozen.replace(true) {
      debug!(execution_id = %self.execution_id(), "context_frozen");
    }
  }

  pub fn is_frozen(&self) -> bool {
    self.inner.frozen.get()
  }

  /// Identifier shared by every invocation of this call tree.
  pub fn execution_id(&self) -> Uuid {
    self.inner.ledger.borrow().execution_id
  }

  pub fn config(&self) -> Configuration {
    self.inner.ledger.borrow().config.clone()
  }

  /// The result log recorded so far, ordered by invocation index.
  pub fn results(&self) -> ResultLog {
    self.inner.ledger.borrow().results.clone()
  }

  pub(crate) fn ledger(&self) -> Ref<'_, Ledger> {
    self.inner.ledger.borrow()
  }

  pub(crate) fn ledger_mut(&self) -> RefMut<'_, Ledger> {
    self.inner.ledger.borrow_mut()
  }
}

impl Default for Context {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Context")
      .field("data", &*self.inner.data.borrow())
      .field("frozen", &self.is_frozen())
      .finish()
  }
}

impl From<&Context> for Context {
  fn from(context: &Context) -> Self {
    context.clone()
  }
}

impl From<Map<String, Value>> for Context {
  fn from(data: Map<String, Value>) -> Self {
    Self::from_parts(data, Configuration::default())
  }
}

impl TryFrom<Value> for Context {
  type Error = ContextError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    match value {
      Value::Object(data) => Ok(Self::from(data)),
      _ => Err(ContextError::NotAnObject),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;
  use serde_json::json;

  use super::*;

  fn seeded() -> Context {
    Context::try_from(json!({ "attr_one": "val_one" })).unwrap()
  }

  #[test]
  fn test_build_reuses_writable_context() {
    let context = seeded();
    let other = Context::build(context.clone());

    assert!(context.ptr_eq(&other));
  }

  #[test]
  fn test_build_copies_frozen_context() {
    let context = seeded();
    context.freeze();

    let other = Context::build(context.clone());

    assert!(!context.ptr_eq(&other));
    assert!(!other.is_frozen());
    assert_eq!(other.get("attr_one"), Some(json!("val_one")));
    assert_ne!(other.execution_id(), context.execution_id());
  }

  #[test]
  fn test_unknown_keys_are_absent() {
    let context = seeded();

    assert_eq!(context.get("missing"), None);
    assert!(!context.contains("missing"));
    assert_eq!(context.get_as::<String>("missing").unwrap(), None);
  }

  #[test]
  fn test_set_and_merge() {
    let context = seeded();
    context.set("attr_two", "val_two").unwrap();
    context
      .merge([("attr_one", json!(1)), ("attr_three", json!([1, 2]))])
      .unwrap();

    assert_eq!(context.get("attr_one"), Some(json!(1)));
    assert_eq!(context.get("attr_two"), Some(json!("val_two")));
    assert_eq!(context.len(), 3);
  }

  #[test]
  fn test_frozen_context_rejects_writes() {
    let context = seeded();
    context.freeze();

    let err = context.set("attr_two", "val_two").unwrap_err();
    assert!(matches!(err, ContextError::Frozen { ref key } if key == "attr_two"));
    assert!(context.merge([("attr_one", json!(2))]).is_err());
    assert!(context.remove("attr_one").is_err());
    assert_eq!(context.get("attr_one"), Some(json!("val_one")));
  }

  #[test]
  fn test_typed_access() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
      email: String,
    }

    let context = Context::new();
    context
      .set("user", User {
        email: "jane@example.com".into(),
      })
      .unwrap();

    let user: Option<User> = context.get_as("user").unwrap();
    assert_eq!(user.unwrap().email, "jane@example.com");
    assert!(context.get_as::<u64>("user").is_err());
  }

  #[test]
  fn test_seed_must_be_object() {
    assert!(matches!(
      Context::try_from(json!([1, 2])),
      Err(ContextError::NotAnObject)
    ));
  }
}
