//! Faults: the typed abnormal outcomes of an invocation.
//!
//! A [`Fault`] is built from the invocation that raised it and copies its
//! reason, metadata and causality at construction time. [`Halt`] is the error
//! type business logic returns; it accepts any error through `?` and keeps
//! faults recognizable.

use std::any::type_name;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::{FaultKind, Status};

/// Identity of one invocation within a call tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationRef {
  index: u64,
  command: Arc<str>,
}

impl InvocationRef {
  pub fn new(index: u64, command: impl Into<Arc<str>>) -> Self {
    Self {
      index,
      command: command.into(),
    }
  }

  /// Position of the invocation in the result log.
  pub fn index(&self) -> u64 {
    self.index
  }

  pub fn command(&self) -> &str {
    &self.command
  }
}

impl fmt::Display for InvocationRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}#{}", self.command, self.index)
  }
}

/// Which hierarchy a fault belongs to.
///
/// `Family` faults are scoped to the command that raised them so a caller
/// can handle faults from one invocation family only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultScope {
  Generic,
  Family(Arc<str>),
}

/// A typed abnormal outcome, raised by strict execution and by the
/// fault-raising methods of a [`Frame`](crate::Frame).
///
/// An `error` fault raised for an unrecognized error keeps that error as its
/// [`source`](StdError::source).
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
  kind: FaultKind,
  reason: String,
  metadata: Option<Value>,
  caused_by: InvocationRef,
  thrown_by: InvocationRef,
  scope: FaultScope,
  exception: Option<Exception>,
}

impl Fault {
  pub(crate) fn new(
    kind: FaultKind,
    reason: String,
    metadata: Option<Value>,
    caused_by: InvocationRef,
    thrown_by: InvocationRef,
    scope: FaultScope,
    exception: Option<Exception>,
  ) -> Self {
    Self {
      kind,
      reason,
      metadata,
      caused_by,
      thrown_by,
      scope,
      exception,
    }
  }

  pub fn kind(&self) -> FaultKind {
    self.kind
  }

  pub fn status(&self) -> Status {
    self.kind.status()
  }

  pub fn reason(&self) -> &str {
    &self.reason
  }

  pub fn metadata(&self) -> Option<&Value> {
    self.metadata.as_ref()
  }

  /// The invocation where the fault originated.
  pub fn caused_by(&self) -> &InvocationRef {
    &self.caused_by
  }

  /// The invocation whose execution surfaced the fault.
  pub fn thrown_by(&self) -> &InvocationRef {
    &self.thrown_by
  }

  pub fn scope(&self) -> &FaultScope {
    &self.scope
  }

  /// Command name of the family this fault is scoped to, if dynamic.
  pub fn family(&self) -> Option<&str> {
    match &self.scope {
      FaultScope::Generic => None,
      FaultScope::Family(name) => Some(name),
    }
  }

  /// True when the fault is scoped to the `command` family.
  pub fn belongs_to(&self, command: &str) -> bool {
    self.family() == Some(command)
  }

  pub fn is_noop(&self) -> bool {
    self.kind == FaultKind::Noop
  }

  pub fn is_invalid(&self) -> bool {
    self.kind == FaultKind::Invalid
  }

  pub fn is_failure(&self) -> bool {
    self.kind == FaultKind::Failure
  }

  pub fn is_error(&self) -> bool {
    self.kind == FaultKind::Error
  }

  /// The unrecognized error this fault wraps, if any.
  pub fn exception(&self) -> Option<&Exception> {
    self.exception.as_ref()
  }
}

impl fmt::Display for Fault {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.reason)
  }
}

impl StdError for Fault {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    self.exception.as_ref().map(|exception| exception.error())
  }
}

/// An unrecognized error caught from business logic, with its type name.
///
/// Shared by the invocation that caught it and by every fault re-thrown from
/// that invocation. Two exceptions are equal when they share the same error.
#[derive(Debug, Clone)]
pub struct Exception {
  kind: Cow<'static, str>,
  error: Arc<dyn StdError + Send + Sync>,
}

impl Exception {
  pub fn new(kind: impl Into<Cow<'static, str>>, error: Arc<dyn StdError + Send + Sync>) -> Self {
    Self {
      kind: kind.into(),
      error,
    }
  }

  /// Type name of the error, e.g. `ParseIntError`.
  pub fn kind(&self) -> &str {
    &self.kind
  }

  pub fn error(&self) -> &(dyn StdError + 'static) {
    &*self.error
  }
}

impl PartialEq for Exception {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.error, &other.error)
  }
}

/// `[<kind>] <message>`.
impl fmt::Display for Exception {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}] {}", self.kind, self.error)
  }
}

/// The error type of [`Command::call`](crate::Command::call).
///
/// Any `std::error::Error` converts into a `Halt` with `?`. A [`Fault`] keeps
/// its identity through the conversion; every other error is remembered with
/// its type name and classified as an `Error` fault by the engine.
///
/// Like `anyhow::Error`, `Halt` does not implement `std::error::Error`
/// itself, otherwise the blanket conversion would overlap `From<T> for T`.
#[derive(Debug)]
pub struct Halt(pub(crate) Repr);

#[derive(Debug)]
pub(crate) enum Repr {
  Fault(Fault),
  Error {
    kind: Cow<'static, str>,
    source: Box<dyn StdError + Send + Sync>,
  },
}

impl Halt {
  /// Wrap an already boxed error under an explicit kind name.
  pub fn boxed(kind: impl Into<Cow<'static, str>>, source: Box<dyn StdError + Send + Sync>) -> Self {
    Self(Repr::Error {
      kind: kind.into(),
      source,
    })
  }

  /// The recognized fault, if this halt carries one.
  pub fn fault(&self) -> Option<&Fault> {
    match &self.0 {
      Repr::Fault(fault) => Some(fault),
      Repr::Error { .. } => None,
    }
  }

  /// Kind name of an unrecognized error, e.g. `ParseIntError`.
  pub fn error_kind(&self) -> Option<&str> {
    match &self.0 {
      Repr::Fault(_) => None,
      Repr::Error { kind, .. } => Some(kind),
    }
  }
}

impl fmt::Display for Halt {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.0 {
      Repr::Fault(fault) => write!(f, "{} fault: {}", fault.kind(), fault),
      Repr::Error { kind, source } => write!(f, "[{}] {}", kind, source),
    }
  }
}

impl<E> From<E> for Halt
where
  E: StdError + Send + Sync + 'static,
{
  fn from(error: E) -> Self {
    let kind = short_type_name::<E>();
    let boxed: Box<dyn StdError + Send + Sync> = Box::new(error);
    match boxed.downcast::<Fault>() {
      Ok(fault) => Self(Repr::Fault(*fault)),
      Err(source) => Self(Repr::Error {
        kind: Cow::Borrowed(kind),
        source,
      }),
    }
  }
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
  let full = type_name::<T>();
  let base = full.split('<').next().unwrap_or(full);
  base.rsplit("::").next().unwrap_or(base)
}
