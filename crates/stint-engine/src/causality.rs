//! Causality resolution.
//!
//! [`resolve`] turns whatever stopped an invocation into a normalized
//! reason, metadata, origin and proximate thrower. The invocation applies the
//! result first-wins, so re-throwing a child's fault keeps the child as the
//! origin instead of blaming the parent.

use serde_json::Value;

use crate::fault::{Exception, Fault, InvocationRef};
use crate::invocation::Frame;

/// The object an invocation stopped with.
#[derive(Debug, Clone, Copy)]
pub enum Signal<'a> {
  /// A recognized fault, e.g. one propagated from a strict child call.
  Fault(&'a Fault),
  /// Another invocation being re-thrown.
  Invocation(&'a Frame),
  /// An unrecognized error.
  Error(&'a Exception),
  /// A literal reason.
  Reason(&'a str),
}

/// Normalized causality for one fault.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
  pub reason: Option<String>,
  pub metadata: Option<Value>,
  pub caused_by: InvocationRef,
  pub thrown_by: InvocationRef,
  /// The unrecognized error at the origin, carried through re-throws.
  pub exception: Option<Exception>,
}

/// Derive causality for `origin` stopping with `signal`.
///
/// - `caused_by`: the signal's origin if it has one, else `origin`.
/// - `thrown_by`: a finished invocation is its own thrower; otherwise the
///   signal's thrower, falling back to `caused_by`.
/// - `reason`: the signal's reason; errors render as `[<kind>] <message>`
///   without a trailing period.
/// - `metadata`: the signal's metadata, else `own_metadata`.
pub fn resolve(origin: &InvocationRef, own_metadata: Option<&Value>, signal: &Signal<'_>) -> Resolution {
  let caused_by = match signal {
    Signal::Fault(fault) => fault.caused_by().clone(),
    Signal::Invocation(frame) => frame.caused_by().cloned().unwrap_or_else(|| origin.clone()),
    Signal::Error(_) | Signal::Reason(_) => origin.clone(),
  };

  let thrown_by = match signal {
    Signal::Invocation(frame) if frame.is_executed() => frame.id(),
    Signal::Invocation(frame) => frame.thrown_by().cloned().unwrap_or_else(|| caused_by.clone()),
    Signal::Fault(fault) => fault.thrown_by().clone(),
    Signal::Error(_) | Signal::Reason(_) => caused_by.clone(),
  };

  let reason = match signal {
    Signal::Fault(fault) => Some(fault.reason().to_string()),
    Signal::Invocation(frame) => frame.reason().map(str::to_string),
    Signal::Error(exception) => Some(error_reason(exception)),
    Signal::Reason(reason) => Some(reason.to_string()),
  };

  let metadata = match signal {
    Signal::Fault(fault) => fault.metadata().cloned(),
    Signal::Invocation(frame) => frame.metadata().cloned(),
    Signal::Error(_) | Signal::Reason(_) => None,
  }
  .or_else(|| own_metadata.cloned());

  let exception = match signal {
    Signal::Fault(fault) => fault.exception().cloned(),
    Signal::Invocation(frame) => frame.exception().cloned(),
    Signal::Error(exception) => Some((*exception).clone()),
    Signal::Reason(_) => None,
  };

  Resolution {
    reason,
    metadata,
    caused_by,
    thrown_by,
    exception,
  }
}

fn error_reason(exception: &Exception) -> String {
  let reason = exception.to_string();
  match reason.strip_suffix('.') {
    Some(trimmed) => trimmed.to_string(),
    None => reason,
  }
}
