//! Lifecycle hooks.
//!
//! Each command type owns a [`Hooks`] table built once by
//! [`Command::hooks`] and memoized per type. A table can start from a parent
//! table so that callbacks registered on a "base" command run before the
//! ones a more specific command adds.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::invocation::{Command, Frame};
use crate::status::{State, Status};

/// A named point in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
  AfterInitialize,
  BeforeValidation,
  AfterValidation,
  BeforeExecution,
  AfterExecution,
  OnSuccess,
  OnNoop,
  OnInvalid,
  OnFailure,
  OnError,
  OnPending,
  OnExecuting,
  OnComplete,
  OnInterrupted,
}

impl Hook {
  pub const ALL: [Hook; 14] = [
    Hook::AfterInitialize,
    Hook::BeforeValidation,
    Hook::AfterValidation,
    Hook::BeforeExecution,
    Hook::AfterExecution,
    Hook::OnSuccess,
    Hook::OnNoop,
    Hook::OnInvalid,
    Hook::OnFailure,
    Hook::OnError,
    Hook::OnPending,
    Hook::OnExecuting,
    Hook::OnComplete,
    Hook::OnInterrupted,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Hook::AfterInitialize => "after_initialize",
      Hook::BeforeValidation => "before_validation",
      Hook::AfterValidation => "after_validation",
      Hook::BeforeExecution => "before_execution",
      Hook::AfterExecution => "after_execution",
      Hook::OnSuccess => "on_success",
      Hook::OnNoop => "on_noop",
      Hook::OnInvalid => "on_invalid",
      Hook::OnFailure => "on_failure",
      Hook::OnError => "on_error",
      Hook::OnPending => "on_pending",
      Hook::OnExecuting => "on_executing",
      Hook::OnComplete => "on_complete",
      Hook::OnInterrupted => "on_interrupted",
    }
  }

  pub fn for_status(status: Status) -> Hook {
    match status {
      Status::Success => Hook::OnSuccess,
      Status::Noop => Hook::OnNoop,
      Status::Invalid => Hook::OnInvalid,
      Status::Failure => Hook::OnFailure,
      Status::Error => Hook::OnError,
    }
  }

  pub fn for_state(state: State) -> Hook {
    match state {
      State::Pending => Hook::OnPending,
      State::Executing => Hook::OnExecuting,
      State::Complete => Hook::OnComplete,
      State::Interrupted => Hook::OnInterrupted,
    }
  }
}

impl fmt::Display for Hook {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

type Callback<C> = Rc<dyn Fn(&mut C, &Frame)>;

struct Registration<C> {
  name: Cow<'static, str>,
  callback: Callback<C>,
}

impl<C> Clone for Registration<C> {
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      callback: Rc::clone(&self.callback),
    }
  }
}

/// Ordered callbacks per [`Hook`] for one command type.
///
/// Callbacks of a hook run in registration order. Tables are plain values:
/// clone one to extend it for the same command type, or use
/// [`Hooks::inherit`] to reuse a parent command's table.
pub struct Hooks<C> {
  table: HashMap<Hook, Vec<Registration<C>>>,
}

impl<C: 'static> Hooks<C> {
  pub fn new() -> Self {
    Self {
      table: HashMap::new(),
    }
  }

  /// Start from every callback of `parent`, projected onto `C` through
  /// `AsMut`. The parent's callbacks stay ahead of anything added later.
  pub fn inherit<P: 'static>(parent: &Hooks<P>) -> Self
  where
    C: AsMut<P>,
  {
    let table = parent
      .table
      .iter()
      .map(|(hook, registrations)| {
        let projected = registrations
          .iter()
          .map(|registration| {
            let callback = Rc::clone(&registration.callback);
            Registration {
              name: registration.name.clone(),
              callback: Rc::new(move |command: &mut C, frame: &Frame| callback(command.as_mut(), frame))
                as Callback<C>,
            }
          })
          .collect();
        (*hook, projected)
      })
      .collect();

    Self { table }
  }

  /// Append a named callback to `hook`.
  pub fn on<F>(mut self, hook: Hook, name: impl Into<Cow<'static, str>>, callback: F) -> Self
  where
    F: Fn(&mut C, &Frame) + 'static,
  {
    self.table.entry(hook).or_default().push(Registration {
      name: name.into(),
      callback: Rc::new(callback),
    });
    self
  }

  /// Append the same callback to several hooks.
  pub fn on_each<F>(mut self, hooks: impl IntoIterator<Item = Hook>, name: impl Into<Cow<'static, str>>, callback: F) -> Self
  where
    F: Fn(&mut C, &Frame) + 'static,
  {
    let name = name.into();
    let callback: Callback<C> = Rc::new(callback);
    for hook in hooks {
      self.table.entry(hook).or_default().push(Registration {
        name: name.clone(),
        callback: Rc::clone(&callback),
      });
    }
    self
  }

  /// Callback names registered for `hook`, in run order.
  pub fn names(&self, hook: Hook) -> Vec<&str> {
    self
      .table
      .get(&hook)
      .map(|registrations| registrations.iter().map(|r| r.name.as_ref()).collect())
      .unwrap_or_default()
  }

  pub fn is_empty(&self) -> bool {
    self.table.values().all(Vec::is_empty)
  }

  pub(crate) fn fire(&self, hook: Hook, command: &mut C, frame: &Frame) {
    let Some(registrations) = self.table.get(&hook) else {
      return;
    };

    for registration in registrations {
      trace!(
        hook = %hook,
        callback = %registration.name,
        command = frame.command_name(),
        index = frame.index(),
        "hook_fired"
      );
      (registration.callback)(command, frame);
    }
  }
}

impl<C: 'static> Default for Hooks<C> {
  fn default() -> Self {
    Self::new()
  }
}

impl<C> Clone for Hooks<C> {
  fn clone(&self) -> Self {
    Self {
      table: self.table.clone(),
    }
  }
}

impl<C> fmt::Debug for Hooks<C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut map = f.debug_map();
    for hook in Hook::ALL {
      if let Some(registrations) = self.table.get(&hook) {
        let names: Vec<&str> = registrations.iter().map(|r| r.name.as_ref()).collect();
        map.entry(&hook.as_str(), &names);
      }
    }
    map.finish()
  }
}

thread_local! {
  static REGISTRY: RefCell<HashMap<TypeId, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

/// The memoized hook table of `C`.
pub(crate) fn registry<C: Command>() -> Rc<Hooks<C>> {
  let id = TypeId::of::<C>();
  let cached = REGISTRY.with(|registry| registry.borrow().get(&id).cloned());
  if let Some(hooks) = cached.and_then(|any| any.downcast::<Hooks<C>>().ok()) {
    return hooks;
  }

  // Built outside the borrow: a table may invoke other commands' tables.
  let hooks = Rc::new(C::hooks());
  REGISTRY.with(|registry| {
    registry
      .borrow_mut()
      .insert(id, Rc::clone(&hooks) as Rc<dyn Any>);
  });
  hooks
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::Context;

  #[derive(Default)]
  struct Base {
    seen: Vec<String>,
  }

  #[derive(Default)]
  struct Derived {
    base: Base,
  }

  impl AsMut<Base> for Derived {
    fn as_mut(&mut self) -> &mut Base {
      &mut self.base
    }
  }

  fn frame() -> Frame {
    Frame::new("Derived".into(), Context::new())
  }

  #[test]
  fn test_status_and_state_hooks() {
    assert_eq!(Hook::for_status(Status::Noop), Hook::OnNoop);
    assert_eq!(Hook::for_state(State::Interrupted), Hook::OnInterrupted);
    assert_eq!(Hook::BeforeExecution.to_string(), "before_execution");
  }

  #[test]
  fn test_inherited_callbacks_run_first() {
    let base = Hooks::<Base>::new().on(Hook::OnSuccess, "base", |cmd, _| cmd.seen.push("base".into()));
    let derived = Hooks::<Derived>::inherit(&base).on(Hook::OnSuccess, "derived", |cmd, _| {
      cmd.base.seen.push("derived".into())
    });

    assert_eq!(derived.names(Hook::OnSuccess), vec!["base", "derived"]);
    assert_eq!(base.names(Hook::OnSuccess), vec!["base"]);

    let mut command = Derived::default();
    derived.fire(Hook::OnSuccess, &mut command, &frame());
    assert_eq!(command.base.seen, vec!["base", "derived"]);
  }

  #[test]
  fn test_on_each_registers_every_hook() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let hooks = Hooks::<Base>::new().on_each([Hook::OnNoop, Hook::OnFailure], "audit", move |_, frame| {
      sink.borrow_mut().push(frame.command_name().to_string())
    });

    let mut command = Base::default();
    hooks.fire(Hook::OnNoop, &mut command, &frame());
    hooks.fire(Hook::OnFailure, &mut command, &frame());
    hooks.fire(Hook::OnError, &mut command, &frame());

    assert_eq!(calls.borrow().len(), 2);
    assert!(hooks.names(Hook::OnError).is_empty());
  }
}
