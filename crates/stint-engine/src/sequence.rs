//! Ordered composition of commands.

use std::borrow::Cow;
use std::fmt;

use tracing::debug;

use crate::context::Context;
use crate::fault::short_type_name;
use crate::invocation::{CallResult, Command, Frame};

type Runner = Box<dyn Fn(&Frame) -> Frame>;
type Predicate = Box<dyn Fn(&Context) -> bool>;

enum Guard {
  Always,
  When(Predicate),
  Unless(Predicate),
}

/// One entry of a [`Sequence`]: a command factory and an optional guard
/// evaluated against the shared context right before the step runs.
pub struct Step {
  label: Cow<'static, str>,
  runner: Runner,
  guard: Guard,
}

impl Step {
  /// A step that builds a fresh `K` each time it runs.
  pub fn new<K, F>(factory: F) -> Self
  where
    K: Command,
    F: Fn() -> K + 'static,
  {
    Self {
      label: Cow::Borrowed(short_type_name::<K>()),
      runner: Box::new(move |frame: &Frame| frame.invoke(factory()).into_frame()),
      guard: Guard::Always,
    }
  }

  /// Run only when `predicate` holds.
  pub fn when(mut self, predicate: impl Fn(&Context) -> bool + 'static) -> Self {
    self.guard = Guard::When(Box::new(predicate));
    self
  }

  /// Skip when `predicate` holds.
  pub fn unless(mut self, predicate: impl Fn(&Context) -> bool + 'static) -> Self {
    self.guard = Guard::Unless(Box::new(predicate));
    self
  }

  pub fn labeled(mut self, label: impl Into<Cow<'static, str>>) -> Self {
    self.label = label.into();
    self
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn should_run(&self, context: &Context) -> bool {
    match &self.guard {
      Guard::Always => true,
      Guard::When(predicate) => predicate(context),
      Guard::Unless(predicate) => !predicate(context),
    }
  }
}

impl fmt::Debug for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let guard = match self.guard {
      Guard::Always => "always",
      Guard::When(_) => "when",
      Guard::Unless(_) => "unless",
    };
    f.debug_struct("Step")
      .field("label", &self.label)
      .field("guard", &guard)
      .finish()
  }
}

/// A command that runs its steps in order on the shared context.
///
/// A step whose result is bad (invalid, failure or error) is thrown and stops
/// the sequence. A noop step does not.
pub struct Sequence {
  name: Cow<'static, str>,
  trace_key: Option<String>,
  steps: Vec<Step>,
}

impl Sequence {
  pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
    Self {
      name: name.into(),
      trace_key: None,
      steps: Vec::new(),
    }
  }

  /// Advance the trace under `key` when this sequence runs.
  pub fn traced(mut self, key: impl Into<String>) -> Self {
    self.trace_key = Some(key.into());
    self
  }

  pub fn step(mut self, step: Step) -> Self {
    self.steps.push(step);
    self
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }
}

impl Command for Sequence {
  fn name(&self) -> Cow<'static, str> {
    self.name.clone()
  }

  fn trace_key(&self) -> Option<&str> {
    self.trace_key.as_deref()
  }

  fn call(&mut self, frame: &mut Frame) -> CallResult {
    for step in &self.steps {
      if !step.should_run(frame.context()) {
        debug!(sequence = %self.name, step = step.label(), "step_skipped");
        continue;
      }

      let child = (step.runner)(&*frame);
      if child.is_bad() {
        frame.throw(&child)?;
      }
    }
    Ok(())
  }
}

impl fmt::Debug for Sequence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Sequence")
      .field("name", &self.name)
      .field("trace_key", &self.trace_key)
      .field("steps", &self.steps)
      .finish()
  }
}
