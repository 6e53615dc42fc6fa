//! Commands and their invocation lifecycle.
//!
//! A [`Command`] holds the business logic. Running one creates an
//! [`Invocation`], which owns the command and a [`Frame`]: the per-run record
//! of state, status, causality and trace. Execution walks
//! `pending -> executing -> complete | interrupted` exactly once and leaves an
//! [`Executed`] behind for introspection.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use stint_config::Configuration;
use stint_trace::Trace;
use tracing::{Span, info, instrument, warn};
use uuid::Uuid;

use crate::causality::{self, Signal};
use crate::context::Context;
use crate::error::EngineError;
use crate::fault::{Exception, Fault, FaultScope, Halt, InvocationRef, Repr, short_type_name};
use crate::hooks::{self, Hook, Hooks};
use crate::results::Snapshot;
use crate::status::{FaultKind, Outcome, State, Status};
use crate::validation::{INVALID_INPUT_REASON, ValidationErrors};

/// What a command's `call` returns.
pub type CallResult = Result<(), Halt>;

/// A unit of business logic.
///
/// Only [`Command::call`] is required. `call` receives the invocation's
/// [`Frame`] to read and write the shared context, invoke child commands and
/// raise faults:
///
/// ```ignore
/// fn call(&mut self, frame: &mut Frame) -> CallResult {
///   if frame.context().contains("skip") {
///     return Err(frame.noop("nothing to do").into());
///   }
///   let child = frame.invoke(SendEmail);
///   frame.throw(&child)?;
///   Ok(())
/// }
/// ```
///
/// Any `std::error::Error` returned with `?` is recorded as an `error` fault.
pub trait Command: Sized + 'static {
  fn call(&mut self, frame: &mut Frame) -> CallResult;

  /// Name used in results, traces and dynamic fault families.
  fn name(&self) -> Cow<'static, str> {
    Cow::Borrowed(short_type_name::<Self>())
  }

  /// Key that advances a named trace counter instead of the plain index.
  fn trace_key(&self) -> Option<&str> {
    None
  }

  /// Checks run before `call`. Any error marks the invocation `invalid` and
  /// `call` is skipped.
  fn validate(&self, _frame: &Frame) -> ValidationErrors {
    ValidationErrors::new()
  }

  /// Lifecycle hooks for this command type. Built once per type.
  fn hooks() -> Hooks<Self> {
    Hooks::new()
  }

  /// Execute and return the finished invocation. Never fails: faults are
  /// recorded on the result.
  fn run(self, context: impl Into<Context>) -> Executed<Self> {
    Invocation::new(self, context).execute()
  }

  /// Execute and surface any non-success outcome as a [`Fault`].
  fn run_strict(self, context: impl Into<Context>) -> Result<Executed<Self>, Fault> {
    Invocation::new(self, context).execute_strict()
  }
}

/// Per-invocation record handed to [`Command::call`] and to hooks.
#[derive(Debug)]
pub struct Frame {
  context: Context,
  command: Arc<str>,
  config: Configuration,
  execution_id: Uuid,
  index: u64,
  trace: Trace,
  state: State,
  status: Status,
  reason: Option<String>,
  metadata: Option<Value>,
  caused_by: Option<InvocationRef>,
  thrown_by: Option<InvocationRef>,
  exception: Option<Exception>,
  started_at: Option<Instant>,
  runtime: Option<Duration>,
}

impl Frame {
  pub(crate) fn new(command: Arc<str>, context: Context) -> Self {
    let (config, execution_id) = {
      let ledger = context.ledger();
      (ledger.config.clone(), ledger.execution_id)
    };

    Self {
      context,
      command,
      config,
      execution_id,
      index: 0,
      trace: Trace::new(),
      state: State::Pending,
      status: Status::Success,
      reason: None,
      metadata: None,
      caused_by: None,
      thrown_by: None,
      exception: None,
      started_at: None,
      runtime: None,
    }
  }

  pub fn context(&self) -> &Context {
    &self.context
  }

  pub fn command_name(&self) -> &str {
    &self.command
  }

  pub fn config(&self) -> &Configuration {
    &self.config
  }

  pub fn execution_id(&self) -> Uuid {
    self.execution_id
  }

  /// 1-based position in the call tree; 0 until execution begins.
  pub fn index(&self) -> u64 {
    self.index
  }

  pub fn id(&self) -> InvocationRef {
    InvocationRef::new(self.index, Arc::clone(&self.command))
  }

  pub fn trace(&self) -> &Trace {
    &self.trace
  }

  pub fn state(&self) -> State {
    self.state
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn reason(&self) -> Option<&str> {
    self.reason.as_deref()
  }

  pub fn metadata(&self) -> Option<&Value> {
    self.metadata.as_ref()
  }

  /// The invocation the fault originated in.
  pub fn caused_by(&self) -> Option<&InvocationRef> {
    self.caused_by.as_ref()
  }

  /// The invocation that most recently propagated the fault.
  pub fn thrown_by(&self) -> Option<&InvocationRef> {
    self.thrown_by.as_ref()
  }

  /// The unrecognized error behind an `error` status, if any.
  pub fn exception(&self) -> Option<&Exception> {
    self.exception.as_ref()
  }

  /// Wall time of the run, once finished.
  pub fn runtime(&self) -> Option<Duration> {
    self.runtime
  }

  /// `state` while pending or when the fault came from elsewhere, `status`
  /// otherwise.
  pub fn outcome(&self) -> Outcome {
    if self.state == State::Pending || self.is_thrown() {
      Outcome::State(self.state)
    } else {
      Outcome::Status(self.status)
    }
  }

  pub fn is_pending(&self) -> bool {
    self.state == State::Pending
  }

  pub fn is_executing(&self) -> bool {
    self.state == State::Executing
  }

  pub fn is_executed(&self) -> bool {
    self.state.is_terminal()
  }

  pub fn is_complete(&self) -> bool {
    self.state == State::Complete
  }

  pub fn is_interrupted(&self) -> bool {
    self.state == State::Interrupted
  }

  pub fn is_success(&self) -> bool {
    self.status == Status::Success
  }

  /// Success or noop.
  pub fn is_ok(&self) -> bool {
    self.status.is_ok()
  }

  /// Anything but success or noop.
  pub fn is_bad(&self) -> bool {
    !self.is_ok()
  }

  pub fn is_fault(&self) -> bool {
    !self.is_success()
  }

  pub fn is_noop(&self) -> bool {
    self.status == Status::Noop
  }

  pub fn is_invalid(&self) -> bool {
    self.status == Status::Invalid
  }

  pub fn is_failure(&self) -> bool {
    self.status == Status::Failure
  }

  pub fn is_error(&self) -> bool {
    self.status == Status::Error
  }

  pub fn has_reason(&self, reason: &str) -> bool {
    self.reason.as_deref() == Some(reason)
  }

  /// True if the fault originated in this invocation.
  pub fn caused_fault(&self) -> bool {
    self.is_fault() && self.caused_by.as_ref().is_some_and(|r| r.index() == self.index)
  }

  /// True if this invocation propagated the fault itself.
  pub fn threw_fault(&self) -> bool {
    self.is_fault() && self.thrown_by.as_ref().is_some_and(|r| r.index() == self.index)
  }

  /// True if the fault arrived from another invocation.
  pub fn is_thrown(&self) -> bool {
    self.is_fault() && !self.caused_fault()
  }

  /// Record a fault of `kind` with a literal reason and return it for `?`.
  pub fn fault(&mut self, kind: FaultKind, reason: impl Into<String>, metadata: Option<Value>) -> Fault {
    let reason = reason.into();
    self.raise(kind, Signal::Reason(&reason), metadata)
  }

  pub fn noop(&mut self, reason: impl Into<String>) -> Fault {
    self.fault(FaultKind::Noop, reason, None)
  }

  pub fn invalid(&mut self, reason: impl Into<String>) -> Fault {
    self.fault(FaultKind::Invalid, reason, None)
  }

  pub fn failure(&mut self, reason: impl Into<String>) -> Fault {
    self.fault(FaultKind::Failure, reason, None)
  }

  pub fn error(&mut self, reason: impl Into<String>) -> Fault {
    self.fault(FaultKind::Error, reason, None)
  }

  /// Record a fault of `kind` stopped by `signal`.
  ///
  /// The first classification wins: if the invocation already faulted, the
  /// returned fault carries the recorded kind, reason and causality.
  pub fn raise(&mut self, kind: FaultKind, signal: Signal<'_>, metadata: Option<Value>) -> Fault {
    self.record(kind.status(), signal, metadata);
    self.fault_for(kind)
  }

  /// Propagate a child's fault. Only a successful child passes; a noop child
  /// makes this invocation a noop too.
  ///
  /// The child stays `caused_by` of this invocation and becomes its
  /// `thrown_by`. Guard with [`is_bad`](Self::is_bad) to tolerate noops.
  pub fn throw(&mut self, child: &impl AsRef<Frame>) -> Result<(), Fault> {
    let child = child.as_ref();
    if child.is_success() {
      return Ok(());
    }

    let kind = child.status.fault_kind().unwrap_or(FaultKind::Error);
    Err(self.raise(kind, Signal::Invocation(child), None))
  }

  /// Run a child command on this invocation's context.
  pub fn invoke<K: Command>(&self, command: K) -> Executed<K> {
    Invocation::new(command, &self.context).execute()
  }

  /// Run a child command on this invocation's context, surfacing its fault.
  pub fn invoke_strict<K: Command>(&self, command: K) -> Result<Executed<K>, Fault> {
    Invocation::new(command, &self.context).execute_strict()
  }

  /// Serializable terminal record of this invocation.
  pub fn snapshot(&self) -> Snapshot {
    Snapshot {
      index: self.index,
      execution_id: self.execution_id,
      command: self.command.to_string(),
      outcome: self.outcome(),
      state: self.state,
      status: self.status,
      reason: self.reason.clone(),
      metadata: self.metadata.clone(),
      caused_by: self.caused_by.as_ref().map(InvocationRef::index),
      thrown_by: self.thrown_by.as_ref().map(InvocationRef::index),
      exception: self.exception.as_ref().map(Exception::to_string),
      trace: self.trace.to_string(),
      runtime_ms: self.runtime.map_or(0.0, |d| d.as_secs_f64() * 1000.0),
    }
  }

  /// The fault matching the recorded status, if any.
  pub fn to_fault(&self) -> Option<Fault> {
    self.status.fault_kind().map(|kind| self.fault_for(kind))
  }

  fn fault_for(&self, fallback: FaultKind) -> Fault {
    let kind = self.status.fault_kind().unwrap_or(fallback);
    let id = self.id();
    let scope = if self.config.raise_dynamic_faults {
      FaultScope::Family(Arc::clone(&self.command))
    } else {
      FaultScope::Generic
    };

    Fault::new(
      kind,
      self.reason.clone().unwrap_or_default(),
      self.metadata.clone(),
      self.caused_by.clone().unwrap_or_else(|| id.clone()),
      self.thrown_by.clone().unwrap_or(id),
      scope,
      self.exception.clone(),
    )
  }

  fn record(&mut self, status: Status, signal: Signal<'_>, metadata: Option<Value>) {
    // Terminal frames are snapshots
    if self.state.is_terminal() {
      return;
    }
    if self.status == Status::Success {
      self.status = status;
    }
    if self.metadata.is_none() {
      self.metadata = metadata;
    }

    let resolution = causality::resolve(&self.id(), self.metadata.as_ref(), &signal);
    if self.reason.is_none() {
      self.reason = resolution.reason;
    }
    if self.metadata.is_none() {
      self.metadata = resolution.metadata;
    }
    self.caused_by.get_or_insert(resolution.caused_by);
    self.thrown_by.get_or_insert(resolution.thrown_by);
    if self.exception.is_none() {
      self.exception = resolution.exception;
    }
  }

  fn absorb(&mut self, halt: Halt) {
    match halt.0 {
      Repr::Fault(fault) => self.record(fault.status(), Signal::Fault(&fault), None),
      Repr::Error { kind, source } => {
        let exception = Exception::new(kind, Arc::from(source));
        self.record(Status::Error, Signal::Error(&exception), None)
      }
    }
  }

  /// Assign the index and trace, and enter one level of nesting.
  fn begin(&mut self, trace_key: Option<&str>) -> Result<(), EngineError> {
    let (trace, depth) = {
      let mut ledger = self.context.ledger_mut();
      let next = match trace_key {
        Some(key) if !key.is_empty() => ledger.trace.advance(key),
        _ => ledger.trace.step(),
      };
      ledger.depth += 1;
      ledger.trace = next.clone();
      (next, ledger.depth)
    };

    self.index = trace.index();
    self.trace = trace;
    self.started_at = Some(Instant::now());

    match self.config.max_call_depth {
      Some(limit) if depth > limit => Err(EngineError::CallDepthExceeded { limit }),
      _ => Ok(()),
    }
  }

  /// Leave the nesting level and append the snapshot to the result log.
  fn finish(&mut self) {
    self.runtime = self.started_at.map(|started| started.elapsed());

    let snapshot = self.snapshot();
    {
      let mut ledger = self.context.ledger_mut();
      ledger.depth = ledger.depth.saturating_sub(1);
      ledger.results.push(snapshot);
    }

    if self.index == 1 && self.config.freeze_context {
      self.context.freeze();
    }
  }
}

impl AsRef<Frame> for Frame {
  fn as_ref(&self) -> &Frame {
    self
  }
}

/// A command bound to a context, ready to execute once.
pub struct Invocation<C: Command> {
  command: C,
  frame: Frame,
  hooks: Rc<Hooks<C>>,
}

impl<C: Command> Invocation<C> {
  /// Bind `command` to `context`. A frozen context is replaced by a writable
  /// copy. Fires `after_initialize` then `on_pending`.
  pub fn new(command: C, context: impl Into<Context>) -> Self {
    let context = Context::build(context.into());
    let frame = Frame::new(Arc::from(command.name()), context);

    let mut invocation = Self {
      command,
      frame,
      hooks: hooks::registry::<C>(),
    };
    invocation.fire(Hook::AfterInitialize);
    invocation.fire(Hook::OnPending);
    invocation
  }

  pub fn command(&self) -> &C {
    &self.command
  }

  pub fn frame(&self) -> &Frame {
    &self.frame
  }

  pub fn state(&self) -> State {
    self.frame.state
  }

  pub fn status(&self) -> Status {
    self.frame.status
  }

  /// Run the lifecycle. Faults never escape; inspect the result instead.
  #[instrument(
    name = "invocation",
    skip_all,
    fields(
      command = %self.frame.command_name(),
      index = tracing::field::Empty,
    )
  )]
  pub fn execute(mut self) -> Executed<C> {
    let began = self.frame.begin(self.command.trace_key());
    Span::current().record("index", self.frame.index);

    info!(
      execution_id = %self.frame.execution_id,
      trace = %self.frame.trace,
      "invocation_started"
    );

    self.fire(Hook::BeforeExecution);

    match began {
      Ok(()) => self.perform(),
      Err(error) => {
        warn!(error = %error, "call_depth_exceeded");
        self.frame.absorb(Halt::from(error));
      }
    }

    self.settle()
  }

  /// Run the lifecycle and surface any non-success outcome, noop included,
  /// as a [`Fault`]. Bookkeeping and hooks run first either way.
  pub fn execute_strict(self) -> Result<Executed<C>, Fault> {
    let executed = self.execute();
    match executed.frame.to_fault() {
      None => Ok(executed),
      Some(fault) => {
        warn!(
          command = %executed.frame.command,
          index = executed.frame.index,
          kind = %fault.kind(),
          reason = %fault.reason(),
          "invocation_fault_raised"
        );
        Err(fault)
      }
    }
  }

  fn perform(&mut self) {
    // Validate before doing any work
    self.fire(Hook::BeforeValidation);
    let errors = self.command.validate(&self.frame);
    self.fire(Hook::AfterValidation);

    if !errors.is_empty() {
      let metadata = errors.to_value();
      self
        .frame
        .record(Status::Invalid, Signal::Reason(INVALID_INPUT_REASON), Some(metadata));
      return;
    }

    self.frame.state = State::Executing;
    self.fire(Hook::OnExecuting);

    if let Err(halt) = self.command.call(&mut self.frame) {
      self.frame.absorb(halt);
    }
  }

  fn settle(mut self) -> Executed<C> {
    self.frame.state = if self.frame.is_success() {
      State::Complete
    } else {
      State::Interrupted
    };

    self.fire(Hook::AfterExecution);
    self.fire(Hook::for_status(self.frame.status));
    self.fire(Hook::for_state(self.frame.state));

    self.frame.finish();

    let runtime_ms = self.frame.runtime.map_or(0.0, |d| d.as_secs_f64() * 1000.0);
    if self.frame.is_complete() {
      info!(runtime_ms, "invocation_completed");
    } else {
      warn!(
        status = %self.frame.status,
        reason = self.frame.reason.as_deref().unwrap_or_default(),
        caused_by = self.frame.caused_by.as_ref().map(InvocationRef::index),
        runtime_ms,
        "invocation_interrupted"
      );
    }

    Executed {
      command: self.command,
      frame: self.frame,
    }
  }

  fn fire(&mut self, hook: Hook) {
    self.hooks.fire(hook, &mut self.command, &self.frame);
  }
}

/// A finished invocation.
#[derive(Debug)]
pub struct Executed<C> {
  command: C,
  frame: Frame,
}

impl<C> Executed<C> {
  pub fn command(&self) -> &C {
    &self.command
  }

  pub fn into_command(self) -> C {
    self.command
  }

  pub fn frame(&self) -> &Frame {
    &self.frame
  }

  pub fn into_frame(self) -> Frame {
    self.frame
  }

  pub fn context(&self) -> &Context {
    self.frame.context()
  }

  pub fn index(&self) -> u64 {
    self.frame.index()
  }

  pub fn id(&self) -> InvocationRef {
    self.frame.id()
  }

  pub fn state(&self) -> State {
    self.frame.state()
  }

  pub fn status(&self) -> Status {
    self.frame.status()
  }

  pub fn outcome(&self) -> Outcome {
    self.frame.outcome()
  }

  pub fn reason(&self) -> Option<&str> {
    self.frame.reason()
  }

  pub fn metadata(&self) -> Option<&Value> {
    self.frame.metadata()
  }

  pub fn caused_by(&self) -> Option<&InvocationRef> {
    self.frame.caused_by()
  }

  pub fn thrown_by(&self) -> Option<&InvocationRef> {
    self.frame.thrown_by()
  }

  pub fn exception(&self) -> Option<&Exception> {
    self.frame.exception()
  }

  pub fn trace(&self) -> &Trace {
    self.frame.trace()
  }

  pub fn is_success(&self) -> bool {
    self.frame.is_success()
  }

  pub fn is_ok(&self) -> bool {
    self.frame.is_ok()
  }

  pub fn is_bad(&self) -> bool {
    self.frame.is_bad()
  }

  pub fn snapshot(&self) -> Snapshot {
    self.frame.snapshot()
  }
}

impl<C> AsRef<Frame> for Executed<C> {
  fn as_ref(&self) -> &Frame {
    &self.frame
  }
}
