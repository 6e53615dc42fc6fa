//! Integration tests for the invocation lifecycle.

use serde_json::json;
use stint_engine::{
  CallResult, Command, Configuration, Context, Frame, INVALID_INPUT_REASON, Outcome, State, Status,
  ValidationErrors,
};

#[derive(Debug)]
struct Pass;

impl Command for Pass {
  fn call(&mut self, _frame: &mut Frame) -> CallResult {
    Ok(())
  }
}

#[derive(Debug)]
struct Skip;

impl Command for Skip {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    Err(frame.noop("skip").into())
  }
}

#[derive(Debug, thiserror::Error)]
#[error("boom")]
struct RuntimeError;

#[derive(Debug)]
struct Explode;

impl Command for Explode {
  fn call(&mut self, _frame: &mut Frame) -> CallResult {
    Err(RuntimeError.into())
  }
}

#[derive(Debug)]
struct ParseCount;

impl Command for ParseCount {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    let raw: String = frame.context().get_as("count")?.unwrap_or_default();
    let count: u32 = raw.parse()?;
    frame.context().set("parsed", count)?;
    Ok(())
  }
}

#[derive(Debug, Default)]
struct RequireEmail {
  called: bool,
}

impl Command for RequireEmail {
  fn validate(&self, frame: &Frame) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if !frame.context().contains("email") {
      errors.add("email", "is required");
    }
    errors
  }

  fn call(&mut self, _frame: &mut Frame) -> CallResult {
    self.called = true;
    Ok(())
  }
}

#[derive(Debug)]
struct Recurse;

impl Command for Recurse {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    let child = frame.invoke(Recurse);
    frame.throw(&child)?;
    Ok(())
  }
}

#[test]
fn test_successful_invocation() {
  let context = Context::try_from(json!({ "email": "jane@example.com" })).expect("object seed");

  let executed = Pass.run(&context);

  assert_eq!(executed.state(), State::Complete);
  assert_eq!(executed.status(), Status::Success);
  assert_eq!(executed.index(), 1);
  assert_eq!(executed.reason(), None);
  assert_eq!(executed.caused_by(), None);
  assert_eq!(executed.outcome(), Outcome::Status(Status::Success));
  assert!(executed.context().ptr_eq(&context));

  let results = context.results();
  assert_eq!(results.len(), 1);
  assert_eq!(results.commands(), vec!["Pass"]);
  assert_eq!(results.as_slice()[0].execution_id, context.execution_id());
}

#[test]
fn test_root_completion_freezes_context() {
  let context = Context::new();
  Pass.run(&context);

  assert!(context.is_frozen());
  assert!(context.set("late", true).is_err());
}

#[test]
fn test_freeze_can_be_disabled() {
  let config = Configuration {
    freeze_context: false,
    ..Configuration::default()
  };
  let context = Context::with_config(config);
  Pass.run(&context);

  assert!(!context.is_frozen());
}

#[test]
fn test_frozen_context_is_copied() {
  let context = Context::try_from(json!({ "attr": 1 })).expect("object seed");
  Pass.run(&context);

  let second = Pass.run(&context);

  assert!(!second.context().ptr_eq(&context));
  assert_eq!(second.context().get("attr"), Some(json!(1)));
  assert_eq!(second.index(), 1);
  assert_eq!(context.results().len(), 1);
}

#[test]
fn test_noop_interrupts_but_is_ok() {
  let executed = Skip.run(Context::new());

  assert_eq!(executed.state(), State::Interrupted);
  assert_eq!(executed.status(), Status::Noop);
  assert_eq!(executed.reason(), Some("skip"));
  assert!(executed.is_ok());
  assert!(!executed.is_bad());
  assert_eq!(executed.caused_by().map(|r| r.index()), Some(1));
  assert_eq!(executed.thrown_by().map(|r| r.index()), Some(1));
}

#[test]
fn test_unrecognized_error_is_classified() {
  let executed = Explode.run(Context::new());

  assert_eq!(executed.status(), Status::Error);
  assert_eq!(executed.reason(), Some("[RuntimeError] boom"));
  assert!(executed.frame().caused_fault());

  let snapshot = serde_json::to_value(executed.snapshot()).expect("snapshot serializes");
  assert_eq!(snapshot["exception"], json!("[RuntimeError] boom"));
}

#[test]
fn test_question_mark_on_std_errors() {
  let context = Context::try_from(json!({ "count": "abc" })).expect("object seed");

  let executed = ParseCount.run(&context);

  assert!(executed.frame().is_error());
  assert_eq!(
    executed.reason(),
    Some("[ParseIntError] invalid digit found in string")
  );
  assert!(!context.contains("parsed"));
}

#[test]
fn test_call_writes_to_shared_context() {
  let context = Context::try_from(json!({ "count": "42" })).expect("object seed");

  let executed = ParseCount.run(&context);

  assert!(executed.is_success());
  assert_eq!(context.get("parsed"), Some(json!(42)));
}

#[test]
fn test_validation_failure_skips_call() {
  let executed = RequireEmail::default().run(Context::new());

  assert_eq!(executed.status(), Status::Invalid);
  assert_eq!(executed.state(), State::Interrupted);
  assert_eq!(executed.reason(), Some(INVALID_INPUT_REASON));
  assert_eq!(executed.metadata(), Some(&json!({ "email": ["is required"] })));
  assert!(!executed.command().called);
}

#[test]
fn test_validation_success_runs_call() {
  let context = Context::try_from(json!({ "email": "jane@example.com" })).expect("object seed");

  let executed = RequireEmail::default().run(context);

  assert!(executed.is_success());
  assert!(executed.command().called);
}

#[test]
fn test_strict_surfaces_noop_after_bookkeeping() {
  let context = Context::new();

  let fault = Skip.run_strict(&context).expect_err("noop should surface");

  assert!(fault.is_noop());
  assert_eq!(fault.reason(), "skip");
  assert_eq!(fault.caused_by().index(), 1);
  assert_eq!(fault.family(), None);

  let results = context.results();
  assert_eq!(results.len(), 1);
  assert_eq!(results.as_slice()[0].status, Status::Noop);
  assert!(context.is_frozen());
}

#[test]
fn test_strict_success_returns_result() {
  let executed = Pass.run_strict(Context::new()).expect("pass should succeed");

  assert!(executed.is_success());
}

#[test]
fn test_dynamic_fault_families() {
  let config = Configuration {
    raise_dynamic_faults: true,
    ..Configuration::default()
  };

  let fault = Explode
    .run_strict(Context::with_config(config))
    .expect_err("error should surface");

  assert!(fault.is_error());
  assert_eq!(fault.family(), Some("Explode"));
  assert!(fault.belongs_to("Explode"));
  assert!(!fault.belongs_to("Pass"));
}

#[test]
fn test_call_depth_limit() {
  let config = Configuration {
    max_call_depth: Some(3),
    ..Configuration::default()
  };
  let context = Context::with_config(config);

  let executed = Recurse.run(&context);

  assert!(executed.frame().is_error());
  assert_eq!(
    executed.reason(),
    Some("[EngineError] maximum call depth of 3 exceeded")
  );
  assert_eq!(executed.caused_by().map(|r| r.index()), Some(4));
  assert_eq!(executed.thrown_by().map(|r| r.index()), Some(2));

  let results = context.results();
  assert_eq!(results.len(), 4);
  let deepest = results.get(4).expect("deepest invocation recorded");
  assert_eq!(deepest.status, Status::Error);
  assert_eq!(deepest.state, State::Interrupted);
}

#[test]
fn test_snapshot_serialization_omits_empty_fields() {
  let executed = Pass.run(Context::new());

  let value = serde_json::to_value(executed.snapshot()).expect("snapshot serializes");

  assert_eq!(value["command"], "Pass");
  assert_eq!(value["outcome"], "success");
  assert_eq!(value["state"], "complete");
  assert_eq!(value["trace"], "1");
  assert!(value.get("reason").is_none());
  assert!(value.get("caused_by").is_none());
}
