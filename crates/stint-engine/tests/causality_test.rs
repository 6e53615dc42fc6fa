//! Integration tests for fault causality across nested invocations.

use std::error::Error as _;

use serde_json::json;
use stint_engine::{CallResult, Command, Context, FaultKind, Frame, Outcome, State, Status};

/// Fails with a fixed reason and metadata.
#[derive(Debug)]
struct BadState;

impl Command for BadState {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    Err(
      frame
        .fault(FaultKind::Failure, "bad state", Some(json!({ "code": 409 })))
        .into(),
    )
  }
}

#[derive(Debug)]
struct Skip;

impl Command for Skip {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    Err(frame.noop("skip").into())
  }
}

/// Runs `BadState` and re-throws its result.
#[derive(Debug)]
struct Parent;

impl Command for Parent {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    let child = frame.invoke(BadState);
    frame.throw(&child)?;
    frame.context().set("after_child", true)?;
    Ok(())
  }
}

/// Runs `BadState` strictly and propagates the fault with `?`.
#[derive(Debug)]
struct StrictParent;

impl Command for StrictParent {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    frame.invoke_strict(BadState)?;
    Ok(())
  }
}

#[derive(Debug)]
struct Grandparent;

impl Command for Grandparent {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    let child = frame.invoke(Parent);
    frame.throw(&child)?;
    Ok(())
  }
}

/// A noop child does not stop the parent.
#[derive(Debug)]
struct Tolerant;

impl Command for Tolerant {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    let child = frame.invoke(Skip);
    if child.is_bad() {
      frame.throw(&child)?;
    }
    frame.context().set("continued", true)?;
    Ok(())
  }
}

/// Re-throws whatever its noop child ended with.
#[derive(Debug)]
struct Forward;

impl Command for Forward {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    let child = frame.invoke(Skip);
    frame.throw(&child)?;
    frame.context().set("continued", true)?;
    Ok(())
  }
}

#[derive(Debug, thiserror::Error)]
#[error("disk full.")]
struct DiskFull;

#[derive(Debug)]
struct WriteFile;

impl Command for WriteFile {
  fn call(&mut self, _frame: &mut Frame) -> CallResult {
    Err(DiskFull.into())
  }
}

#[derive(Debug)]
struct Export;

impl Command for Export {
  fn call(&mut self, frame: &mut Frame) -> CallResult {
    let child = frame.invoke(WriteFile);
    frame.throw(&child)?;
    Ok(())
  }
}

#[test]
fn test_parent_rethrows_child_fault() {
  let context = Context::new();

  let parent = Parent.run(&context);

  assert_eq!(parent.status(), Status::Failure);
  assert_eq!(parent.state(), State::Interrupted);
  assert_eq!(parent.reason(), Some("bad state"));
  assert_eq!(parent.metadata(), Some(&json!({ "code": 409 })));
  assert_eq!(parent.caused_by().map(|r| r.index()), Some(2));
  assert_eq!(parent.caused_by().map(|r| r.command()), Some("BadState"));
  assert_eq!(parent.thrown_by().map(|r| r.index()), Some(2));
  assert!(parent.frame().is_thrown());
  assert!(!parent.frame().caused_fault());
  assert_eq!(parent.outcome(), Outcome::State(State::Interrupted));
  assert!(!context.contains("after_child"));

  let results = context.results();
  assert_eq!(results.commands(), vec!["Parent", "BadState"]);

  let child = results.get(2).expect("child recorded");
  assert_eq!(child.caused_by, Some(2));
  assert_eq!(child.thrown_by, Some(2));
  assert_eq!(child.outcome, Outcome::Status(Status::Failure));
}

#[test]
fn test_strict_child_fault_keeps_origin() {
  let context = Context::new();

  let parent = StrictParent.run(&context);

  assert_eq!(parent.status(), Status::Failure);
  assert_eq!(parent.reason(), Some("bad state"));
  assert_eq!(parent.metadata(), Some(&json!({ "code": 409 })));
  assert_eq!(parent.caused_by().map(|r| r.index()), Some(2));
  assert_eq!(parent.thrown_by().map(|r| r.index()), Some(2));
  assert_eq!(context.results().len(), 2);
}

#[test]
fn test_thrown_by_tracks_latest_propagation() {
  let context = Context::new();

  let root = Grandparent.run(&context);

  assert_eq!(root.status(), Status::Failure);
  assert_eq!(root.reason(), Some("bad state"));
  assert_eq!(root.caused_by().map(|r| r.index()), Some(3));
  assert_eq!(root.thrown_by().map(|r| r.index()), Some(2));

  let results = context.results();
  assert_eq!(results.commands(), vec!["Grandparent", "Parent", "BadState"]);
  let parent = results.get(2).expect("parent recorded");
  assert_eq!(parent.caused_by, Some(3));
  assert_eq!(parent.thrown_by, Some(3));
}

#[test]
fn test_thrown_noop_child_makes_parent_noop() {
  let context = Context::new();

  let parent = Forward.run(&context);

  assert_eq!(parent.status(), Status::Noop);
  assert_eq!(parent.state(), State::Interrupted);
  assert_eq!(parent.reason(), Some("skip"));
  assert_eq!(parent.caused_by().map(|r| r.index()), Some(2));
  assert_eq!(parent.thrown_by().map(|r| r.index()), Some(2));
  assert!(parent.frame().is_thrown());
  assert!(!context.contains("continued"));

  let child = context.results().get(2).cloned().expect("child recorded");
  assert_eq!(child.status, Status::Noop);
}

#[test]
fn test_guarded_noop_child_is_tolerated() {
  let context = Context::new();

  let parent = Tolerant.run(&context);

  assert!(parent.is_success());
  assert_eq!(parent.caused_by(), None);
  assert_eq!(context.get("continued"), Some(json!(true)));

  let child = context.results().get(2).cloned().expect("child recorded");
  assert_eq!(child.status, Status::Noop);
  assert_eq!(child.reason.as_deref(), Some("skip"));
}

#[test]
fn test_rethrown_error_keeps_wrapped_error() {
  let context = Context::new();

  let parent = Export.run(&context);

  assert_eq!(parent.status(), Status::Error);
  assert_eq!(parent.reason(), Some("[DiskFull] disk full"));
  let exception = parent.exception().expect("parent keeps the error");
  assert_eq!(exception.kind(), "DiskFull");
  assert!(exception.error().downcast_ref::<DiskFull>().is_some());

  let child = context.results().get(2).cloned().expect("child recorded");
  assert_eq!(child.exception.as_deref(), Some("[DiskFull] disk full."));

  let fault = Export.run_strict(Context::new()).expect_err("export errors");
  assert_eq!(fault.caused_by().command(), "WriteFile");
  let source = fault.source().expect("error fault has a source");
  assert!(source.downcast_ref::<DiskFull>().is_some());
}

#[test]
fn test_strict_parent_fault_matches_result() {
  let fault = Parent.run_strict(Context::new()).expect_err("parent fails");

  assert!(fault.is_failure());
  assert_eq!(fault.reason(), "bad state");
  assert_eq!(fault.caused_by().index(), 2);
  assert_eq!(fault.thrown_by().index(), 2);
  assert_eq!(fault.metadata(), Some(&json!({ "code": 409 })));
}
