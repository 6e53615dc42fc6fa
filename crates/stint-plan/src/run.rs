use serde::Serialize;
use stint_engine::{Command, Context, Fault, ResultLog, State, Status};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::command::ScriptedCommand;
use crate::def::PlanDef;

/// Summary of one plan run and its full result log.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRun {
  pub execution_id: Uuid,
  pub status: Status,
  pub state: State,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
  pub results: ResultLog,
  /// The fault surfaced by a strict run.
  #[serde(skip)]
  pub fault: Option<Fault>,
}

impl PlanRun {
  pub fn is_success(&self) -> bool {
    self.status == Status::Success
  }
}

/// Run `def` as the root of a call tree on `context`.
///
/// In strict mode any non-success of the root is kept in
/// [`PlanRun::fault`]; the result log is complete either way.
#[instrument(name = "plan_run", skip(def, context), fields(plan = %def.name))]
pub fn run_plan(def: &PlanDef, context: impl Into<Context>, strict: bool) -> PlanRun {
  let context = Context::build(context.into());
  let command = ScriptedCommand::new(def.clone());

  let run = if strict {
    match command.run_strict(&context) {
      Ok(executed) => summarize(&context, executed.status(), executed.state(), executed.reason(), None),
      Err(fault) => summarize(
        &context,
        fault.status(),
        State::Interrupted,
        Some(fault.reason()),
        Some(fault.clone()),
      ),
    }
  } else {
    let executed = command.run(&context);
    summarize(&context, executed.status(), executed.state(), executed.reason(), None)
  };

  info!(
    execution_id = %run.execution_id,
    status = %run.status,
    invocations = run.results.len(),
    "plan_finished"
  );
  run
}

fn summarize(context: &Context, status: Status, state: State, reason: Option<&str>, fault: Option<Fault>) -> PlanRun {
  PlanRun {
    execution_id: context.execution_id(),
    status,
    state,
    reason: reason.map(str::to_string),
    results: context.results(),
    fault,
  }
}
