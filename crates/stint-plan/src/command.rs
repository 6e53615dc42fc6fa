use std::borrow::Cow;

use serde_json::Value;
use stint_engine::{CallResult, Command, Context, Frame, ValidationErrors};
use tracing::debug;

use crate::def::{OutcomeDef, PlanDef, StepDef};
use crate::error::PlanError;

/// A [`Command`] whose behavior is read from a [`PlanDef`].
#[derive(Debug, Clone)]
pub struct ScriptedCommand {
  def: PlanDef,
}

impl ScriptedCommand {
  pub fn new(def: PlanDef) -> Self {
    Self { def }
  }

  pub fn def(&self) -> &PlanDef {
    &self.def
  }

  fn run_step(&self, step: &StepDef, frame: &mut Frame) -> CallResult {
    let child = ScriptedCommand::new(step.plan.clone());
    if step.strict {
      frame.invoke_strict(child)?;
    } else {
      let child = frame.invoke(child);
      if child.is_bad() {
        frame.throw(&child)?;
      }
    }
    Ok(())
  }

  fn apply_outcome(&self, outcome: &OutcomeDef, frame: &mut Frame) -> CallResult {
    match outcome.kind.fault_kind() {
      Some(kind) => Err(frame.fault(kind, outcome.reason.clone(), outcome.metadata.clone()).into()),
      None => Err(
        PlanError::Raised {
          message: outcome.reason.clone(),
        }
        .into(),
      ),
    }
  }
}

impl StepDef {
  /// Evaluate the `if` / `unless` guards against the context.
  pub fn should_run(&self, context: &Context) -> bool {
    let included = self.if_key.as_deref().is_none_or(|key| is_truthy(context, key));
    let excluded = self.unless_key.as_deref().is_some_and(|key| is_truthy(context, key));
    included && !excluded
  }
}

/// Present and neither `null` nor `false`.
fn is_truthy(context: &Context, key: &str) -> bool {
  !matches!(context.get(key), None | Some(Value::Null) | Some(Value::Bool(false)))
}

impl Command for ScriptedCommand {
  fn name(&self) -> Cow<'static, str> {
    Cow::Owned(self.def.name.clone())
  }

  fn trace_key(&self) -> Option<&str> {
    self.def.trace_key.as_deref()
  }

  fn validate(&self, frame: &Frame) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for key in &self.def.requires {
      if !frame.context().contains(key) {
        errors.add("context", format!("{} is required", key));
      }
    }
    errors
  }

  fn call(&mut self, frame: &mut Frame) -> CallResult {
    if !self.def.set.is_empty() {
      frame.context().merge(self.def.set.clone())?;
    }

    for step in &self.def.steps {
      if !step.should_run(frame.context()) {
        debug!(plan = %self.def.name, step = %step.plan.name, "plan_step_skipped");
        continue;
      }
      self.run_step(step, frame)?;
    }

    match &self.def.outcome {
      Some(outcome) => self.apply_outcome(outcome, frame),
      None => Ok(()),
    }
  }
}
