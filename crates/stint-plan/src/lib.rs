//! Stint Plan
//!
//! Declarative plans for the stint engine. A [`PlanDef`] describes a command
//! as data: the context keys it requires, the values it sets, the child plans
//! it runs and how it ends. [`ScriptedCommand`] executes a plan through the
//! regular engine lifecycle, so every step shows up in the result log with
//! full causality.
//!
//! Plans can be loaded from:
//! - JSON files (via CLI with `stint run plan.json`)
//! - any JSON string
//!
//! ```json
//! {
//!   "name": "Signup",
//!   "requires": ["email"],
//!   "steps": [
//!     { "plan": { "name": "CreateUser", "set": { "user_id": 1 } } },
//!     { "plan": { "name": "SendWelcome" }, "unless": "quiet" }
//!   ]
//! }
//! ```

mod command;
mod def;
mod error;
mod run;

pub use command::ScriptedCommand;
pub use def::{OutcomeDef, OutcomeKind, PlanDef, StepDef};
pub use error::PlanError;
pub use run::{PlanRun, run_plan};
