//! Execution engine for stint.
//!
//! This crate runs units of work ("commands") through a fixed lifecycle and
//! records how they ended, who caused a fault and who propagated it.
//!
//! # Architecture
//!
//! ```text
//! Command
//! ├── call(frame) - business logic
//! ├── validate(frame) - input checks run before call
//! └── run(context) / run_strict(context)
//!
//! Invocation
//! ├── new(command, context) - pending, fires after_initialize / on_pending
//! └── execute() -> Executed, execute_strict() -> Result<Executed, Fault>
//!
//! Context
//! └── shared data + execution id, trace, depth and the ordered result log
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use stint_engine::{CallResult, Command, Context, Frame};
//!
//! struct ValidateEmail;
//!
//! impl Command for ValidateEmail {
//!   fn call(&mut self, frame: &mut Frame) -> CallResult {
//!     match frame.context().get("email") {
//!       Some(_) => Ok(()),
//!       None => Err(frame.invalid("email is required").into()),
//!     }
//!   }
//! }
//!
//! let executed = ValidateEmail.run(Context::new());
//! assert!(executed.is_bad());
//! for snapshot in executed.context().results() {
//!   println!("{} {}", snapshot.index, snapshot.outcome);
//! }
//! ```

mod causality;
mod context;
mod error;
mod fault;
mod hooks;
mod invocation;
mod results;
mod sequence;
mod status;
mod validation;

pub use causality::{Resolution, Signal, resolve};
pub use context::Context;
pub use error::{ContextError, EngineError};
pub use fault::{Exception, Fault, FaultScope, Halt, InvocationRef};
pub use hooks::{Hook, Hooks};
pub use invocation::{CallResult, Command, Executed, Frame, Invocation};
pub use results::{ResultLog, Snapshot};
pub use sequence::{Sequence, Step};
pub use status::{FaultKind, Outcome, State, Status};
pub use validation::{INVALID_INPUT_REASON, ValidationErrors};

pub use stint_config::Configuration;
pub use stint_trace::Trace;
