//! Plan error types.

/// Errors that can occur while loading or running a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
  /// The plan file could not be read.
  #[error("failed to read plan '{path}': {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// The plan is not valid JSON or does not match the plan schema.
  #[error("failed to parse plan: {source}")]
  Parse {
    #[source]
    source: serde_json::Error,
  },

  /// A plan outcome of kind `raise`, standing in for an unexpected error.
  #[error("{message}")]
  Raised { message: String },
}
