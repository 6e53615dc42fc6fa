//! Engine error types.

/// Errors raised by the engine's own bookkeeping.
///
/// These never escape as `Err` from an execution; they are classified into
/// an `Error` fault on the invocation that hit them.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// Nesting went deeper than `Configuration::max_call_depth`.
  #[error("maximum call depth of {limit} exceeded")]
  CallDepthExceeded { limit: usize },
}

/// Errors from reading or writing a [`Context`](crate::Context).
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
  /// The root invocation already finished; the context is read-only.
  #[error("context is frozen, cannot write '{key}'")]
  Frozen { key: String },

  /// A value could not be converted to JSON.
  #[error("failed to serialize context value '{key}': {source}")]
  Serialize {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  /// A stored value does not have the requested shape.
  #[error("failed to deserialize context value '{key}': {source}")]
  Deserialize {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  /// Contexts can only be seeded from JSON objects.
  #[error("context seed must be a JSON object")]
  NotAnObject,
}
