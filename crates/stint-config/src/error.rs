//! Configuration error types.

/// Errors that can occur while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The configuration file could not be read.
  #[error("failed to read configuration '{path}': {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// The configuration is not valid JSON or has unknown fields.
  #[error("failed to parse configuration: {source}")]
  Parse {
    #[source]
    source: serde_json::Error,
  },

  /// A maximum call depth of zero would reject the root invocation.
  #[error("max_call_depth must be at least 1")]
  InvalidMaxCallDepth,
}
