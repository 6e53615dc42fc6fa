//! Stint Config
//!
//! Serializable execution policy for the stint engine. A [`Configuration`]
//! travels with the context of a call tree, so two trees in the same process
//! can run under different policies.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=engine.json`)
//! - any JSON string (e.g. stored alongside a plan)
//!
//! Every field is optional in JSON; missing fields take their defaults.

mod error;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

/// Execution policy for one call tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
  /// Deepest allowed nesting of invocations. `None` means unlimited.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_call_depth: Option<usize>,
  /// Scope faults to the family of the invocation that raised them instead
  /// of the generic fault kinds.
  pub raise_dynamic_faults: bool,
  /// Freeze the context once the root invocation finishes.
  pub freeze_context: bool,
}

impl Default for Configuration {
  fn default() -> Self {
    Self {
      max_call_depth: None,
      raise_dynamic_faults: false,
      freeze_context: true,
    }
  }
}

impl Configuration {
  /// Parse and validate a configuration from JSON.
  pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
    let config: Configuration =
      serde_json::from_str(input).map_err(|source| ConfigError::Parse { source })?;
    config.validate()?;
    Ok(config)
  }

  /// Read, parse and validate a configuration file.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.display().to_string(),
      source,
    })?;
    Self::from_json_str(&content)
  }

  /// Reject settings the engine cannot honour.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.max_call_depth == Some(0) {
      return Err(ConfigError::InvalidMaxCallDepth);
    }
    Ok(())
  }
}
