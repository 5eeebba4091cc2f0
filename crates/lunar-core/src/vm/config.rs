//! Introspection settings carried by each execution context

use super::errors::VmError;
use serde::{Deserialize, Serialize};

/// Whether the top-level chunk frame is addressable by level and shown in tracebacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MainChunkPolicy {
    /// The main chunk is an ordinary outermost level with `what = "main"`
    #[default]
    Expose,
    /// The stack ends at the outermost function called by the main chunk
    Hide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub main_chunk: MainChunkPolicy,
    /// Rendered in place of `source:line` for host frames
    pub native_placeholder: String,
    /// Maximum frames rendered by a traceback before eliding the rest
    pub traceback_limit: Option<usize>,
    pub max_call_depth: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            main_chunk: MainChunkPolicy::Expose,
            native_placeholder: "[native code]".to_string(),
            traceback_limit: None,
            max_call_depth: 200,
        }
    }
}

impl DebugConfig {
    /// Parse a configuration written in RON. Missing fields take their defaults.
    pub fn from_ron(source: &str) -> Result<Self, VmError> {
        let config: DebugConfig =
            ron::from_str(source).map_err(|e| VmError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String, VmError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| VmError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), VmError> {
        if self.max_call_depth == 0 {
            return Err(VmError::Config("max_call_depth must be positive".into()));
        }
        if self.traceback_limit == Some(0) {
            return Err(VmError::Config("traceback_limit must be positive".into()));
        }
        Ok(())
    }
}
