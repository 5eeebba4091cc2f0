//! Error types for VM runtime errors

use thiserror::Error;

/// Errors raised by the VM state model and the introspection layer.
///
/// Expected absence (a missing level, an out-of-range slot) is never an error; these
/// variants are contract violations that the host escalates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error("runtime error: {0}")]
    Runtime(String),

    /// A host-facing argument failed validation
    #[error("{}", format_argument_error(.position, .function, .reason))]
    Argument {
        position: usize,
        function: Option<String>,
        reason: String,
    },

    #[error("invalid introspection target: {0}")]
    InvalidTarget(String),

    #[error("invalid option '{0}'")]
    InvalidOption(char),

    #[error("stack overflow (call depth exceeded {0})")]
    StackOverflow(usize),

    #[error("invalid configuration: {0}")]
    Config(String),
}

fn format_argument_error(position: &usize, function: &Option<String>, reason: &str) -> String {
    match function {
        Some(name) => format!("bad argument #{position} to '{name}' ({reason})"),
        None => format!("bad argument #{position} ({reason})"),
    }
}

impl VmError {
    /// Create a simple runtime error
    pub fn runtime(message: impl Into<String>) -> Self {
        VmError::Runtime(message.into())
    }

    /// Create an argument error for the 1-based argument `position`
    pub fn argument(position: usize, reason: impl Into<String>) -> Self {
        VmError::Argument {
            position,
            function: None,
            reason: reason.into(),
        }
    }

    /// Attach the name of the host function that rejected the argument, unless one is
    /// already recorded
    pub fn in_function(self, name: &str) -> Self {
        match self {
            VmError::Argument {
                position,
                function: None,
                reason,
            } => VmError::Argument {
                position,
                function: Some(name.to_string()),
                reason,
            },
            other => other,
        }
    }

    pub fn is_argument_error(&self) -> bool {
        matches!(self, VmError::Argument { .. })
    }
}
