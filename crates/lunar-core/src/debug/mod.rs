//! Runtime introspection: frames, debug records, variables, metatables and tracebacks
//!
//! Every operation reads or writes live VM state through an [`ExecutionContext`]; nothing here
//! caches, because frames come and go with ordinary calls and returns.
//!
//! [`ExecutionContext`]: crate::vm::ExecutionContext

mod funcname;
mod info;
mod metatable;
mod stack;
mod traceback;
mod variables;

pub use funcname::*;
pub use info::*;
pub use metatable::*;
pub use stack::*;
pub use traceback::*;
pub use variables::*;
