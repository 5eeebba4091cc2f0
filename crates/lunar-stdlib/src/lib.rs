pub mod native;

use lunar_core::value::{Function, Table};
use lunar_core::{ExecutionContext, FunctionRef, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

// Re-export native functions for convenience
pub use native::*;

/// Register every library in the context's globals.
pub fn open_libs(ctx: &mut ExecutionContext) {
    open_debug(ctx);
}

/// Register the `debug` table. Its functions are introspection natives and never occupy a
/// stack level of their own.
pub fn open_debug(ctx: &mut ExecutionContext) {
    let mut module = Table::new();
    for (name, func) in DEBUG_FUNCTIONS {
        module.set(*name, Value::Function(Function::introspection(*name, *func)));
    }
    debug!(functions = DEBUG_FUNCTIONS.len(), "registered debug library");
    ctx.set_global("debug", Value::Table(Rc::new(RefCell::new(module))));
}

/// Look up `debug.<name>` as registered by [`open_debug`]
pub fn debug_function(ctx: &ExecutionContext, name: &str) -> Option<FunctionRef> {
    let module = ctx.get_global("debug");
    let function = module.as_table()?.borrow().get(name);
    function.as_function().cloned()
}
