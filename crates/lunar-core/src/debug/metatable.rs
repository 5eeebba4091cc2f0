//! Metatable and environment store
//!
//! Where an association lives depends on the value's category: reference values own a
//! per-instance slot, strings share one slot held by the context, and the remaining primitives
//! cannot carry one at all. [`storage_for`] is the single place that policy is decided.

use crate::value::{Category, FunctionRef, TableRef, Value};
use crate::vm::{ExecutionContext, VmError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    Metatable,
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// The category cannot carry this association
    Unsupported,
    /// One slot shared by every value of the category
    PerCategory,
    /// Each value owns its slot
    PerInstance,
}

pub fn storage_for(category: Category, association: Association) -> Storage {
    match (association, category) {
        (
            Association::Metatable,
            Category::Table | Category::Userdata | Category::Function | Category::Thread,
        ) => Storage::PerInstance,
        (Association::Metatable, Category::String) => Storage::PerCategory,
        (Association::Environment, Category::Function | Category::Userdata | Category::Thread) => {
            Storage::PerInstance
        }
        _ => Storage::Unsupported,
    }
}

fn table_or_nil(table: Option<TableRef>) -> Value {
    table.map(Value::Table).unwrap_or(Value::Nil)
}

/// The metatable associated with `value`, or nil
pub fn get_metatable(ctx: &ExecutionContext, value: &Value) -> Value {
    let metatable = match value {
        Value::Table(t) => t.borrow().metatable.clone(),
        Value::Userdata(u) => u.borrow().metatable.clone(),
        Value::Function(f) => f.metatable(),
        Value::Thread(t) => t.borrow().metatable.clone(),
        Value::String(_) => ctx.string_metatable(),
        Value::Nil | Value::Boolean(_) | Value::Number(_) => None,
    };
    table_or_nil(metatable)
}

/// Replace the metatable of `value` with `metatable` (a table or nil) and return `value`.
///
/// Nothing is modified when either argument is rejected.
pub fn set_metatable(
    ctx: &mut ExecutionContext,
    value: &Value,
    metatable: &Value,
) -> Result<Value, VmError> {
    let metatable = match metatable {
        Value::Nil => None,
        Value::Table(t) => Some(t.clone()),
        other => {
            return Err(VmError::argument(
                2,
                format!("nil or table expected, got {}", other.type_name()),
            ));
        }
    };

    let category = value.category();
    if storage_for(category, Association::Metatable) == Storage::Unsupported {
        return Err(VmError::argument(
            1,
            format!("cannot set a metatable on a {} value", category.name()),
        ));
    }

    debug!(category = category.name(), clear = metatable.is_none(), "setting metatable");
    match value {
        Value::Table(t) => t.borrow_mut().metatable = metatable,
        Value::Userdata(u) => u.borrow_mut().metatable = metatable,
        Value::Function(f) => f.set_metatable(metatable),
        Value::Thread(t) => t.borrow_mut().metatable = metatable,
        Value::String(_) => ctx.set_string_metatable(metatable),
        Value::Nil | Value::Boolean(_) | Value::Number(_) => {}
    }
    Ok(value.clone())
}

/// The environment of `value`; nil for categories that carry none.
///
/// Functions and userdata without an explicit environment resolve to the context globals.
pub fn get_environment(ctx: &ExecutionContext, value: &Value) -> Value {
    match value {
        Value::Function(f) => Value::Table(f.environment().unwrap_or_else(|| ctx.globals())),
        Value::Userdata(u) => Value::Table(u.borrow().env.clone().unwrap_or_else(|| ctx.globals())),
        Value::Thread(t) => Value::Table(t.borrow().env.clone()),
        _ => Value::Nil,
    }
}

/// Replace the environment of `value` with the table `env`.
pub fn set_environment(
    _ctx: &mut ExecutionContext,
    value: &Value,
    env: &Value,
) -> Result<(), VmError> {
    let env = match env {
        Value::Table(t) => t.clone(),
        other => {
            return Err(VmError::argument(
                2,
                format!("table expected, got {}", other.type_name()),
            ));
        }
    };

    let category = value.category();
    if storage_for(category, Association::Environment) == Storage::Unsupported {
        return Err(VmError::argument(
            1,
            format!("cannot set an environment on a {} value", category.name()),
        ));
    }

    debug!(category = category.name(), "setting environment");
    match value {
        Value::Function(f) => f.set_environment(env),
        Value::Userdata(u) => u.borrow_mut().env = Some(env),
        Value::Thread(t) => t.borrow_mut().env = env,
        _ => {}
    }
    Ok(())
}

/// Look up an unqualified global the way code running in `function` would see it.
pub fn resolve_global(ctx: &ExecutionContext, function: &FunctionRef, name: &str) -> Value {
    let env = function.environment().unwrap_or_else(|| ctx.globals());
    let value = env.borrow().get(name);
    value
}
