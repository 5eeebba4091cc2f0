//! Argument checking helpers for native function implementations.
//!
//! Positions are 1-based. Errors carry no function name; `ExecutionContext::call_native`
//! attaches the name of the running native.

use lunar_core::value::{FunctionRef, TableRef};
use lunar_core::{Value, VmError};

/// The argument at `position`, or nil when it was not passed
pub fn arg(args: &[Value], position: usize) -> Value {
    args.get(position - 1).cloned().unwrap_or(Value::Nil)
}

fn type_error(args: &[Value], position: usize, expected: &str) -> VmError {
    let got = match args.get(position - 1) {
        Some(value) => value.type_name(),
        None => "no value",
    };
    VmError::argument(position, format!("{expected} expected, got {got}"))
}

/// Any value, including nil, as long as the argument was passed
pub fn check_any(args: &[Value], position: usize) -> Result<Value, VmError> {
    args.get(position - 1)
        .cloned()
        .ok_or_else(|| VmError::argument(position, "value expected"))
}

/// An integral number
pub fn check_int(args: &[Value], position: usize) -> Result<i64, VmError> {
    match args.get(position - 1) {
        Some(Value::Number(n)) if n.fract() == 0.0 && n.is_finite() => Ok(*n as i64),
        Some(Value::Number(_)) => Err(VmError::argument(
            position,
            "number has no integer representation",
        )),
        _ => Err(type_error(args, position, "number")),
    }
}

pub fn check_function(args: &[Value], position: usize) -> Result<FunctionRef, VmError> {
    match args.get(position - 1) {
        Some(Value::Function(f)) => Ok(f.clone()),
        _ => Err(type_error(args, position, "function")),
    }
}

/// A string, or `default` when the argument is nil or absent
pub fn opt_string(args: &[Value], position: usize, default: &str) -> Result<String, VmError> {
    match args.get(position - 1) {
        None | Some(Value::Nil) => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.to_string()),
        Some(Value::Number(n)) => Ok(Value::Number(*n).to_string()),
        Some(_) => Err(type_error(args, position, "string")),
    }
}

/// An integer, or `default` when the argument is nil or absent
pub fn opt_int(args: &[Value], position: usize, default: i64) -> Result<i64, VmError> {
    match args.get(position - 1) {
        None | Some(Value::Nil) => Ok(default),
        Some(_) => check_int(args, position),
    }
}

/// A table, or `None` when the argument is nil or absent
pub fn check_table_or_nil(args: &[Value], position: usize) -> Result<Option<TableRef>, VmError> {
    match args.get(position - 1) {
        None | Some(Value::Nil) => Ok(None),
        Some(Value::Table(t)) => Ok(Some(t.clone())),
        _ => Err(type_error(args, position, "nil or table")),
    }
}

/// Convert a script-supplied level into a stack level; negative levels never exist
pub fn to_level(level: i64) -> Option<usize> {
    usize::try_from(level).ok()
}
