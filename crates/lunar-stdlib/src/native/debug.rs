//! The `debug` library: getinfo, getlocal, setlocal, getupvalue, setupvalue, getmetatable,
//! setmetatable, getfenv, setfenv, traceback
//!
//! Every function is registered as an introspection native, so stack levels passed from script
//! code count from the script function that made the call.

use super::helpers::*;
use lunar_core::debug::{
    DebugRecord, InfoMask, Target, build_traceback, get_environment, get_local, get_metatable,
    get_upvalue, lookup_frame, resolve, set_environment, set_local, set_metatable, set_upvalue,
};
use lunar_core::value::{NativeFn, Table};
use lunar_core::{ExecutionContext, LocalSlot, Value, VmError};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

pub const DEBUG_FUNCTIONS: &[(&str, NativeFn)] = &[
    ("getfenv", native_getfenv),
    ("getinfo", native_getinfo),
    ("getlocal", native_getlocal),
    ("getmetatable", native_getmetatable),
    ("getupvalue", native_getupvalue),
    ("setfenv", native_setfenv),
    ("setlocal", native_setlocal),
    ("setmetatable", native_setmetatable),
    ("setupvalue", native_setupvalue),
    ("traceback", native_traceback),
];

/// Lines that do not exist for the described function
const NO_LINE: f64 = -1.0;

fn level_out_of_range() -> VmError {
    VmError::argument(1, "level out of range")
}

/// `name, value` for a named slot, `nil, value` for an unnamed one
fn slot_values(slot: Option<LocalSlot>) -> Vec<Value> {
    match slot {
        Some(slot) => vec![slot.name.map(Value::from).unwrap_or(Value::Nil), slot.value],
        None => vec![Value::Nil],
    }
}

fn name_value(name: Option<Option<String>>) -> Vec<Value> {
    vec![name.flatten().map(Value::from).unwrap_or(Value::Nil)]
}

fn line_value(line: Option<u32>) -> Value {
    line.map(|line| Value::Number(line as f64))
        .unwrap_or(Value::Number(NO_LINE))
}

/// Render a record as the table scripts see
fn record_table(mask: InfoMask, record: DebugRecord) -> Value {
    let mut table = Table::new();
    if mask.name {
        if let Some(name) = record.name {
            table.set("name", Value::from(name));
        }
        let namewhat = record.namewhat.map(|what| what.as_str()).unwrap_or("");
        table.set("namewhat", Value::from(namewhat));
    }
    if mask.source {
        if let Some(what) = record.what {
            table.set("what", Value::from(what.as_str()));
        }
        if let Some(source) = record.source {
            table.set("source", Value::from(source));
        }
        if let Some(short_src) = record.short_src {
            table.set("short_src", Value::from(short_src));
        }
        table.set("linedefined", line_value(record.line_defined));
        table.set("lastlinedefined", line_value(record.last_line_defined));
    }
    if mask.current_line {
        table.set("currentline", line_value(record.current_line));
    }
    if let Some(nups) = record.nups {
        table.set("nups", Value::Number(nups as f64));
    }
    if let Some(func) = record.func {
        table.set("func", func);
    }
    if let Some(lines) = record.active_lines {
        let mut active = Table::new();
        for line in lines {
            active.push(Value::Number(line as f64));
        }
        table.set("activelines", Value::Table(Rc::new(RefCell::new(active))));
    }
    Value::Table(Rc::new(RefCell::new(table)))
}

/// getinfo(f | level [, what]) -> table | nil
pub fn native_getinfo(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Vec<Value>, VmError> {
    let options = opt_string(args, 2, InfoMask::DEFAULT_OPTIONS)?;
    let subject = arg(args, 1);

    let resolved = match &subject {
        Value::Function(_) => {
            let options = if options.starts_with('>') {
                options
            } else {
                format!(">{options}")
            };
            InfoMask::parse(&options)
                .and_then(|mask| Ok((mask, resolve(ctx, mask, Target::Value(&subject))?)))
        }
        Value::Number(_) => {
            let level = check_int(args, 1)?;
            let Some(frame) = to_level(level).and_then(|level| lookup_frame(ctx, level)) else {
                trace!(level, "getinfo: no such level");
                return Ok(vec![Value::Nil]);
            };
            InfoMask::parse(&options)
                .and_then(|mask| Ok((mask, resolve(ctx, mask, Target::Frame(frame))?)))
        }
        other => {
            return Err(VmError::argument(
                1,
                format!("function or number expected, got {}", other.type_name()),
            ));
        }
    };

    match resolved {
        Ok((mask, record)) => Ok(vec![record_table(mask, record)]),
        Err(err) => {
            trace!(error = %err, "getinfo: resolver failed");
            Ok(vec![Value::Nil])
        }
    }
}

/// getlocal(level, n) -> name, value | nil
pub fn native_getlocal(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Vec<Value>, VmError> {
    let level = check_int(args, 1)?;
    let index = check_int(args, 2)?;
    let frame = to_level(level)
        .and_then(|level| lookup_frame(ctx, level))
        .ok_or_else(level_out_of_range)?;
    let slot = usize::try_from(index)
        .ok()
        .and_then(|index| get_local(ctx, frame, index));
    Ok(slot_values(slot))
}

/// setlocal(level, n, value) -> name | nil
pub fn native_setlocal(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Vec<Value>, VmError> {
    let level = check_int(args, 1)?;
    let index = check_int(args, 2)?;
    let value = check_any(args, 3)?;
    let frame = to_level(level)
        .and_then(|level| lookup_frame(ctx, level))
        .ok_or_else(level_out_of_range)?;
    let name = usize::try_from(index)
        .ok()
        .and_then(|index| set_local(ctx, frame, index, value));
    Ok(name_value(name))
}

/// getupvalue(f, n) -> name, value | nil
pub fn native_getupvalue(
    _ctx: &mut ExecutionContext,
    args: &[Value],
) -> Result<Vec<Value>, VmError> {
    let function = check_function(args, 1)?;
    let index = check_int(args, 2)?;
    let slot = usize::try_from(index)
        .ok()
        .and_then(|index| get_upvalue(&function, index));
    Ok(slot_values(slot))
}

/// setupvalue(f, n, value) -> name | nil
pub fn native_setupvalue(
    _ctx: &mut ExecutionContext,
    args: &[Value],
) -> Result<Vec<Value>, VmError> {
    let function = check_function(args, 1)?;
    let index = check_int(args, 2)?;
    let value = check_any(args, 3)?;
    let name = usize::try_from(index)
        .ok()
        .and_then(|index| set_upvalue(&function, index, value));
    Ok(name_value(name))
}

pub fn native_getmetatable(
    ctx: &mut ExecutionContext,
    args: &[Value],
) -> Result<Vec<Value>, VmError> {
    let value = check_any(args, 1)?;
    Ok(vec![get_metatable(ctx, &value)])
}

/// setmetatable(value, mt) -> value
pub fn native_setmetatable(
    ctx: &mut ExecutionContext,
    args: &[Value],
) -> Result<Vec<Value>, VmError> {
    let metatable = check_table_or_nil(args, 2)?;
    let value = arg(args, 1);
    let metatable = metatable.map(Value::Table).unwrap_or(Value::Nil);
    Ok(vec![set_metatable(ctx, &value, &metatable)?])
}

pub fn native_getfenv(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Vec<Value>, VmError> {
    let value = check_any(args, 1)?;
    Ok(vec![get_environment(ctx, &value)])
}

pub fn native_setfenv(ctx: &mut ExecutionContext, args: &[Value]) -> Result<Vec<Value>, VmError> {
    let value = check_any(args, 1)?;
    let env = check_any(args, 2)?;
    set_environment(ctx, &value, &env)?;
    Ok(Vec::new())
}

/// traceback([message [, level]]) -> string
///
/// A message that is neither a string nor a number is returned untouched.
pub fn native_traceback(
    ctx: &mut ExecutionContext,
    args: &[Value],
) -> Result<Vec<Value>, VmError> {
    let message = arg(args, 1);
    if !matches!(message, Value::Nil | Value::String(_) | Value::Number(_)) {
        return Ok(vec![message]);
    }
    let message = opt_string(args, 1, "")?;
    let level = opt_int(args, 2, 0)?;
    let level = to_level(level).unwrap_or(0);
    Ok(vec![Value::from(build_traceback(ctx, level, &message))])
}
