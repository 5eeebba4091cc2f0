//! Variable accessor: locals by frame and ordinal, upvalues by function and ordinal
//!
//! Indices are 1-based. An index with no live slot is an expected absence and yields `None`.

use super::stack::Frame;
use crate::value::{FunctionRef, Value};
use crate::vm::ExecutionContext;
use tracing::debug;

/// One local or upvalue. `name` is absent when debug names were not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlot {
    pub name: Option<String>,
    pub value: Value,
}

/// Resolve the `index`-th live local of `frame` to (frame index, stack slot, name)
fn locate_local(
    ctx: &ExecutionContext,
    frame: Frame,
    index: usize,
) -> Option<(usize, usize, Option<String>)> {
    let frame_index = frame.index()?;
    let call_frame = ctx.frames().get(frame_index)?;
    let proto = call_frame.proto()?;
    let name = proto.local_name(index, call_frame.pc)?;
    let slot = call_frame.base + index - 1;
    if slot >= call_frame.top {
        return None;
    }
    Some((frame_index, slot, name.map(str::to_string)))
}

pub fn get_local(ctx: &ExecutionContext, frame: Frame, index: usize) -> Option<LocalSlot> {
    let (frame_index, slot, name) = locate_local(ctx, frame, index)?;
    Some(LocalSlot {
        name,
        value: ctx.read_slot(frame_index, slot),
    })
}

/// Write the `index`-th live local of `frame`, returning the slot's name.
///
/// The write lands in the real stack slot (or its captured cell), never a copy.
pub fn set_local(
    ctx: &mut ExecutionContext,
    frame: Frame,
    index: usize,
    value: Value,
) -> Option<Option<String>> {
    let (frame_index, slot, name) = locate_local(ctx, frame, index)?;
    debug!(level = frame.level, index, local = ?name, "setting local");
    ctx.write_slot(frame_index, slot, value);
    Some(name)
}

pub fn get_upvalue(function: &FunctionRef, index: usize) -> Option<LocalSlot> {
    let position = index.checked_sub(1)?;
    let cell = function.upvalues().get(position)?;
    Some(LocalSlot {
        name: function.upvalue_name(position).map(str::to_string),
        value: cell.get(),
    })
}

/// Write through the shared cell, so every closure holding it observes the value.
pub fn set_upvalue(function: &FunctionRef, index: usize, value: Value) -> Option<Option<String>> {
    let position = index.checked_sub(1)?;
    let cell = function.upvalues().get(position)?;
    let name = function.upvalue_name(position).map(str::to_string);
    debug!(index, upvalue = ?name, "setting upvalue");
    cell.set(value);
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Function, Upvalue};
    use crate::vm::VmError;

    fn noop(_ctx: &mut ExecutionContext, _args: &[Value]) -> Result<Vec<Value>, VmError> {
        Ok(Vec::new())
    }

    #[test]
    fn test_native_upvalue_has_value_but_no_name() {
        let f = Function::native_with_upvalues("acc", noop, vec![Upvalue::new(Value::Number(3.0))]);
        let slot = get_upvalue(&f, 1).unwrap();
        assert_eq!(slot.name, None);
        assert_eq!(slot.value, Value::Number(3.0));
        assert_eq!(set_upvalue(&f, 1, Value::Number(4.0)), Some(None));
        assert_eq!(get_upvalue(&f, 1).unwrap().value, Value::Number(4.0));
    }

    #[test]
    fn test_upvalue_index_out_of_range() {
        let f = Function::native("print", noop);
        assert_eq!(get_upvalue(&f, 0), None);
        assert_eq!(get_upvalue(&f, 1), None);
        assert_eq!(set_upvalue(&f, 1, Value::Nil), None);
    }
}
