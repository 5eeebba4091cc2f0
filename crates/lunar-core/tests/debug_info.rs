//! Debug info resolver tests

mod common;

use common::{SOURCE, noop, three_levels};
use lunar_core::debug::{InfoMask, NameWhat, Target, What, lookup_frame, resolve};
use lunar_core::value::{Function, Upvalue};
use lunar_core::{DebugConfig, Value, VmError};
use std::rc::Rc;

fn mask(options: &str) -> InfoMask {
    InfoMask::parse(options).unwrap()
}

#[test]
fn test_live_frame_record() {
    let fx = three_levels(DebugConfig::default());
    let frame = lookup_frame(&fx.ctx, 0).unwrap();
    let record = resolve(&fx.ctx, mask("Slunf"), Target::Frame(frame)).unwrap();

    assert_eq!(record.name.as_deref(), Some("g"));
    assert_eq!(record.namewhat, Some(NameWhat::Global));
    assert_eq!(record.what, Some(What::Lua));
    assert_eq!(record.source.as_deref(), Some(SOURCE));
    assert_eq!(record.short_src.as_deref(), Some("app.lua"));
    assert_eq!(record.current_line, Some(3));
    assert_eq!(record.line_defined, Some(1));
    assert_eq!(record.last_line_defined, Some(4));
    assert_eq!(record.nups, Some(1));
    assert_eq!(record.func, Some(Value::Function(fx.g.clone())));
}

#[test]
fn test_caller_frames_are_named_from_their_call_sites() {
    let fx = three_levels(DebugConfig::default());
    let f = resolve(&fx.ctx, mask("nl"), Target::Frame(lookup_frame(&fx.ctx, 1).unwrap())).unwrap();
    assert_eq!(f.name.as_deref(), Some("f"));
    assert_eq!(f.current_line, Some(8));

    let main = resolve(&fx.ctx, mask("Sn"), Target::Frame(lookup_frame(&fx.ctx, 2).unwrap())).unwrap();
    assert_eq!(main.what, Some(What::Main));
    assert_eq!(main.name, None);
    assert_eq!(main.namewhat, None);
}

#[test]
fn test_unrequested_fields_stay_unset() {
    let fx = three_levels(DebugConfig::default());
    let frame = lookup_frame(&fx.ctx, 0).unwrap();
    let record = resolve(&fx.ctx, mask("l"), Target::Frame(frame)).unwrap();
    assert_eq!(record.current_line, Some(3));
    assert_eq!(record.source, None);
    assert_eq!(record.line_defined, None);
    assert_eq!(record.name, None);
    assert_eq!(record.nups, None);
    assert_eq!(record.func, None);
}

#[test]
fn test_static_function_record() {
    let fx = three_levels(DebugConfig::default());
    let value = Value::Function(fx.f.clone());
    let record = resolve(&fx.ctx, mask(">SlunfL"), Target::Value(&value)).unwrap();
    assert_eq!(record.what, Some(What::Lua));
    assert_eq!(record.line_defined, Some(6));
    assert_eq!(record.last_line_defined, Some(9));
    assert_eq!(record.nups, Some(0));
    assert_eq!(record.current_line, None);
    assert_eq!(record.name, None);
    let lines: Vec<u32> = record.active_lines.unwrap().into_iter().collect();
    assert_eq!(lines, vec![7, 8, 9]);
}

#[test]
fn test_native_function_never_has_lines() {
    let mut fx = three_levels(DebugConfig::default());
    let native = Function::native_with_upvalues("tick", noop, vec![Upvalue::new(Value::Nil)]);

    let value = Value::Function(native.clone());
    let record = resolve(&fx.ctx, InfoMask::all(), Target::Value(&value)).unwrap();
    assert_eq!(record.what, Some(What::Native));
    assert_eq!(record.short_src.as_deref(), Some("[C]"));
    assert_eq!(record.current_line, None);
    assert_eq!(record.line_defined, None);
    assert_eq!(record.last_line_defined, None);
    assert_eq!(record.active_lines, None);
    assert_eq!(record.nups, Some(1));

    fx.ctx.call(&native, &[]).unwrap();
    let frame = lookup_frame(&fx.ctx, 0).unwrap();
    let live = resolve(&fx.ctx, InfoMask::all(), Target::Frame(frame)).unwrap();
    assert_eq!(live.current_line, None);
    assert_eq!(live.line_defined, None);
    assert_eq!(live.last_line_defined, None);
}

#[test]
fn test_native_called_from_lua_is_named() {
    let mut fx = three_levels(DebugConfig::default());
    // Run `print` from f instead of g
    fx.ctx.return_from_call().unwrap();
    let print = Function::native("print", noop);
    fx.ctx.call(&print, &[]).unwrap();
    let record = resolve(
        &fx.ctx,
        mask("Sn"),
        Target::Frame(lookup_frame(&fx.ctx, 0).unwrap()),
    )
    .unwrap();
    // f's pc points at `g()`, so the call site names the callee `g`
    assert_eq!(record.name.as_deref(), Some("g"));
    assert_eq!(record.what, Some(What::Native));
}

#[test]
fn test_invalid_targets() {
    let mut fx = three_levels(DebugConfig::default());
    let err = resolve(&fx.ctx, InfoMask::all(), Target::Value(&Value::Number(1.0))).unwrap_err();
    assert!(matches!(err, VmError::InvalidTarget(_)));

    let frame = lookup_frame(&fx.ctx, 1).unwrap();
    let err = resolve(&fx.ctx, mask(">S"), Target::Frame(frame)).unwrap_err();
    assert_eq!(err, VmError::InvalidOption('>'));

    let stale = lookup_frame(&fx.ctx, 0).unwrap();
    fx.ctx.return_from_call().unwrap();
    let err = resolve(&fx.ctx, InfoMask::all(), Target::Frame(stale)).unwrap_err();
    assert!(matches!(err, VmError::InvalidTarget(_)));
}

#[test]
fn test_tail_called_frame_loses_its_name() {
    let mut fx = three_levels(DebugConfig::default());
    let g_again = Function::lua(Rc::new(common::g_proto()), Vec::new());
    fx.ctx.tail_call(&g_again, &[]).unwrap();

    let top = resolve(&fx.ctx, mask("Sn"), Target::Frame(lookup_frame(&fx.ctx, 0).unwrap())).unwrap();
    assert_eq!(top.name, None);
    let tail = resolve(&fx.ctx, mask("Slu"), Target::Frame(lookup_frame(&fx.ctx, 1).unwrap())).unwrap();
    assert_eq!(tail.what, Some(What::Tail));
    assert_eq!(tail.current_line, None);
}

#[test]
fn test_record_serializes_to_json() {
    let fx = three_levels(DebugConfig::default());
    let frame = lookup_frame(&fx.ctx, 0).unwrap();
    let record = resolve(&fx.ctx, mask("Sln"), Target::Frame(frame)).unwrap();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["what"], "Lua");
    assert_eq!(json["namewhat"], "global");
    assert_eq!(json["current_line"], 3);
    assert!(json.get("func").is_none());
}
