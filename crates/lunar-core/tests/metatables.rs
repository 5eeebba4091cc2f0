//! Metatable and environment store tests

mod common;

use common::{noop, three_levels};
use lunar_core::debug::{
    get_environment, get_metatable, get_upvalue, resolve_global, set_environment, set_metatable,
};
use lunar_core::value::{Function, ThreadHandle, Userdata};
use lunar_core::{DebugConfig, ExecutionContext, Value, VmError};
use std::rc::Rc;

fn carriers(fx: &common::Fixture) -> Vec<Value> {
    vec![
        Value::new_table(),
        Value::Userdata(Userdata::new_ref("file")),
        Value::Function(fx.g.clone()),
        Value::Function(Function::native("print", noop)),
        Value::Thread(ThreadHandle::new_ref("co", lunar_core::value::Table::new_ref())),
        Value::from("text"),
    ]
}

#[test]
fn test_set_then_get_metatable() {
    let mut fx = three_levels(DebugConfig::default());
    for value in carriers(&fx) {
        let mt = Value::new_table();
        let returned = set_metatable(&mut fx.ctx, &value, &mt).unwrap();
        assert_eq!(returned, value);
        assert_eq!(get_metatable(&fx.ctx, &value), mt, "{} value", value.type_name());

        set_metatable(&mut fx.ctx, &value, &Value::Nil).unwrap();
        assert_eq!(get_metatable(&fx.ctx, &value), Value::Nil);
    }
}

#[test]
fn test_metatable_is_shared_not_copied() {
    let mut ctx = ExecutionContext::new();
    let object = Value::new_table();
    let mt = Value::new_table();
    set_metatable(&mut ctx, &object, &mt).unwrap();

    mt.as_table().unwrap().borrow_mut().set("__index", Value::from("later"));
    let seen = get_metatable(&ctx, &object);
    assert_eq!(seen.as_table().unwrap().borrow().get("__index"), Value::from("later"));
}

#[test]
fn test_primitives_cannot_carry_metatables() {
    let mut ctx = ExecutionContext::new();
    let mt = Value::new_table();
    for value in [Value::Nil, Value::Boolean(true), Value::Number(3.0)] {
        let err = set_metatable(&mut ctx, &value, &mt).unwrap_err();
        assert!(
            matches!(err, VmError::Argument { position: 1, .. }),
            "unexpected {err:?}"
        );
        assert_eq!(get_metatable(&ctx, &value), Value::Nil);
    }
    // A rejected primitive does not leak into the string slot
    assert_eq!(get_metatable(&ctx, &Value::from("s")), Value::Nil);
}

#[test]
fn test_rejected_metatable_leaves_previous_one() {
    let mut ctx = ExecutionContext::new();
    let object = Value::new_table();
    let mt = Value::new_table();
    set_metatable(&mut ctx, &object, &mt).unwrap();

    let err = set_metatable(&mut ctx, &object, &Value::from("nope")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad argument #2 (nil or table expected, got string)"
    );
    assert_eq!(get_metatable(&ctx, &object), mt);
}

#[test]
fn test_function_environment_defaults_to_globals() {
    let fx = three_levels(DebugConfig::default());
    let g = Value::Function(fx.g.clone());
    assert_eq!(get_environment(&fx.ctx, &g), Value::Table(fx.ctx.globals()));
    assert_eq!(resolve_global(&fx.ctx, &fx.g, "f"), Value::Function(fx.f.clone()));
}

#[test]
fn test_environment_swap_changes_global_resolution() {
    let mut fx = three_levels(DebugConfig::default());
    let g = Value::Function(fx.g.clone());
    let sandbox = Value::new_table();
    sandbox.as_table().unwrap().borrow_mut().set("f", Value::from("sandboxed"));

    set_environment(&mut fx.ctx, &g, &sandbox).unwrap();
    assert_eq!(get_environment(&fx.ctx, &g), sandbox);
    assert_eq!(resolve_global(&fx.ctx, &fx.g, "f"), Value::from("sandboxed"));
    assert_eq!(resolve_global(&fx.ctx, &fx.g, "g"), Value::Nil);

    // Other functions and the upvalues of g are unaffected
    assert_eq!(resolve_global(&fx.ctx, &fx.f, "f"), Value::Function(fx.f.clone()));
    assert_eq!(get_upvalue(&fx.g, 1).unwrap().value, Value::Number(0.0));
    assert!(get_upvalue(&fx.h, 1).unwrap().value == fx.counter.get());
}

#[test]
fn test_userdata_and_thread_environments() {
    let mut ctx = ExecutionContext::new();
    let handle = Value::Userdata(Userdata::new_ref("socket"));
    assert_eq!(get_environment(&ctx, &handle), Value::Table(ctx.globals()));

    let env = Value::new_table();
    set_environment(&mut ctx, &handle, &env).unwrap();
    assert_eq!(get_environment(&ctx, &handle), env);

    let thread = Value::Thread(ctx.thread().clone());
    set_environment(&mut ctx, &thread, &env).unwrap();
    assert_eq!(Value::Table(ctx.globals()), env);
}

#[test]
fn test_environment_rejections() {
    let mut fx = three_levels(DebugConfig::default());
    let g = Value::Function(fx.g.clone());
    let before = get_environment(&fx.ctx, &g);

    let err = set_environment(&mut fx.ctx, &g, &Value::Nil).unwrap_err();
    assert!(matches!(err, VmError::Argument { position: 2, .. }));

    let err = set_environment(&mut fx.ctx, &Value::new_table(), &Value::new_table()).unwrap_err();
    assert!(matches!(err, VmError::Argument { position: 1, .. }));
    assert_eq!(get_environment(&fx.ctx, &Value::from("s")), Value::Nil);
    assert_eq!(get_environment(&fx.ctx, &g), before);
}

#[test]
fn test_closures_sharing_a_proto_keep_separate_environments() {
    let mut fx = three_levels(DebugConfig::default());
    let other = Function::lua(Rc::clone(fx.g.proto().unwrap()), Vec::new());
    set_environment(&mut fx.ctx, &Value::Function(other.clone()), &Value::new_table()).unwrap();
    assert_eq!(
        get_environment(&fx.ctx, &Value::Function(fx.g.clone())),
        Value::Table(fx.ctx.globals())
    );
    assert_ne!(
        get_environment(&fx.ctx, &Value::Function(other)),
        Value::Table(fx.ctx.globals())
    );
}

#[test]
fn test_self_metatable_formats_without_recursing() {
    let mut ctx = ExecutionContext::new();
    let mt = Value::new_table();
    set_metatable(&mut ctx, &mt, &mt).unwrap();

    let rendered = format!("{:?}", mt.as_table().unwrap());
    assert!(rendered.contains("metatable: Some("));
    assert!(!format!("{ctx:?}").is_empty());
}
