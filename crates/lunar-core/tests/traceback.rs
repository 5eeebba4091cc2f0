//! Traceback rendering tests

mod common;

use common::{noop, three_levels};
use lunar_core::debug::build_traceback;
use lunar_core::value::Function;
use lunar_core::{DebugConfig, ExecutionContext, MainChunkPolicy, ProtoBuilder, Instruction};
use std::rc::Rc;

#[test]
fn test_traceback_with_message() {
    let fx = three_levels(DebugConfig::default());
    let trace = build_traceback(&fx.ctx, 0, "boom");
    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(
        lines,
        vec![
            "boom",
            "app.lua:3: in function 'g'",
            "app.lua:8: in function 'f'",
            "app.lua:11: in main chunk",
        ]
    );
}

#[test]
fn test_traceback_hidden_main_chunk() {
    let fx = three_levels(DebugConfig {
        main_chunk: MainChunkPolicy::Hide,
        ..DebugConfig::default()
    });
    let trace = build_traceback(&fx.ctx, 0, "boom");
    assert_eq!(trace.lines().count(), 3);
    assert!(!trace.contains("main chunk"));
}

#[test]
fn test_traceback_without_message_starts_with_frames() {
    let fx = three_levels(DebugConfig::default());
    let trace = build_traceback(&fx.ctx, 0, "");
    assert!(trace.starts_with("app.lua:3: in function 'g'"));
    assert_eq!(trace.lines().count(), 3);
}

#[test]
fn test_traceback_of_empty_stack() {
    let ctx = ExecutionContext::new();
    assert_eq!(build_traceback(&ctx, 0, "only this"), "only this");
    assert_eq!(build_traceback(&ctx, 0, ""), "");
}

#[test]
fn test_traceback_from_outer_level() {
    let fx = three_levels(DebugConfig::default());
    let trace = build_traceback(&fx.ctx, 1, "");
    assert_eq!(trace, "app.lua:8: in function 'f'\napp.lua:11: in main chunk");
    assert_eq!(build_traceback(&fx.ctx, 10, "msg"), "msg");
}

#[test]
fn test_native_frame_uses_placeholder() {
    let mut fx = three_levels(DebugConfig {
        native_placeholder: "[host]".to_string(),
        ..DebugConfig::default()
    });
    let print = Function::native("print", noop);
    fx.ctx.call(&print, &[]).unwrap();
    let trace = build_traceback(&fx.ctx, 0, "");
    // g's current instruction is not a call, so the name comes from the host function itself
    assert_eq!(trace.lines().next(), Some("[host]: in function 'print'"));
}

#[test]
fn test_traceback_limit_reports_elided_frames() {
    let fx = three_levels(DebugConfig {
        traceback_limit: Some(1),
        ..DebugConfig::default()
    });
    let trace = build_traceback(&fx.ctx, 0, "boom");
    assert_eq!(
        trace,
        "boom\napp.lua:3: in function 'g'\n... (2 more frames)"
    );
}

#[test]
fn test_tail_call_and_anonymous_function_lines() {
    let mut b = ProtoBuilder::new("@lib/worker.lua", 20, 24);
    b.emit(Instruction::Return { first: 0, count: 0 }, 22);
    let worker = Function::lua(Rc::new(b.build()), Vec::new());

    let mut fx = three_levels(DebugConfig::default());
    fx.ctx.tail_call(&worker, &[]).unwrap();
    let trace = build_traceback(&fx.ctx, 0, "");
    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(lines[0], "lib/worker.lua:22: in function <lib/worker.lua:20>");
    assert_eq!(lines[1], "(tail call): in ?");
    assert_eq!(lines[2], "app.lua:8: in function 'f'");
}
