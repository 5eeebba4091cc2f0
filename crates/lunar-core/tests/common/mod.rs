// Common test utilities: a small program suspended mid-execution
#![allow(dead_code)]

use lunar_core::vm::VmError;
use lunar_core::{
    Constant, DebugConfig, ExecutionContext, Function, FunctionRef, Instruction, ProtoBuilder,
    Upvalue, Value,
};
use std::rc::Rc;

pub const SOURCE: &str = "@app.lua";

/// `main -> f -> g`, suspended while `g` executes line 3.
///
/// ```text
///  1  local function g()          -- upvalue: counter
///  2    local a = 1
///  3    local b = 2; use(counter)
///  4  end
///  5
///  6  function f(x)
///  7    local y = 10
///  8    g()
///  9  end
/// 10
/// 11  f(1)
/// 12
/// ```
pub struct Fixture {
    pub ctx: ExecutionContext,
    pub main: FunctionRef,
    pub f: FunctionRef,
    pub g: FunctionRef,
    /// A sibling closure sharing `counter` with `g`
    pub h: FunctionRef,
    pub counter: Upvalue,
}

pub fn g_proto() -> lunar_core::Proto {
    let mut b = ProtoBuilder::new(SOURCE, 1, 4);
    let one = b.constant(Constant::Number(1.0));
    let two = b.constant(Constant::Number(2.0));
    let counter = b.upvalue("counter");
    b.emit(Instruction::LoadK { dst: 0, constant: one }, 2);
    b.emit(Instruction::LoadK { dst: 1, constant: two }, 3);
    b.emit(Instruction::GetUpval { dst: 2, upvalue: counter }, 3);
    b.emit(Instruction::Return { first: 0, count: 0 }, 4);
    b.local("a", 1, 4);
    b.local("b", 2, 4);
    b.stack_size(4).build()
}

pub fn f_proto() -> lunar_core::Proto {
    let mut b = ProtoBuilder::new(SOURCE, 6, 9).params(1);
    let ten = b.constant(Constant::Number(10.0));
    let g = b.string("g");
    b.emit(Instruction::LoadK { dst: 1, constant: ten }, 7);
    b.emit(Instruction::GetGlobal { dst: 2, name: g }, 8);
    b.emit(
        Instruction::Call {
            func: 2,
            args: 0,
            results: 1,
        },
        8,
    );
    b.emit(Instruction::Return { first: 0, count: 0 }, 9);
    b.local("x", 0, 4);
    b.local("y", 1, 4);
    b.stack_size(4).build()
}

pub fn main_proto() -> lunar_core::Proto {
    let mut b = ProtoBuilder::main(SOURCE);
    let f = b.string("f");
    let one = b.constant(Constant::Number(1.0));
    b.emit(Instruction::GetGlobal { dst: 0, name: f }, 11);
    b.emit(Instruction::LoadK { dst: 1, constant: one }, 11);
    b.emit(
        Instruction::Call {
            func: 0,
            args: 1,
            results: 1,
        },
        11,
    );
    b.emit(Instruction::Return { first: 0, count: 0 }, 12);
    b.stack_size(2).build()
}

pub fn three_levels(config: DebugConfig) -> Fixture {
    let counter = Upvalue::new(Value::Number(0.0));
    let main = Function::lua(Rc::new(main_proto()), Vec::new());
    let f = Function::lua(Rc::new(f_proto()), Vec::new());
    let g_shared = Rc::new(g_proto());
    let g = Function::lua(g_shared.clone(), vec![counter.clone()]);
    let h = Function::lua(g_shared, vec![counter.clone()]);

    let mut ctx = ExecutionContext::with_config(config);
    ctx.set_global("f", Value::Function(f.clone()));
    ctx.set_global("g", Value::Function(g.clone()));

    ctx.call(&main, &[]).unwrap();
    ctx.set_pc(2).unwrap();

    ctx.call(&f, &[Value::Number(1.0)]).unwrap();
    ctx.set_register(1, Value::Number(10.0)).unwrap();
    ctx.set_pc(2).unwrap();

    ctx.call(&g, &[]).unwrap();
    ctx.set_register(0, Value::Number(1.0)).unwrap();
    ctx.set_register(1, Value::Number(2.0)).unwrap();
    ctx.set_pc(2).unwrap();

    Fixture {
        ctx,
        main,
        f,
        g,
        h,
        counter,
    }
}

pub fn noop(_ctx: &mut ExecutionContext, _args: &[Value]) -> Result<Vec<Value>, VmError> {
    Ok(Vec::new())
}
