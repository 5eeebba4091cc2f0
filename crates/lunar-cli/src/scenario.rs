//! Call-stack snapshots loaded from RON
//!
//! A scenario names a set of function prototypes and the chain of calls that is active at
//! the moment of inspection, outermost first. Building it drives an `ExecutionContext` through
//! the same lifecycle a running interpreter would.

use lunar_core::value::{Function, FunctionRef, Upvalue};
use lunar_core::{Constant, DebugConfig, ExecutionContext, Proto, Value, VmError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid scenario: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("call to undefined function '{0}'")]
    UnknownFunction(String),

    #[error("register {register} of '{function}': {source}")]
    Register {
        function: String,
        register: usize,
        source: VmError,
    },

    #[error(transparent)]
    Vm(#[from] VmError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub proto: Proto,
    /// Initial values of the closure's upvalue cells
    #[serde(default)]
    pub upvalues: Vec<Constant>,
    /// Closures that share upvalue cells with this one, by name
    #[serde(default)]
    pub shares_upvalues_with: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallStep {
    /// A Lua function suspended at `pc` with the given register contents
    Lua {
        function: String,
        pc: usize,
        #[serde(default)]
        registers: Vec<Constant>,
        /// Replace the current frame instead of pushing a new one
        #[serde(default)]
        tail: bool,
    },
    /// A host function currently running
    Native { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub functions: Vec<FunctionDef>,
    pub calls: Vec<CallStep>,
}

fn host_stub(_ctx: &mut ExecutionContext, _args: &[Value]) -> Result<Vec<Value>, VmError> {
    Ok(Vec::new())
}

impl Scenario {
    pub fn from_ron(source: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(source)?)
    }

    /// Instantiate every function as a global, then replay the call chain.
    pub fn build(&self, config: DebugConfig) -> Result<ExecutionContext, ScenarioError> {
        let mut ctx = ExecutionContext::with_config(config);
        lunar_stdlib::open_libs(&mut ctx);

        let mut functions: HashMap<&str, FunctionRef> = HashMap::new();
        for def in &self.functions {
            let upvalues = match &def.shares_upvalues_with {
                Some(other) => functions
                    .get(other.as_str())
                    .ok_or_else(|| ScenarioError::UnknownFunction(other.clone()))?
                    .upvalues()
                    .to_vec(),
                None => def
                    .upvalues
                    .iter()
                    .map(|constant| Upvalue::new(constant.to_value()))
                    .collect(),
            };
            let mut proto = def.proto.clone();
            proto.normalize();
            let function = Function::lua(Rc::new(proto), upvalues);
            ctx.set_global(&def.name, Value::Function(function.clone()));
            functions.insert(def.name.as_str(), function);
        }

        for step in &self.calls {
            match step {
                CallStep::Lua {
                    function,
                    pc,
                    registers,
                    tail,
                } => {
                    let callee = functions
                        .get(function.as_str())
                        .ok_or_else(|| ScenarioError::UnknownFunction(function.clone()))?;
                    if *tail {
                        ctx.tail_call(callee, &[])?;
                    } else {
                        ctx.call(callee, &[])?;
                    }
                    for (register, constant) in registers.iter().enumerate() {
                        ctx.set_register(register, constant.to_value())
                            .map_err(|source| ScenarioError::Register {
                                function: function.clone(),
                                register,
                                source,
                            })?;
                    }
                    ctx.set_pc(*pc)?;
                }
                CallStep::Native { name } => {
                    ctx.call(&Function::native(name.as_str(), host_stub), &[])?;
                }
            }
        }

        debug!(
            functions = functions.len(),
            depth = ctx.depth(),
            "scenario loaded"
        );
        Ok(ctx)
    }
}
