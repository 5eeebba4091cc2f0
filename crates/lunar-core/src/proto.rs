//! Function prototypes and the instruction subset the introspection layer reads
//!
//! A `Proto` is the compiled, immutable part of a Lua function: its code, constants and the
//! debug metadata (line info, local variable scopes, upvalue names) retained at compile time.

use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Constant {
    pub fn to_value(&self) -> Value {
        match self {
            Constant::Nil => Value::Nil,
            Constant::Boolean(b) => Value::Boolean(*b),
            Constant::Number(n) => Value::Number(*n),
            Constant::String(s) => Value::string(s),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Register-machine instructions. Registers are relative to the frame base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Move { dst: u16, src: u16 },
    LoadK { dst: u16, constant: u32 },
    LoadNil { dst: u16, count: u16 },
    GetGlobal { dst: u16, name: u32 },
    SetGlobal { src: u16, name: u32 },
    GetUpval { dst: u16, upvalue: u16 },
    SetUpval { src: u16, upvalue: u16 },
    /// R(dst) = R(table)[K(key)]
    GetField { dst: u16, table: u16, key: u32 },
    /// R(dst) = R(table)[R(key)]
    GetTable { dst: u16, table: u16, key: u16 },
    SetField { table: u16, key: u32, src: u16 },
    /// R(dst + 1) = R(object); R(dst) = R(object)[K(method)]
    SelfCall { dst: u16, object: u16, method: u32 },
    Closure { dst: u16, proto: u32 },
    /// Calls R(func) with `args` arguments; results land in R(func)..
    Call { func: u16, args: u16, results: u16 },
    TailCall { func: u16, args: u16 },
    Return { first: u16, count: u16 },
    Jump { offset: i32 },
}

impl Instruction {
    /// Whether executing this instruction may overwrite `reg`
    pub fn writes_register(&self, reg: u16) -> bool {
        match *self {
            Instruction::Move { dst, .. }
            | Instruction::LoadK { dst, .. }
            | Instruction::GetGlobal { dst, .. }
            | Instruction::GetUpval { dst, .. }
            | Instruction::GetField { dst, .. }
            | Instruction::GetTable { dst, .. }
            | Instruction::Closure { dst, .. } => dst == reg,
            Instruction::LoadNil { dst, count } => {
                let (reg, dst) = (u32::from(reg), u32::from(dst));
                reg >= dst && reg < dst + u32::from(count)
            }
            Instruction::SelfCall { dst, .. } => {
                let (reg, dst) = (u32::from(reg), u32::from(dst));
                reg == dst || reg == dst + 1
            }
            // A call clobbers everything from the function slot upward
            Instruction::Call { func, .. } | Instruction::TailCall { func, .. } => reg >= func,
            Instruction::SetGlobal { .. }
            | Instruction::SetUpval { .. }
            | Instruction::SetField { .. }
            | Instruction::Return { .. }
            | Instruction::Jump { .. } => false,
        }
    }
}

/// Scope record for one named local. The local is live for `start_pc <= pc < end_pc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalVar {
    /// `None` when symbols were stripped
    #[serde(default)]
    pub name: Option<String>,
    pub start_pc: usize,
    pub end_pc: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proto {
    /// Chunk identifier: `@file`, `=label`, or the literal source text
    pub source: String,
    /// Zero for a main chunk
    #[serde(default)]
    pub line_defined: u32,
    #[serde(default)]
    pub last_line_defined: u32,
    #[serde(default)]
    pub num_params: u8,
    #[serde(default)]
    pub is_vararg: bool,
    #[serde(default)]
    pub max_stack_size: u16,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    /// Source line of each instruction
    #[serde(default)]
    pub line_info: Vec<u32>,
    #[serde(default)]
    pub local_vars: Vec<LocalVar>,
    #[serde(default)]
    pub upvalue_names: Vec<Option<String>>,
    #[serde(default)]
    pub protos: Vec<Proto>,
}

impl Proto {
    pub fn is_main(&self) -> bool {
        self.line_defined == 0
    }

    pub fn line_at(&self, pc: usize) -> Option<u32> {
        self.line_info.get(pc).copied()
    }

    pub fn constant_str(&self, index: u32) -> Option<&str> {
        self.constants.get(index as usize).and_then(Constant::as_str)
    }

    /// Find the `n`-th (1-based) local live at `pc`.
    ///
    /// Returns `Some(None)` when the slot is live but its name was not retained.
    pub fn local_name(&self, n: usize, pc: usize) -> Option<Option<&str>> {
        if n == 0 {
            return None;
        }
        self.local_vars
            .iter()
            .take_while(|var| var.start_pc <= pc)
            .filter(|var| pc < var.end_pc)
            .nth(n - 1)
            .map(|var| var.name.as_deref())
    }

    /// Number of locals live at `pc`
    pub fn active_locals(&self, pc: usize) -> usize {
        self.local_vars
            .iter()
            .take_while(|var| var.start_pc <= pc)
            .filter(|var| pc < var.end_pc)
            .count()
    }

    /// Order local scopes by start pc, recursively. Prototypes that were not built by
    /// `ProtoBuilder` (deserialized ones) need this before locals are looked up.
    pub fn normalize(&mut self) {
        self.local_vars.sort_by_key(|var| var.start_pc);
        for child in &mut self.protos {
            child.normalize();
        }
    }

    /// Drop every debug name, keeping scopes and line info
    pub fn strip(&mut self) {
        for var in &mut self.local_vars {
            var.name = None;
        }
        for name in &mut self.upvalue_names {
            *name = None;
        }
        for child in &mut self.protos {
            child.strip();
        }
    }
}

/// Incremental builder used by hosts and tests to assemble prototypes.
#[derive(Debug, Clone)]
pub struct ProtoBuilder {
    proto: Proto,
}

impl ProtoBuilder {
    pub fn new(source: impl Into<String>, line_defined: u32, last_line_defined: u32) -> Self {
        Self {
            proto: Proto {
                source: source.into(),
                line_defined,
                last_line_defined,
                num_params: 0,
                is_vararg: false,
                max_stack_size: 0,
                instructions: Vec::new(),
                constants: Vec::new(),
                line_info: Vec::new(),
                local_vars: Vec::new(),
                upvalue_names: Vec::new(),
                protos: Vec::new(),
            },
        }
    }

    /// A top-level chunk spanning no declared lines
    pub fn main(source: impl Into<String>) -> Self {
        Self::new(source, 0, 0)
    }

    pub fn params(mut self, count: u8) -> Self {
        self.proto.num_params = count;
        self
    }

    pub fn vararg(mut self) -> Self {
        self.proto.is_vararg = true;
        self
    }

    pub fn stack_size(mut self, size: u16) -> Self {
        self.proto.max_stack_size = size;
        self
    }

    /// Append an instruction, returning its pc
    pub fn emit(&mut self, instruction: Instruction, line: u32) -> usize {
        self.proto.instructions.push(instruction);
        self.proto.line_info.push(line);
        self.proto.instructions.len() - 1
    }

    /// Intern a constant, returning its index
    pub fn constant(&mut self, constant: Constant) -> u32 {
        if let Some(idx) = self.proto.constants.iter().position(|c| *c == constant) {
            return idx as u32;
        }
        self.proto.constants.push(constant);
        (self.proto.constants.len() - 1) as u32
    }

    pub fn string(&mut self, s: &str) -> u32 {
        self.constant(Constant::String(s.to_string()))
    }

    /// Declare a local live over `[start_pc, end_pc)`. Locals must be declared in register order.
    pub fn local(&mut self, name: &str, start_pc: usize, end_pc: usize) -> &mut Self {
        self.proto.local_vars.push(LocalVar {
            name: Some(name.to_string()),
            start_pc,
            end_pc,
        });
        self
    }

    pub fn upvalue(&mut self, name: &str) -> u16 {
        self.proto.upvalue_names.push(Some(name.to_string()));
        (self.proto.upvalue_names.len() - 1) as u16
    }

    pub fn child(&mut self, proto: Proto) -> u32 {
        self.proto.protos.push(proto);
        (self.proto.protos.len() - 1) as u32
    }

    pub fn build(mut self) -> Proto {
        let live = self.proto.local_vars.len() as u16;
        self.proto.max_stack_size = self.proto.max_stack_size.max(live).max(2);
        self.proto.normalize();
        self.proto
    }
}
