//! Call-site name heuristic
//!
//! A function value carries no name of its own. The name reported for an active call is
//! recovered from the caller's code: whatever instruction last loaded the called register
//! tells us whether the callee was reached through a global, a field, a method, a local or
//! an upvalue.

use crate::proto::{Instruction, Proto};
use serde::Serialize;

/// How the callee was reached from its call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameWhat {
    Global,
    Local,
    Method,
    Field,
    Upvalue,
}

impl NameWhat {
    pub fn as_str(self) -> &'static str {
        match self {
            NameWhat::Global => "global",
            NameWhat::Local => "local",
            NameWhat::Method => "method",
            NameWhat::Field => "field",
            NameWhat::Upvalue => "upvalue",
        }
    }
}

/// Name the function called by the instruction at `call_pc` in `caller`.
///
/// Returns `None` when the instruction is not a call or the callee's origin cannot be traced.
pub fn function_name(caller: &Proto, call_pc: usize) -> Option<(NameWhat, String)> {
    match caller.instructions.get(call_pc)? {
        Instruction::Call { func, .. } | Instruction::TailCall { func, .. } => {
            object_name(caller, call_pc, *func)
        }
        _ => None,
    }
}

/// Describe the value held by register `reg` just before `pc` executes.
pub fn object_name(proto: &Proto, pc: usize, reg: u16) -> Option<(NameWhat, String)> {
    if let Some(Some(name)) = proto.local_name(reg as usize + 1, pc) {
        return Some((NameWhat::Local, name.to_string()));
    }

    let setter = find_set_register(proto, pc, reg)?;
    match proto.instructions[setter] {
        Instruction::GetGlobal { name, .. } => {
            Some((NameWhat::Global, constant_name(proto, name)))
        }
        // Only a move from a lower register can name the value
        Instruction::Move { dst, src } if src < dst => object_name(proto, setter, src),
        Instruction::GetField { key, .. } => Some((NameWhat::Field, constant_name(proto, key))),
        Instruction::GetTable { key, .. } => {
            let key_setter = find_set_register(proto, setter, key)?;
            match proto.instructions[key_setter] {
                Instruction::LoadK { constant, .. } => proto
                    .constant_str(constant)
                    .map(|name| (NameWhat::Field, name.to_string())),
                _ => None,
            }
        }
        Instruction::GetUpval { upvalue, .. } => {
            let name = proto
                .upvalue_names
                .get(upvalue as usize)
                .and_then(|name| name.clone())
                .unwrap_or_else(|| "?".to_string());
            Some((NameWhat::Upvalue, name))
        }
        Instruction::SelfCall { method, .. } => {
            Some((NameWhat::Method, constant_name(proto, method)))
        }
        _ => None,
    }
}

/// Find the last instruction before `last_pc` that writes `reg`.
///
/// A write that sits inside a forward jump landing at or before `last_pc` is conditional, so
/// it does not count as a definite load.
pub fn find_set_register(proto: &Proto, last_pc: usize, reg: u16) -> Option<usize> {
    let mut setter = None;
    let mut jump_target = 0usize;
    for (pc, instruction) in proto.instructions.iter().enumerate().take(last_pc) {
        if let Instruction::Jump { offset } = *instruction {
            let dest = pc as i64 + 1 + offset as i64;
            if dest > pc as i64 && dest <= last_pc as i64 && dest as usize > jump_target {
                jump_target = dest as usize;
            }
            continue;
        }
        if instruction.writes_register(reg) {
            setter = if pc < jump_target { None } else { Some(pc) };
        }
    }
    setter
}

fn constant_name(proto: &Proto, index: u32) -> String {
    proto.constant_str(index).unwrap_or("?").to_string()
}
