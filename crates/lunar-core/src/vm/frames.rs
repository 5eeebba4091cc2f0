//! Call frame management for function calls in the VM

use crate::proto::Proto;
use crate::value::{FunctionRef, Upvalue};
use std::collections::HashMap;
use std::rc::Rc;

/// Represents a call frame in the call stack
#[derive(Debug)]
pub struct CallFrame {
    pub function: FunctionRef,
    /// Index of the instruction currently executing
    pub pc: usize,
    /// First stack slot of this frame's register window
    pub base: usize,
    /// One past the last stack slot of the register window
    pub top: usize,
    /// Number of frames collapsed into this one by tail calls
    pub tail_calls: u32,
    /// Captured locals for this frame: absolute stack index -> shared cell
    pub captured_locals: HashMap<usize, Upvalue>,
}

impl CallFrame {
    pub fn new(function: FunctionRef, base: usize, top: usize) -> Self {
        Self {
            function,
            pc: 0,
            base,
            top,
            tail_calls: 0,
            captured_locals: HashMap::new(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.function.is_native()
    }

    pub fn proto(&self) -> Option<&Rc<Proto>> {
        self.function.proto()
    }

    pub fn is_main_chunk(&self) -> bool {
        self.proto().is_some_and(|proto| proto.is_main())
    }

    /// Source line for the current pc; host frames have none
    pub fn current_line(&self) -> Option<u32> {
        self.proto().and_then(|proto| proto.line_at(self.pc))
    }
}
