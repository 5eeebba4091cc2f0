//! The execution context: one thread of execution and the call stack it owns
//!
//! The dispatch loop is not part of this crate. Hosts drive the context through its lifecycle
//! operations (`call`, `set_pc`, `return_from_call`, `unwind`) and the introspection layer
//! reads the resulting state.

use super::config::DebugConfig;
use super::errors::VmError;
use super::frames::CallFrame;
use crate::value::{FunctionKind, FunctionRef, Table, TableRef, ThreadHandle, ThreadRef, Upvalue, Value};
use tracing::{debug, trace};

#[derive(Debug)]
pub struct ExecutionContext {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    thread: ThreadRef,
    string_metatable: Option<TableRef>,
    config: DebugConfig,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::with_config(DebugConfig::default())
    }

    pub fn with_config(config: DebugConfig) -> Self {
        ExecutionContext {
            stack: Vec::new(),
            frames: Vec::new(),
            thread: ThreadHandle::new_ref("main", Table::new_ref()),
            string_metatable: None,
            config,
        }
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DebugConfig) {
        self.config = config;
    }

    /// Handle for this context, as seen by scripts
    pub fn thread(&self) -> &ThreadRef {
        &self.thread
    }

    /// The globals table: the environment of this context's thread
    pub fn globals(&self) -> TableRef {
        self.thread.borrow().env.clone()
    }

    pub fn get_global(&self, name: &str) -> Value {
        self.globals().borrow().get(name)
    }

    pub fn set_global(&self, name: &str, value: Value) {
        self.globals().borrow_mut().set(name, value);
    }

    /// Metatable shared by every string value
    pub fn string_metatable(&self) -> Option<TableRef> {
        self.string_metatable.clone()
    }

    pub(crate) fn set_string_metatable(&mut self, metatable: Option<TableRef>) {
        self.string_metatable = metatable;
    }

    /// Active frames, outermost first
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Push a frame for `function`. Lua frames get a register window sized by the prototype
    /// with the fixed parameters filled from `args`; host frames hold `args` as their window.
    pub fn call(&mut self, function: &FunctionRef, args: &[Value]) -> Result<(), VmError> {
        if self.frames.len() >= self.config.max_call_depth {
            return Err(VmError::StackOverflow(self.config.max_call_depth));
        }

        let base = self.stack.len();
        match &function.kind {
            FunctionKind::Lua(closure) => {
                let proto = &closure.proto;
                let size = (proto.max_stack_size as usize).max(proto.num_params as usize);
                self.stack.resize(base + size, Value::Nil);
                for (slot, arg) in args.iter().take(proto.num_params as usize).enumerate() {
                    self.stack[base + slot] = arg.clone();
                }
            }
            FunctionKind::Native(_) => {
                self.stack.extend(args.iter().cloned());
            }
        }

        let top = self.stack.len();
        self.frames.push(CallFrame::new(function.clone(), base, top));
        debug!(depth = self.frames.len(), base, top, "pushed call frame");
        Ok(())
    }

    /// Replace the current Lua frame with a call to `function`, recording the collapsed frame.
    pub fn tail_call(&mut self, function: &FunctionRef, args: &[Value]) -> Result<(), VmError> {
        let collapsed = match self.frames.last() {
            Some(frame) if !frame.is_native() => frame.tail_calls + 1,
            Some(_) => return Err(VmError::runtime("tail call from a host frame")),
            None => return Err(VmError::runtime("tail call with no active frame")),
        };
        if function.is_native() {
            return Err(VmError::runtime("tail call target must be a Lua function"));
        }

        self.pop_frame();
        self.call(function, args)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.tail_calls = collapsed;
        }
        Ok(())
    }

    /// Run a host function in its own frame and return its results. Argument errors are
    /// tagged with the function's name.
    pub fn call_native(
        &mut self,
        function: &FunctionRef,
        args: &[Value],
    ) -> Result<Vec<Value>, VmError> {
        let native = match &function.kind {
            FunctionKind::Native(native) => native,
            FunctionKind::Lua(_) => {
                return Err(VmError::runtime("call_native expects a host function"));
            }
        };
        self.call(function, args)?;
        let result = (native.func)(self, args);
        self.pop_frame();
        result.map_err(|err| err.in_function(&native.name))
    }

    /// Move the current Lua frame to instruction `pc`
    pub fn set_pc(&mut self, pc: usize) -> Result<(), VmError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| VmError::runtime("set_pc with no active frame"))?;
        let len = match frame.proto() {
            Some(proto) => proto.instructions.len(),
            None => return Err(VmError::runtime("host frames have no program counter")),
        };
        if pc >= len {
            return Err(VmError::runtime(format!(
                "pc {pc} outside function of {len} instructions"
            )));
        }
        frame.pc = pc;
        trace!(pc, "advanced program counter");
        Ok(())
    }

    /// Read a register of the current frame
    pub fn register(&self, reg: usize) -> Option<Value> {
        let index = self.frames.len().checked_sub(1)?;
        let frame = &self.frames[index];
        let slot = frame.base + reg;
        (slot < frame.top).then(|| self.read_slot(index, slot))
    }

    /// Write a register of the current frame
    pub fn set_register(&mut self, reg: usize, value: Value) -> Result<(), VmError> {
        let index = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or_else(|| VmError::runtime("no active frame"))?;
        let slot = self.frames[index].base + reg;
        if slot >= self.frames[index].top {
            return Err(VmError::runtime(format!("register {reg} outside frame")));
        }
        self.write_slot(index, slot, value);
        Ok(())
    }

    /// Capture a register of the current frame into a shared cell. Capturing the same register
    /// twice yields the same cell.
    pub fn capture_local(&mut self, reg: usize) -> Result<Upvalue, VmError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| VmError::runtime("no active frame"))?;
        let slot = frame.base + reg;
        if slot >= frame.top {
            return Err(VmError::runtime(format!("register {reg} outside frame")));
        }
        let stack = &self.stack;
        let cell = frame
            .captured_locals
            .entry(slot)
            .or_insert_with(|| Upvalue::new(stack[slot].clone()))
            .clone();
        Ok(cell)
    }

    /// Pop the current frame
    pub fn return_from_call(&mut self) -> Result<(), VmError> {
        if self.frames.is_empty() {
            return Err(VmError::runtime("return with no active frame"));
        }
        self.pop_frame();
        Ok(())
    }

    /// Discard every frame, as when an error propagates to the top
    pub fn unwind(&mut self) {
        debug!(depth = self.frames.len(), "unwinding call stack");
        self.frames.clear();
        self.stack.clear();
    }

    fn pop_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            // Captured cells outlive the frame inside their closures
            self.stack.truncate(frame.base);
            debug!(depth = self.frames.len(), "popped call frame");
        }
    }

    pub(crate) fn read_slot(&self, frame_index: usize, slot: usize) -> Value {
        let frame = &self.frames[frame_index];
        match frame.captured_locals.get(&slot) {
            Some(cell) => cell.get(),
            None => self.stack.get(slot).cloned().unwrap_or(Value::Nil),
        }
    }

    pub(crate) fn write_slot(&mut self, frame_index: usize, slot: usize, value: Value) {
        match self.frames[frame_index].captured_locals.get(&slot) {
            Some(cell) => cell.set(value),
            None => {
                if let Some(target) = self.stack.get_mut(slot) {
                    *target = value;
                }
            }
        }
    }
}
