//! Stack levels: mapping a level number onto the live call chain

use crate::value::FunctionRef;
use crate::vm::{CallFrame, ExecutionContext, MainChunkPolicy};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSlot {
    /// Index into the context's frames, outermost first
    Active(usize),
    /// A frame that was replaced by a tail call and no longer exists
    TailCall,
}

/// A reference into live VM state at a given level.
///
/// Valid only until the context next pushes or pops a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub level: usize,
    pub slot: FrameSlot,
}

impl Frame {
    pub fn index(&self) -> Option<usize> {
        match self.slot {
            FrameSlot::Active(index) => Some(index),
            FrameSlot::TailCall => None,
        }
    }

    pub fn is_tail_call(&self) -> bool {
        self.slot == FrameSlot::TailCall
    }

    pub fn call_frame<'a>(&self, ctx: &'a ExecutionContext) -> Option<&'a CallFrame> {
        self.index().and_then(|index| ctx.frames().get(index))
    }

    /// The function executing in this frame
    pub fn function(&self, ctx: &ExecutionContext) -> Option<FunctionRef> {
        self.call_frame(ctx).map(|frame| frame.function.clone())
    }
}

/// Walks the call chain from the innermost visible frame outward.
///
/// Introspection natives are skipped. Each Lua frame is followed by one synthetic level per
/// tail call collapsed into it.
pub struct StackWalker<'a> {
    ctx: &'a ExecutionContext,
    remaining: usize,
    floor: usize,
    pending_tail_calls: u32,
    level: usize,
}

impl<'a> StackWalker<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        let frames = ctx.frames();
        let hide_main = ctx.config().main_chunk == MainChunkPolicy::Hide
            && frames.first().is_some_and(CallFrame::is_main_chunk);
        StackWalker {
            ctx,
            remaining: frames.len(),
            floor: usize::from(hide_main),
            pending_tail_calls: 0,
            level: 0,
        }
    }

    fn emit(&mut self, slot: FrameSlot) -> Frame {
        let frame = Frame {
            level: self.level,
            slot,
        };
        self.level += 1;
        frame
    }
}

impl Iterator for StackWalker<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.pending_tail_calls > 0 {
            self.pending_tail_calls -= 1;
            return Some(self.emit(FrameSlot::TailCall));
        }

        let ctx = self.ctx;
        while self.remaining > self.floor {
            self.remaining -= 1;
            let index = self.remaining;
            let frame = &ctx.frames()[index];
            if frame.function.is_introspective() {
                continue;
            }
            self.pending_tail_calls = if frame.is_native() { 0 } else { frame.tail_calls };
            return Some(self.emit(FrameSlot::Active(index)));
        }
        None
    }
}

/// Locate the frame at `level`; 0 is the innermost frame that issued the query.
pub fn lookup_frame(ctx: &ExecutionContext, level: usize) -> Option<Frame> {
    let frame = StackWalker::new(ctx).nth(level);
    trace!(level, found = frame.is_some(), "looked up stack level");
    frame
}

/// Number of addressable levels
pub fn stack_depth(ctx: &ExecutionContext) -> usize {
    StackWalker::new(ctx).count()
}
