//! Debug info resolver
//!
//! Builds a [`DebugRecord`] describing either an active frame or a bare function value. The
//! caller selects fields with an option string; fields that were not requested, or that are
//! unavailable for the target, stay `None`.

use super::funcname::{NameWhat, function_name};
use super::stack::{Frame, FrameSlot};
use crate::value::{FunctionRef, Value};
use crate::vm::{ExecutionContext, VmError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::trace;

/// Maximum length of a rendered chunk identifier
const ID_SIZE: usize = 60;

/// What kind of code a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum What {
    #[serde(rename = "Lua")]
    Lua,
    #[serde(rename = "C")]
    Native,
    #[serde(rename = "main")]
    Main,
    #[serde(rename = "tail")]
    Tail,
}

impl What {
    pub fn as_str(self) -> &'static str {
        match self {
            What::Lua => "Lua",
            What::Native => "C",
            What::Main => "main",
            What::Tail => "tail",
        }
    }
}

/// Field selection for [`resolve`], parsed from an option string such as `"Slunf"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoMask {
    /// `S`: source, short_src, what, line range
    pub source: bool,
    /// `l`: current line
    pub current_line: bool,
    /// `u`: upvalue count
    pub upvalues: bool,
    /// `n`: name and namewhat
    pub name: bool,
    /// `f`: the function itself
    pub function: bool,
    /// `L`: lines holding code
    pub active_lines: bool,
    /// Leading `>`: the target is a function value rather than a level
    pub from_function: bool,
}

impl InfoMask {
    pub const DEFAULT_OPTIONS: &'static str = "Slunf";

    pub fn parse(options: &str) -> Result<Self, VmError> {
        let mut mask = InfoMask::default();
        let flags = match options.strip_prefix('>') {
            Some(rest) => {
                mask.from_function = true;
                rest
            }
            None => options,
        };
        for flag in flags.chars() {
            match flag {
                'S' => mask.source = true,
                'l' => mask.current_line = true,
                'u' => mask.upvalues = true,
                'n' => mask.name = true,
                'f' => mask.function = true,
                'L' => mask.active_lines = true,
                other => return Err(VmError::InvalidOption(other)),
            }
        }
        Ok(mask)
    }

    pub fn all() -> Self {
        InfoMask {
            source: true,
            current_line: true,
            upvalues: true,
            name: true,
            function: true,
            active_lines: true,
            from_function: false,
        }
    }
}

impl FromStr for InfoMask {
    type Err = VmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InfoMask::parse(s)
    }
}

/// What to describe: a live frame, or a value expected to be a function
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Frame(Frame),
    Value(&'a Value),
}

/// Description of a callable at one instant. Built fresh per query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugRecord {
    pub name: Option<String>,
    pub namewhat: Option<NameWhat>,
    pub what: Option<What>,
    pub source: Option<String>,
    pub short_src: Option<String>,
    pub current_line: Option<u32>,
    pub line_defined: Option<u32>,
    pub last_line_defined: Option<u32>,
    pub nups: Option<usize>,
    #[serde(skip)]
    pub func: Option<Value>,
    pub active_lines: Option<BTreeSet<u32>>,
}

pub fn resolve(
    ctx: &ExecutionContext,
    mask: InfoMask,
    target: Target<'_>,
) -> Result<DebugRecord, VmError> {
    match target {
        Target::Value(Value::Function(function)) => {
            trace!("resolving debug info for function value");
            let mut record = DebugRecord::default();
            describe_function(&mut record, mask, function);
            Ok(record)
        }
        Target::Value(other) => Err(VmError::InvalidTarget(format!(
            "function expected, got {}",
            other.type_name()
        ))),
        Target::Frame(_) if mask.from_function => Err(VmError::InvalidOption('>')),
        Target::Frame(frame) => resolve_frame(ctx, mask, frame),
    }
}

fn resolve_frame(
    ctx: &ExecutionContext,
    mask: InfoMask,
    frame: Frame,
) -> Result<DebugRecord, VmError> {
    trace!(level = frame.level, "resolving debug info for frame");
    let index = match frame.slot {
        FrameSlot::TailCall => return Ok(tail_call_record(mask)),
        FrameSlot::Active(index) => index,
    };
    let call_frame = ctx.frames().get(index).ok_or_else(|| {
        VmError::InvalidTarget(format!("stack level {} is no longer active", frame.level))
    })?;

    let mut record = DebugRecord::default();
    describe_function(&mut record, mask, &call_frame.function);
    if mask.current_line {
        record.current_line = call_frame.current_line();
    }
    if mask.name
        && let Some((namewhat, name)) = caller_name(ctx, index)
    {
        record.name = Some(name);
        record.namewhat = Some(namewhat);
    }
    Ok(record)
}

/// Fields that depend only on the function, shared by the live and static cases
fn describe_function(record: &mut DebugRecord, mask: InfoMask, function: &FunctionRef) {
    match function.proto() {
        Some(proto) => {
            if mask.source {
                record.what = Some(if proto.is_main() { What::Main } else { What::Lua });
                record.short_src = Some(chunk_id(&proto.source));
                record.source = Some(proto.source.clone());
                record.line_defined = Some(proto.line_defined);
                record.last_line_defined = Some(proto.last_line_defined);
            }
            if mask.active_lines {
                record.active_lines = Some(proto.line_info.iter().copied().collect());
            }
        }
        None => {
            if mask.source {
                record.what = Some(What::Native);
                record.source = Some("=[C]".to_string());
                record.short_src = Some("[C]".to_string());
            }
        }
    }
    if mask.upvalues {
        record.nups = Some(function.upvalues().len());
    }
    if mask.function {
        record.func = Some(Value::Function(function.clone()));
    }
}

fn tail_call_record(mask: InfoMask) -> DebugRecord {
    let mut record = DebugRecord::default();
    if mask.source {
        record.what = Some(What::Tail);
        record.source = Some("=(tail call)".to_string());
        record.short_src = Some("(tail call)".to_string());
    }
    if mask.upvalues {
        record.nups = Some(0);
    }
    if mask.function {
        record.func = Some(Value::Nil);
    }
    record
}

/// Name of the function running in frame `index`, read from its caller's call instruction
fn caller_name(ctx: &ExecutionContext, index: usize) -> Option<(NameWhat, String)> {
    let frames = ctx.frames();
    let frame = frames.get(index)?;
    // The real caller of a tail-called function is gone
    if frame.tail_calls > 0 {
        return None;
    }
    let caller = frames.get(index.checked_sub(1)?)?;
    let proto = caller.proto()?;
    function_name(proto, caller.pc)
}

/// Render a chunk's source identifier for messages.
///
/// `=name` is used verbatim, `@path` is a file name (elided from the left when long), and
/// anything else is literal source text shown as `[string "..."]`.
pub fn chunk_id(source: &str) -> String {
    if let Some(name) = source.strip_prefix('=') {
        name.chars().take(ID_SIZE - 1).collect()
    } else if let Some(path) = source.strip_prefix('@') {
        let len = path.chars().count();
        if len < ID_SIZE {
            path.to_string()
        } else {
            let keep = ID_SIZE - 4;
            let tail: String = path.chars().skip(len - keep).collect();
            format!("...{tail}")
        }
    } else {
        let max = ID_SIZE - 15;
        let first_line = source.lines().next().unwrap_or("");
        let truncated = source.contains('\n') || first_line.chars().count() > max;
        if truncated {
            let head: String = first_line.chars().take(max).collect();
            format!("[string \"{head}...\"]")
        } else {
            format!("[string \"{first_line}\"]")
        }
    }
}
