//! Traceback builder

use super::info::{DebugRecord, InfoMask, Target, What, resolve};
use super::stack::{Frame, StackWalker};
use crate::vm::ExecutionContext;

/// Render the call chain from `start_level` outward, one line per frame.
///
/// A non-empty `message` becomes the first line, unmodified. Never fails: frames that
/// cannot be described render as `?`.
pub fn build_traceback(ctx: &ExecutionContext, start_level: usize, message: &str) -> String {
    let mut lines = Vec::new();
    if !message.is_empty() {
        lines.push(message.to_string());
    }

    let frames: Vec<Frame> = StackWalker::new(ctx).skip(start_level).collect();
    let limit = ctx.config().traceback_limit.unwrap_or(usize::MAX);
    let mask = InfoMask {
        source: true,
        current_line: true,
        name: true,
        ..InfoMask::default()
    };

    for frame in frames.iter().take(limit) {
        let line = match resolve(ctx, mask, Target::Frame(*frame)) {
            Ok(record) => describe(ctx, *frame, &record),
            Err(_) => "?".to_string(),
        };
        lines.push(line);
    }
    if frames.len() > limit {
        lines.push(format!("... ({} more frames)", frames.len() - limit));
    }

    lines.join("\n")
}

/// Format one traceback line: `<where>: in <what>`
fn describe(ctx: &ExecutionContext, frame: Frame, record: &DebugRecord) -> String {
    let short_src = record.short_src.as_deref().unwrap_or("?");
    let location = match (record.what, record.current_line) {
        (Some(What::Native), _) => ctx.config().native_placeholder.clone(),
        (_, Some(line)) => format!("{short_src}:{line}"),
        _ => short_src.to_string(),
    };

    let description = if let Some(name) = &record.name {
        format!("function '{name}'")
    } else {
        match record.what {
            Some(What::Main) => "main chunk".to_string(),
            Some(What::Native) => frame
                .function(ctx)
                .and_then(|function| function.native_name().map(|name| format!("function '{name}'")))
                .unwrap_or_else(|| "?".to_string()),
            Some(What::Lua) => format!(
                "function <{short_src}:{}>",
                record.line_defined.unwrap_or_default()
            ),
            Some(What::Tail) | None => "?".to_string(),
        }
    };

    format!("{location}: in {description}")
}
