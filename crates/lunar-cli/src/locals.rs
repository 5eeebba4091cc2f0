//! `locals` subcommand handler

use crate::utils::load_or_exit;
use lunar_core::ExecutionContext;
use lunar_core::debug::{get_local, get_upvalue, lookup_frame};
use std::process;

/// List the live locals of the frame at `level`, then its function's upvalues
pub fn render_locals(ctx: &ExecutionContext, level: usize) -> Result<String, String> {
    let frame = lookup_frame(ctx, level).ok_or_else(|| format!("Error: no frame at level {level}"))?;

    let mut lines = Vec::new();
    for index in 1.. {
        let Some(slot) = get_local(ctx, frame, index) else {
            break;
        };
        let name = slot.name.as_deref().unwrap_or("?");
        lines.push(format!("{name} = {}", slot.value));
    }

    if let Some(function) = frame.function(ctx) {
        for index in 1..=function.upvalues().len() {
            if let Some(slot) = get_upvalue(&function, index) {
                let name = slot.name.as_deref().unwrap_or("?");
                lines.push(format!("upvalue {name} = {}", slot.value));
            }
        }
    }
    Ok(lines.join("\n"))
}

pub fn handle_locals(file: &str, config: Option<&str>, level: usize) {
    let ctx = load_or_exit(file, config);
    match render_locals(&ctx, level) {
        Ok(listing) if listing.is_empty() => println!("(no locals)"),
        Ok(listing) => println!("{listing}"),
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
