//! `traceback` subcommand handler

use crate::utils::load_or_exit;
use lunar_core::ExecutionContext;
use lunar_core::debug::build_traceback;

pub fn render_traceback(ctx: &ExecutionContext, level: usize, message: Option<&str>) -> String {
    build_traceback(ctx, level, message.unwrap_or(""))
}

/// Print the traceback of a scenario's call stack
pub fn handle_traceback(file: &str, config: Option<&str>, message: Option<&str>, level: usize) {
    let ctx = load_or_exit(file, config);
    println!("{}", render_traceback(&ctx, level, message));
}
