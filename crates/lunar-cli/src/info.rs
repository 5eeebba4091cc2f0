//! `info` subcommand handler

use crate::utils::load_or_exit;
use lunar_core::ExecutionContext;
use lunar_core::debug::{InfoMask, Target, lookup_frame, resolve};
use std::process;

/// Describe the frame at `level` as pretty-printed JSON
pub fn render_info(ctx: &ExecutionContext, level: usize, what: &str) -> Result<String, String> {
    let mask = InfoMask::parse(what).map_err(|err| format!("Error: {err}"))?;
    let frame = lookup_frame(ctx, level).ok_or_else(|| format!("Error: no frame at level {level}"))?;
    let record = resolve(ctx, mask, Target::Frame(frame)).map_err(|err| format!("Error: {err}"))?;
    serde_json::to_string_pretty(&record).map_err(|err| format!("Error serializing record: {err}"))
}

pub fn handle_info(file: &str, config: Option<&str>, level: usize, what: &str) {
    let ctx = load_or_exit(file, config);
    match render_info(&ctx, level, what) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
