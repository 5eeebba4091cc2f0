//! Shared CLI utilities for reading input, loading scenarios and logging

use crate::scenario::Scenario;
use lunar_core::{DebugConfig, ExecutionContext};
use std::fs;
use std::io::{self, Read};
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "LUNAR_LOG";

/// Scenario text from `path`, with `-` meaning stdin
pub fn read_source(path: &str) -> io::Result<String> {
    if path != "-" {
        return fs::read_to_string(path);
    }
    let mut text = String::new();
    io::stdin().lock().read_to_string(&mut text)?;
    Ok(text)
}

/// Load a `DebugConfig` from a RON file, or the defaults when no file is given
pub fn load_config(path: Option<&str>) -> Result<DebugConfig, String> {
    let Some(path) = path else {
        return Ok(DebugConfig::default());
    };
    let source =
        fs::read_to_string(path).map_err(|err| format!("Error reading config '{path}': {err}"))?;
    DebugConfig::from_ron(&source).map_err(|err| format!("Error in config '{path}': {err}"))
}

/// Load a scenario and replay it into a fresh context
pub fn load_context(file: &str, config: DebugConfig) -> Result<ExecutionContext, String> {
    let source = read_source(file).map_err(|err| format!("Error reading file '{file}': {err}"))?;
    let scenario =
        Scenario::from_ron(&source).map_err(|err| format!("Error in scenario '{file}': {err}"))?;
    scenario
        .build(config)
        .map_err(|err| format!("Error in scenario '{file}': {err}"))
}

/// Load a context or exit with the error on stderr
pub fn load_or_exit(file: &str, config_path: Option<&str>) -> ExecutionContext {
    let context = load_config(config_path).and_then(|config| load_context(file, config));
    match context {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

/// Install the stderr log subscriber. `--verbose` enables debug output for the lunar crates
/// unless `LUNAR_LOG` says otherwise.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "lunar_core=debug,lunar_stdlib=debug,lunar=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
