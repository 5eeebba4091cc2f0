use clap::{Parser, Subcommand};

mod info;
mod locals;
mod scenario;
mod traceback;
mod utils;


use info::handle_info;
use locals::handle_locals;
use lunar_core::debug::InfoMask;
use traceback::handle_traceback;
use utils::init_logging;

/// Get the version string including git revision
fn version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), " (git:", env!("GIT_HASH"), ")")
}

#[derive(Parser)]
#[command(
    author,
    version = version(),
    about = "Inspect Lunar call-stack snapshots",
    long_about = None,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Debug settings in RON (main chunk policy, traceback limit, ...)
    #[arg(short, long, global = true)]
    config: Option<String>,
    /// Log introspection activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a stack traceback
    Traceback {
        /// The scenario file ("-" for stdin)
        file: String,
        /// First line of the traceback
        #[arg(short, long)]
        message: Option<String>,
        /// Level to start from
        #[arg(short, long, default_value_t = 0)]
        level: usize,
    },
    /// Print the debug record of one stack level as JSON
    Info {
        /// The scenario file ("-" for stdin)
        file: String,
        #[arg(short, long, default_value_t = 0)]
        level: usize,
        /// Fields to fill, as getinfo options
        #[arg(short, long, default_value = InfoMask::DEFAULT_OPTIONS)]
        what: String,
    },
    /// List the locals and upvalues visible at one stack level
    Locals {
        /// The scenario file ("-" for stdin)
        file: String,
        #[arg(short, long, default_value_t = 0)]
        level: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Traceback {
            file,
            message,
            level,
        } => {
            handle_traceback(file, config, message.as_deref(), *level);
        }
        Commands::Info { file, level, what } => {
            handle_info(file, config, *level, what);
        }
        Commands::Locals { file, level } => {
            handle_locals(file, config, *level);
        }
    }
}
