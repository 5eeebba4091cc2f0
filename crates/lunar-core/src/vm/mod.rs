mod config;
mod context;
mod errors;
mod frames;

pub use config::*;
pub use context::*;
pub use errors::*;
pub use frames::*;
