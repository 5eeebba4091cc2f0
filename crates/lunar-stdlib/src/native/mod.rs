//! Native function implementations for the standard library.

pub mod debug;
pub mod helpers;

pub use debug::*;
