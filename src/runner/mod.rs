//! Directive execution engine
//!
//! This module drives resolved tasks through their conditional gate,
//! command passes and loop continuation, spawning commands through the
//! configured interpreter.

pub mod command;
pub mod conditional;
pub mod context;
pub mod executor;

// Re-export main types
pub use command::*;
pub use conditional::*;
pub use context::*;
pub use executor::*;
