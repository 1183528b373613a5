//! Run settings
//!
//! This module handles the optional `drover.yml` settings file: file
//! type comment patterns, rule search paths, interpreter and execution
//! defaults.

pub mod parse;
pub mod types;

// Re-export main types
pub use parse::*;
pub use types::*;
