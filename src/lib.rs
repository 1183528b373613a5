//! Drover - a directive-driven command automation tool
//!
//! Drover scans a source document for embedded directives, resolves each
//! one against an externally defined rule, binds directive parameters to
//! rule arguments, evaluates per-directive conditionals, and executes
//! the resulting commands.

// Public modules
pub mod cli;
pub mod config;
pub mod directive;
pub mod error;
pub mod eval;
pub mod rule;
pub mod runner;
pub mod store;

// Re-export commonly used types
pub use error::{DroverError, Result};

/// Current version of Drover
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
