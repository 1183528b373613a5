//! Rule resolution, validation and argument binding
//!
//! Rules are external YAML command templates, one file per rule, located
//! by identifier across the configured search paths.

pub mod bind;
pub mod resolve;
pub mod types;

pub use bind::bind_arguments;
pub use resolve::{resolve_rule, RULE_EXTENSION};
pub use types::{Rule, RuleArgument, RuleCommand};
