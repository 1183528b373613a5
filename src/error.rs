//! Error types for Drover

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Drover operations
pub type Result<T> = std::result::Result<T, DroverError>;

/// Main error type for Drover
#[derive(Error, Debug)]
pub enum DroverError {
    /// Directive extraction and validation errors
    #[error("Directive error: {0}")]
    Directive(#[from] DirectiveError),

    /// Rule resolution and argument binding errors
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Command and conditional execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Settings file errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Directive extraction, assembly and expansion errors
#[derive(Error, Debug)]
pub enum DirectiveError {
    #[error("Continuation line {0} has no directive to continue")]
    OrphanContinuation(usize),

    #[error("Invalid directive on line(s) {}: {reason}", format_lines(.lines))]
    InvalidFormat { lines: Vec<usize>, reason: String },

    #[error("No directives found in '{}'", .0.display())]
    NoDirectivesFound(PathBuf),

    #[error("Parameter '{name}' on line(s) {} is reserved", format_lines(.lines))]
    ReservedParameter { name: String, lines: Vec<usize> },

    #[error("Parameter 'files' on line(s) {} must be a non-empty list", format_lines(.lines))]
    InvalidFilesList { lines: Vec<usize> },
}

/// Rule resolution, validation and binding errors
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Rule '{identifier}' not found (searched: {searched})")]
    NotFound { identifier: String, searched: String },

    #[error("Rule file '{}' declares identifier '{found}', expected '{expected}'", .path.display())]
    WrongIdentifier {
        expected: String,
        found: String,
        path: PathBuf,
    },

    #[error("Rule '{identifier}' ({}) has no name", .path.display())]
    MissingName { identifier: String, path: PathBuf },

    #[error("Rule '{identifier}' ({}) has no usable commands", .path.display())]
    MissingCommands { identifier: String, path: PathBuf },

    #[error("Rule '{identifier}' ({}) has no argument list", .path.display())]
    MissingArguments { identifier: String, path: PathBuf },

    #[error("Argument '{argument}' of rule '{identifier}' needs a default or a flag")]
    ArgumentWithoutBody { identifier: String, argument: String },

    #[error("Argument '{argument}' of rule '{identifier}' is duplicated or reserved")]
    DuplicateOrReservedArgument { identifier: String, argument: String },

    #[error("Directive '{identifier}' uses parameters not declared by the rule: {}", .keys.join(", "))]
    UnknownParameters { identifier: String, keys: Vec<String> },

    #[error("Argument '{argument}' of rule '{identifier}' is required")]
    MissingRequiredArgument { identifier: String, argument: String },

    #[error("Default for argument '{argument}' of rule '{identifier}' ({}) failed: {source}", .path.display())]
    DefaultEvaluation {
        identifier: String,
        argument: String,
        path: PathBuf,
        source: crate::eval::EvalError,
    },

    #[error("Flag for argument '{argument}' of rule '{identifier}' ({}) failed: {source}", .path.display())]
    FlagEvaluation {
        identifier: String,
        argument: String,
        path: PathBuf,
        source: crate::eval::EvalError,
    },

    #[error("Failed to load rule file '{}': {reason}", .path.display())]
    Load { path: PathBuf, reason: String },
}

/// Conditional and command execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Conditional '{0}' did not produce a boolean")]
    NonBooleanConditional(String),

    #[error("Conditional '{expression}' failed: {source}")]
    ConditionalEvaluation {
        expression: String,
        source: crate::eval::EvalError,
    },

    #[error("Command expression of rule '{0}' produced a null element")]
    NullCommandResult(String),

    #[error("Exit expression '{0}' did not produce a boolean")]
    WrongExitExpression(String),

    #[error("Exit expression '{expression}' failed: {source}")]
    ExitExpression {
        expression: String,
        source: crate::eval::EvalError,
    },

    #[error("Command '{command}' timed out after {seconds} seconds")]
    Timeout { command: String, seconds: u64 },

    #[error("Program '{0}' was not found")]
    ProcessNotFound(String),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn { command: String, source: io::Error },

    #[error("Command expression of rule '{identifier}' failed: {source}")]
    CommandEvaluation {
        identifier: String,
        source: crate::eval::EvalError,
    },

    #[error("Change tracking for '{}' failed: {reason}", .path.display())]
    ChangeTracking { path: PathBuf, reason: String },
}

/// Settings file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{}': {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Invalid settings: {0}")]
    Invalid(String),

    #[error("No file type known for '{0}' (configure one in drover.yml)")]
    UnknownFileType(String),

    #[error("File type pattern '{pattern}' is not a valid regex: {reason}")]
    BadPattern { pattern: String, reason: String },
}

fn format_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Specialized result type for directive operations
pub type DirectiveResult<T> = std::result::Result<T, DirectiveError>;

/// Specialized result type for rule operations
pub type RuleResult<T> = std::result::Result<T, RuleError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for settings operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
