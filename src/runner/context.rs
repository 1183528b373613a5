//! Execution context for a run
//!
//! The context carries every run-scoped setting and the halt flag; there
//! are no process-wide globals.

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;

/// Default ceiling for while/until loop iterations
pub const DEFAULT_MAX_LOOPS: u32 = 10;

/// Run-scoped state shared by the conditional evaluator and the executor
pub struct RunContext {
    /// Directory commands run in; also anchors relative paths
    pub working_dir: PathBuf,

    /// Interpreter the command strings are handed to (e.g. ["sh", "-c"])
    pub interpreter: Vec<String>,

    /// Verbosity level
    pub verbosity: Verbosity,

    /// Evaluate and display, never spawn
    pub dry_run: bool,

    /// Stop the run after the first failing command
    pub halt_on_error: bool,

    /// Ceiling for while/until iterations
    pub max_loops: u32,

    /// Kill commands running longer than this
    pub timeout: Option<Duration>,

    halt: bool,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl RunContext {
    /// Create a context with default settings rooted in `working_dir`
    pub fn new(working_dir: PathBuf) -> Self {
        RunContext {
            working_dir,
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            verbosity: Verbosity::Normal,
            dry_run: false,
            halt_on_error: true,
            max_loops: DEFAULT_MAX_LOOPS,
            timeout: None,
            halt: false,
        }
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable halt-on-error
    pub fn with_halt_on_error(mut self, halt_on_error: bool) -> Self {
        self.halt_on_error = halt_on_error;
        self
    }

    /// Set the loop ceiling
    pub fn with_max_loops(mut self, max_loops: u32) -> Self {
        self.max_loops = max_loops;
        self
    }

    /// Set the command timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Request a halt; the executor stops after the current element
    pub fn request_halt(&mut self) {
        self.halt = true;
    }

    /// Whether a halt was requested
    pub fn halt_requested(&self) -> bool {
        self.halt
    }

    /// Print a task header line
    pub fn print_task(&self, rule_name: &str, file: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {} ({})", "::".bold(), rule_name.bold(), file);
        }
    }

    /// Print the status of one executed command
    pub fn print_status(&self, label: &str, success: bool) {
        if self.verbosity >= Verbosity::Normal {
            let status = if success {
                "ok".green().bold()
            } else {
                "failed".red().bold()
            };
            eprintln!("   {} {}", label, status);
        }
    }

    /// Print a command that would run in dry-run mode
    pub fn print_dry_run(&self, command: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("   {} {}", "would run:".yellow(), command);
        }
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "error:".red().bold(), message);
        }
    }

    /// Print captured command output (verbose mode only)
    pub fn print_output(&self, output: &str) {
        if self.verbosity >= Verbosity::Verbose && !output.is_empty() {
            for line in output.lines() {
                eprintln!("   {} {}", "|".dimmed(), line);
            }
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "debug:".dimmed(), message);
        }
    }
}
