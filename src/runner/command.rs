//! Command execution
//!
//! Spawns one command line through the configured interpreter, draining
//! stdout and stderr on separate threads while waiting so a full pipe
//! buffer can never deadlock the child, and killing it once the
//! configured timeout elapses.

use std::io::Read;
use std::process::{Command as StdCommand, Stdio};
use std::thread;

use wait_timeout::ChildExt;

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::context::RunContext;

/// Captured result of one spawned command
#[derive(Debug)]
pub struct CommandOutput {
    /// Exit code, -1 when the process died without one
    pub code: i32,

    /// Combined stdout then stderr, lossily decoded
    pub output: String,
}

/// Run `line` through the context's interpreter.
///
/// The command runs in `dir` when given, the context's working directory
/// otherwise. Stdout and stderr are piped and drained concurrently; the
/// exit status is read only after both readers joined. A timeout kills
/// the child and surfaces as a fatal error.
pub fn run_command(
    line: &str,
    ctx: &RunContext,
    dir: Option<&std::path::Path>,
) -> ExecutionResult<CommandOutput> {
    let program = ctx
        .interpreter
        .first()
        .ok_or_else(|| ExecutionError::ProcessNotFound(String::new()))?;

    let mut command = StdCommand::new(program);
    if ctx.interpreter.len() > 1 {
        command.args(&ctx.interpreter[1..]);
    }
    command.arg(line);
    command.current_dir(dir.unwrap_or(&ctx.working_dir));
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExecutionError::ProcessNotFound(program.clone())
        } else {
            ExecutionError::Spawn {
                command: line.to_string(),
                source: e,
            }
        }
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| spawn_error(line, std::io::Error::other("stdout was not piped")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| spawn_error(line, std::io::Error::other("stderr was not piped")))?;
    let stdout_handle = thread::spawn(move || drain(stdout));
    let stderr_handle = thread::spawn(move || drain(stderr));

    let status = match ctx.timeout {
        Some(timeout) => match child.wait_timeout(timeout).map_err(|e| spawn_error(line, e))? {
            Some(status) => status,
            None => {
                child.kill().map_err(|e| spawn_error(line, e))?;
                child.wait().map_err(|e| spawn_error(line, e))?;
                // Let the readers finish before reporting
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(ExecutionError::Timeout {
                    command: line.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
        },
        None => child.wait().map_err(|e| spawn_error(line, e))?,
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();

    let mut output = String::from_utf8_lossy(&stdout).into_owned();
    if !stderr.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&String::from_utf8_lossy(&stderr));
    }

    Ok(CommandOutput {
        code: status.code().unwrap_or(-1),
        output,
    })
}

fn drain<R: Read>(mut reader: R) -> Vec<u8> {
    let mut buffer = Vec::new();
    let _ = reader.read_to_end(&mut buffer);
    buffer
}

fn spawn_error(line: &str, source: std::io::Error) -> ExecutionError {
    ExecutionError::Spawn {
        command: line.to_string(),
        source,
    }
}
