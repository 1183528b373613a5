//! Task execution and halt policy
//!
//! Drives the full pipeline for one document: extract directives, expand
//! them into tasks, and run each task through rule resolution, argument
//! binding, the conditional gate and the command-pass loop.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::FileType;
use crate::directive::{expand_directives, extract_directives, ConditionalKind, Task};
use crate::error::{DirectiveError, ExecutionError, Result};
use crate::eval::{CommandElement, EvalContext, Evaluator, TriggerAction};
use crate::rule::types::{Rule, RuleCommand};
use crate::rule::{bind_arguments, resolve_rule};
use crate::runner::command::run_command;
use crate::runner::conditional::{runs_unconditionally, ConditionalState};
use crate::runner::context::RunContext;

/// Outcome of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The conditional gate rejected the task
    Skipped,

    /// Every attempted command succeeded
    Completed,

    /// At least one command failed
    Failed,
}

/// Aggregate outcome of a run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Tasks whose command pass was entered (or displayed in dry-run)
    pub attempted: usize,

    /// Tasks skipped by their gate
    pub skipped: usize,

    /// Tasks with at least one failing command
    pub failed: usize,

    /// Whether a halt trigger stopped the run
    pub halted: bool,
}

impl RunReport {
    /// A run succeeds when no task failed
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Run the whole pipeline for one document
pub fn run_document(
    document: &Path,
    filetype: &FileType,
    rule_paths: &[PathBuf],
    header_only: bool,
    ctx: &mut RunContext,
    evaluator: &dyn Evaluator,
) -> Result<RunReport> {
    let contents = fs::read_to_string(document)?;
    let directives = extract_directives(&contents, filetype, header_only)?;
    if directives.is_empty() {
        return Err(DirectiveError::NoDirectivesFound(document.to_path_buf()).into());
    }
    ctx.print_debug(&format!("{} directive(s) extracted", directives.len()));

    let tasks = expand_directives(directives, document, &ctx.working_dir)?;
    run_tasks(tasks, rule_paths, ctx, evaluator)
}

/// Run expanded tasks in order, honoring the halt policy
pub fn run_tasks(
    tasks: Vec<Task>,
    rule_paths: &[PathBuf],
    ctx: &mut RunContext,
    evaluator: &dyn Evaluator,
) -> Result<RunReport> {
    let mut report = RunReport::default();
    for task in tasks {
        let rule = resolve_rule(&task.identifier, rule_paths)?;
        match execute_task(&task, &rule, ctx, evaluator)? {
            TaskStatus::Skipped => report.skipped += 1,
            TaskStatus::Completed => report.attempted += 1,
            TaskStatus::Failed => {
                report.attempted += 1;
                report.failed += 1;
            }
        }
        if ctx.halt_requested() {
            report.halted = true;
            break;
        }
        if report.failed > 0 && ctx.halt_on_error {
            break;
        }
    }
    Ok(report)
}

/// Execute one task: bind, gate, then loop command passes
pub fn execute_task(
    task: &Task,
    rule: &Rule,
    ctx: &mut RunContext,
    evaluator: &dyn Evaluator,
) -> Result<TaskStatus> {
    let bound = bind_arguments(rule, task, evaluator)?;
    let file = bound
        .get("file")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    ctx.print_task(&rule.name, &file);

    let mut state = ConditionalState::new();
    if ctx.dry_run {
        if task.conditional.kind != ConditionalKind::None {
            ctx.print_info(&format!(
                "   conditional: {} {}",
                keyword(task.conditional.kind),
                task.conditional.expression
            ));
        }
    } else if !runs_unconditionally(task.conditional.kind)
        && !state.advance(&task.conditional, &bound, evaluator, ctx)?
    {
        return Ok(TaskStatus::Skipped);
    }

    let mut failed = false;
    loop {
        let pass = run_pass(rule, &bound, ctx, evaluator)?;
        failed |= pass.failed;
        if pass.stopped {
            break;
        }
        if !state.advance(&task.conditional, &bound, evaluator, ctx)? {
            break;
        }
    }

    Ok(if failed {
        TaskStatus::Failed
    } else {
        TaskStatus::Completed
    })
}

/// What one command pass did
struct Pass {
    /// Some element failed its exit check
    failed: bool,

    /// The pass was abandoned early (halt flag, or a failure under
    /// halt-on-error); the loop must not continue
    stopped: bool,
}

/// Run every rule command once against the bound context
fn run_pass(
    rule: &Rule,
    bound: &EvalContext,
    ctx: &mut RunContext,
    evaluator: &dyn Evaluator,
) -> Result<Pass> {
    let mut failed = false;
    for rule_command in &rule.commands {
        let result = evaluator
            .evaluate(&rule_command.command, bound)
            .map_err(|source| ExecutionError::CommandEvaluation {
                identifier: rule.identifier.clone(),
                source,
            })?;
        let elements = result
            .flatten()
            .ok_or_else(|| ExecutionError::NullCommandResult(rule.identifier.clone()))?;
        let dir = command_dir(rule, rule_command, bound, ctx, evaluator)?;

        for element in elements {
            match element {
                CommandElement::Run(line) if line.is_empty() => continue,
                CommandElement::Trigger(trigger) => {
                    if ctx.dry_run {
                        ctx.print_dry_run(trigger_label(trigger));
                    } else {
                        apply_trigger(trigger, ctx);
                    }
                }
                CommandElement::Run(line) => {
                    if ctx.dry_run {
                        ctx.print_dry_run(&line);
                    } else {
                        let output = run_command(&line, ctx, dir.as_deref())?;
                        ctx.print_output(&output.output);
                        let success =
                            command_succeeded(rule_command, output.code, bound, evaluator)?;
                        let label = rule_command.name.as_deref().unwrap_or(line.as_str());
                        ctx.print_status(label, success);
                        failed |= !success;
                    }
                }
            }

            if ctx.halt_requested() || (failed && ctx.halt_on_error) {
                return Ok(Pass {
                    failed,
                    stopped: true,
                });
            }
        }
    }
    Ok(Pass {
        failed,
        stopped: false,
    })
}

/// Resolve a rule command's working-directory expression, if any
fn command_dir(
    rule: &Rule,
    rule_command: &RuleCommand,
    bound: &EvalContext,
    ctx: &RunContext,
    evaluator: &dyn Evaluator,
) -> Result<Option<PathBuf>> {
    let Some(expression) = &rule_command.dir else {
        return Ok(None);
    };
    let result = evaluator.evaluate(expression, bound).map_err(|source| {
        ExecutionError::CommandEvaluation {
            identifier: rule.identifier.clone(),
            source,
        }
    })?;
    match result {
        crate::eval::EvalResult::Text(path) if !path.is_empty() => {
            let resolved = if Path::new(&path).is_absolute() {
                PathBuf::from(path)
            } else {
                ctx.working_dir.join(path)
            };
            Ok(Some(resolved))
        }
        crate::eval::EvalResult::Text(_) => Ok(None),
        _ => Err(ExecutionError::CommandEvaluation {
            identifier: rule.identifier.clone(),
            source: crate::eval::EvalError::new(
                "working directory expression did not produce a string",
            ),
        }
        .into()),
    }
}

fn apply_trigger(trigger: TriggerAction, ctx: &mut RunContext) {
    match trigger {
        TriggerAction::Halt => ctx.request_halt(),
    }
}

fn trigger_label(trigger: TriggerAction) -> &'static str {
    match trigger {
        TriggerAction::Halt => "halt",
    }
}

/// Apply the command's exit expression to its exit code.
///
/// Without an expression, success is exit code zero. With one, the
/// expression sees the bound context plus `value` and must produce a
/// boolean.
fn command_succeeded(
    rule_command: &RuleCommand,
    code: i32,
    bound: &EvalContext,
    evaluator: &dyn Evaluator,
) -> Result<bool> {
    let Some(expression) = &rule_command.exit else {
        return Ok(code == 0);
    };

    let mut context = bound.clone();
    context.insert(
        "value".to_string(),
        serde_yaml::Value::Number(serde_yaml::Number::from(code)),
    );

    let result = evaluator.evaluate(expression, &context).map_err(|source| {
        ExecutionError::ExitExpression {
            expression: expression.clone(),
            source,
        }
    })?;
    match result {
        crate::eval::EvalResult::Boolean(success) => Ok(success),
        _ => Err(ExecutionError::WrongExitExpression(expression.clone()).into()),
    }
}

fn keyword(kind: ConditionalKind) -> &'static str {
    match kind {
        ConditionalKind::None => "",
        ConditionalKind::If => "if",
        ConditionalKind::Unless => "unless",
        ConditionalKind::While => "while",
        ConditionalKind::Until => "until",
    }
}
