//! Main CLI application

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command};
use clap_complete::{generate, Shell};

use crate::config::{load_settings, rule_search_paths, Settings};
use crate::error::{ConfigError, Result};
use crate::eval::ExpressionEngine;
use crate::runner::{run_document, RunContext, RunReport, Verbosity, DEFAULT_MAX_LOOPS};

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("drover")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A directive-driven command automation tool")
        .arg(
            Arg::new("document")
                .value_name("DOCUMENT")
                .help("The document to scan for directives")
                .required_unless_present("completions"),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Evaluate and display directives without running commands")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print command output while running")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print errors and statuses")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print nothing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .help("Kill commands running longer than this (0 disables)")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("max-loops")
                .short('m')
                .long("max-loops")
                .value_name("N")
                .help("Ceiling for while/until loop iterations")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("keep-going")
                .short('k')
                .long("keep-going")
                .help("Attempt the remaining directives after a failing command")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("header-only")
                .short('H')
                .long("header-only")
                .help("Only scan the leading comment block for directives")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("working-directory")
                .short('d')
                .long("working-directory")
                .value_name("DIR")
                .help("Directory commands run in (defaults to the document's)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("rule-path")
                .short('r')
                .long("rule-path")
                .value_name("DIR")
                .help("Extra rule search path, highest priority (repeatable)")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Settings file (skips discovery)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Emit a shell completion script and exit")
                .value_parser(clap::value_parser!(Shell)),
        )
}

/// Run the CLI application. Returns whether every attempted command
/// succeeded; fatal errors surface as `Err`.
pub fn run() -> Result<bool> {
    // Pick up a .env beside the invocation for expression env() lookups
    dotenvy::dotenv().ok();

    let matches = build_command().get_matches();

    if let Some(shell) = matches.get_one::<Shell>("completions") {
        let mut command = build_command();
        generate(*shell, &mut command, "drover", &mut io::stdout());
        return Ok(true);
    }

    let document = matches
        .get_one::<String>("document")
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::Invalid("no document given".to_string()))?;
    if !document.is_file() {
        return Err(ConfigError::Invalid(format!(
            "document '{}' does not exist",
            document.display()
        ))
        .into());
    }

    let document_dir = document
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let working_dir = matches
        .get_one::<PathBuf>("working-directory")
        .cloned()
        .unwrap_or_else(|| document_dir.clone());

    let (settings, settings_dir) =
        load_settings(matches.get_one::<PathBuf>("config").map(PathBuf::as_path), &document_dir)?;

    let extension = document
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string)
        .unwrap_or_default();
    let filetype = settings.filetype_for(&extension)?;

    let cli_rule_paths: Vec<PathBuf> = matches
        .get_many::<PathBuf>("rule-path")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();
    let search_paths = rule_search_paths(&cli_rule_paths, &settings, &settings_dir, &document_dir);

    let mut ctx = build_context(&matches, &settings, working_dir);
    let evaluator = ExpressionEngine::new(ctx.working_dir.clone());

    let report = run_document(
        &document,
        &filetype,
        &search_paths,
        matches.get_flag("header-only"),
        &mut ctx,
        &evaluator,
    )?;

    print_summary(&ctx, &report);
    Ok(report.success())
}

/// Resolve run options: CLI flags over settings over defaults
fn build_context(matches: &ArgMatches, settings: &Settings, working_dir: PathBuf) -> RunContext {
    let timeout_secs = matches
        .get_one::<u64>("timeout")
        .copied()
        .or(settings.timeout)
        .filter(|&secs| secs > 0);
    let max_loops = matches
        .get_one::<u32>("max-loops")
        .copied()
        .or(settings.max_loops)
        .unwrap_or(DEFAULT_MAX_LOOPS);
    let halt_on_error = if matches.get_flag("keep-going") {
        false
    } else {
        settings.halt_on_error.unwrap_or(true)
    };

    let mut ctx = RunContext::new(working_dir)
        .with_verbosity(get_verbosity(matches))
        .with_dry_run(matches.get_flag("dry-run"))
        .with_halt_on_error(halt_on_error)
        .with_max_loops(max_loops)
        .with_timeout(timeout_secs.map(Duration::from_secs));
    if let Some(interpreter) = &settings.interpreter {
        ctx = ctx.with_interpreter(interpreter.clone());
    }
    ctx
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

fn print_summary(ctx: &RunContext, report: &RunReport) {
    if report.halted {
        ctx.print_info("halted");
    }
    if report.success() {
        ctx.print_info(&format!(
            "done: {} task(s) run, {} skipped",
            report.attempted, report.skipped
        ));
    } else {
        ctx.print_error(&format!(
            "{} of {} task(s) failed",
            report.failed, report.attempted
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parses_typical_invocation() {
        let matches = build_command().get_matches_from(vec![
            "drover",
            "--dry-run",
            "--max-loops",
            "5",
            "--timeout",
            "30",
            "-r",
            "/extra/rules",
            "doc.tex",
        ]);
        assert!(matches.get_flag("dry-run"));
        assert_eq!(matches.get_one::<u32>("max-loops"), Some(&5));
        assert_eq!(matches.get_one::<u64>("timeout"), Some(&30));
        assert_eq!(
            matches.get_one::<String>("document").map(String::as_str),
            Some("doc.tex")
        );
    }

    #[test]
    fn test_verbosity_defaults_to_normal() {
        let matches = build_command().get_matches_from(vec!["drover", "doc.tex"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Normal);
    }

    #[test]
    fn test_silent_flag_wins() {
        let matches =
            build_command().get_matches_from(vec!["drover", "--silent", "--verbose", "doc.tex"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Silent);
    }

    #[test]
    fn test_context_resolution_prefers_flags_over_settings() {
        let matches = build_command().get_matches_from(vec![
            "drover",
            "--max-loops",
            "2",
            "--keep-going",
            "doc.tex",
        ]);
        let settings = Settings {
            max_loops: Some(9),
            halt_on_error: Some(true),
            timeout: Some(15),
            ..Settings::default()
        };
        let ctx = build_context(&matches, &settings, PathBuf::from("."));
        assert_eq!(ctx.max_loops, 2);
        assert!(!ctx.halt_on_error);
        assert_eq!(ctx.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_zero_timeout_means_unlimited() {
        let matches =
            build_command().get_matches_from(vec!["drover", "--timeout", "0", "doc.tex"]);
        let ctx = build_context(&matches, &Settings::default(), PathBuf::from("."));
        assert!(ctx.timeout.is_none());
    }
}
