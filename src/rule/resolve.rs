//! Rule resolution and schema validation
//!
//! Finds the rule file matching a directive identifier across the
//! configured search paths, in priority order, and validates the loaded
//! schema before anything else touches it.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::directive::RESERVED_PARAMETERS;
use crate::error::{RuleError, RuleResult};
use crate::rule::types::{Rule, RuleArgument, RuleCommand, RuleFile};

/// Fixed extension of rule files
pub const RULE_EXTENSION: &str = "yaml";

/// Resolve `identifier` against the search paths, first match wins.
///
/// There is no fallback merging: a rule found earlier shadows any
/// same-named rule later in the list.
pub fn resolve_rule(identifier: &str, search_paths: &[PathBuf]) -> RuleResult<Rule> {
    let file_name = format!("{identifier}.{RULE_EXTENSION}");
    for dir in search_paths {
        let candidate = dir.join(&file_name);
        if candidate.is_file() {
            return load_rule(identifier, &candidate);
        }
    }
    Err(RuleError::NotFound {
        identifier: identifier.to_string(),
        searched: search_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Load and validate one rule file
pub fn load_rule(identifier: &str, path: &Path) -> RuleResult<Rule> {
    let contents = fs::read_to_string(path).map_err(|e| RuleError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let raw: RuleFile = serde_yaml::from_str(&contents).map_err(|e| RuleError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_rule(identifier, raw, path)
}

/// Validation order is fixed: identifier, name, commands, arguments,
/// per-argument checks, uniqueness. The first violation aborts.
fn validate_rule(requested: &str, raw: RuleFile, path: &Path) -> RuleResult<Rule> {
    let identifier = match raw.identifier {
        Some(id) if id == requested => id,
        Some(id) => {
            return Err(RuleError::WrongIdentifier {
                expected: requested.to_string(),
                found: id,
                path: path.to_path_buf(),
            })
        }
        None => {
            return Err(RuleError::WrongIdentifier {
                expected: requested.to_string(),
                found: String::new(),
                path: path.to_path_buf(),
            })
        }
    };

    let name = raw.name.filter(|n| !n.trim().is_empty()).ok_or_else(|| {
        RuleError::MissingName {
            identifier: identifier.clone(),
            path: path.to_path_buf(),
        }
    })?;

    let commands = raw.commands.unwrap_or_default();
    if commands.is_empty()
        || commands
            .iter()
            .any(|c| c.command.as_deref().map_or(true, |s| s.trim().is_empty()))
    {
        return Err(RuleError::MissingCommands {
            identifier,
            path: path.to_path_buf(),
        });
    }
    let commands: Vec<RuleCommand> = commands
        .into_iter()
        .map(|c| RuleCommand {
            name: c.name,
            command: c.command.unwrap_or_default(),
            exit: c.exit,
            dir: c.dir,
        })
        .collect();

    let raw_arguments = raw.arguments.ok_or_else(|| RuleError::MissingArguments {
        identifier: identifier.clone(),
        path: path.to_path_buf(),
    })?;

    let mut arguments = Vec::with_capacity(raw_arguments.len());
    for raw_arg in raw_arguments {
        let arg_id = raw_arg.identifier.filter(|i| !i.trim().is_empty()).ok_or_else(|| {
            RuleError::ArgumentWithoutBody {
                identifier: identifier.clone(),
                argument: "<unnamed>".to_string(),
            }
        })?;
        if raw_arg.default.is_none() && raw_arg.flag.is_none() {
            return Err(RuleError::ArgumentWithoutBody {
                identifier,
                argument: arg_id,
            });
        }
        arguments.push(RuleArgument {
            identifier: arg_id,
            required: raw_arg.required,
            default: raw_arg.default,
            flag: raw_arg.flag,
        });
    }

    let mut seen = HashSet::new();
    for arg in &arguments {
        if RESERVED_PARAMETERS.contains(&arg.identifier.as_str())
            || !seen.insert(arg.identifier.clone())
        {
            return Err(RuleError::DuplicateOrReservedArgument {
                identifier,
                argument: arg.identifier.clone(),
            });
        }
    }

    Ok(Rule {
        identifier,
        name,
        authors: raw.authors,
        commands,
        arguments,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_rule(dir: &Path, identifier: &str, contents: &str) -> PathBuf {
        let path = dir.join(format!("{identifier}.{RULE_EXTENSION}"));
        fs::write(&path, contents).unwrap();
        path
    }

    const GOOD_RULE: &str = r#"
identifier: pdflatex
name: PDFLaTeX
commands:
  - command: "'pdflatex ' ~ quote(file)"
arguments:
  - identifier: options
    default: "''"
"#;

    #[test]
    fn test_resolve_finds_rule_in_first_path() {
        let dir = TempDir::new().unwrap();
        write_rule(dir.path(), "pdflatex", GOOD_RULE);

        let rule = resolve_rule("pdflatex", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(rule.identifier, "pdflatex");
        assert_eq!(rule.name, "PDFLaTeX");
        assert_eq!(rule.commands.len(), 1);
        assert_eq!(rule.arguments.len(), 1);
    }

    #[test]
    fn test_earlier_path_shadows_later() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_rule(
            first.path(),
            "pdflatex",
            &GOOD_RULE.replace("PDFLaTeX", "First"),
        );
        write_rule(
            second.path(),
            "pdflatex",
            &GOOD_RULE.replace("PDFLaTeX", "Second"),
        );

        let rule = resolve_rule(
            "pdflatex",
            &[first.path().to_path_buf(), second.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(rule.name, "First");
    }

    #[test]
    fn test_missing_rule_lists_searched_paths() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();

        let err = resolve_rule(
            "nonexistent",
            &[first.path().to_path_buf(), second.path().to_path_buf()],
        )
        .unwrap_err();
        match err {
            RuleError::NotFound { identifier, searched } => {
                assert_eq!(identifier, "nonexistent");
                assert!(searched.contains(&first.path().display().to_string()));
                assert!(searched.contains(&second.path().display().to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_identifier_rejected() {
        let dir = TempDir::new().unwrap();
        write_rule(
            dir.path(),
            "alias",
            &GOOD_RULE.replace("identifier: pdflatex", "identifier: pdflatex2"),
        );

        let err = resolve_rule("alias", &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, RuleError::WrongIdentifier { .. }));
    }

    #[test]
    fn test_missing_name_rejected() {
        let dir = TempDir::new().unwrap();
        write_rule(
            dir.path(),
            "pdflatex",
            r#"
identifier: pdflatex
commands:
  - command: "'true'"
arguments: []
"#,
        );

        let err = resolve_rule("pdflatex", &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, RuleError::MissingName { .. }));
    }

    #[test]
    fn test_empty_commands_rejected() {
        let dir = TempDir::new().unwrap();
        write_rule(
            dir.path(),
            "pdflatex",
            r#"
identifier: pdflatex
name: PDFLaTeX
commands: []
arguments: []
"#,
        );

        let err = resolve_rule("pdflatex", &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, RuleError::MissingCommands { .. }));
    }

    #[test]
    fn test_blank_command_expression_rejected() {
        let dir = TempDir::new().unwrap();
        write_rule(
            dir.path(),
            "pdflatex",
            r#"
identifier: pdflatex
name: PDFLaTeX
commands:
  - command: "  "
arguments: []
"#,
        );

        let err = resolve_rule("pdflatex", &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, RuleError::MissingCommands { .. }));
    }

    #[test]
    fn test_absent_arguments_list_rejected() {
        let dir = TempDir::new().unwrap();
        write_rule(
            dir.path(),
            "pdflatex",
            r#"
identifier: pdflatex
name: PDFLaTeX
commands:
  - command: "'true'"
"#,
        );

        let err = resolve_rule("pdflatex", &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, RuleError::MissingArguments { .. }));
    }

    #[test]
    fn test_argument_without_default_or_flag_rejected() {
        let dir = TempDir::new().unwrap();
        write_rule(
            dir.path(),
            "pdflatex",
            r#"
identifier: pdflatex
name: PDFLaTeX
commands:
  - command: "'true'"
arguments:
  - identifier: bare
"#,
        );

        let err = resolve_rule("pdflatex", &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(
            err,
            RuleError::ArgumentWithoutBody { ref argument, .. } if argument == "bare"
        ));
    }

    #[test]
    fn test_duplicate_argument_rejected() {
        let dir = TempDir::new().unwrap();
        write_rule(
            dir.path(),
            "pdflatex",
            r#"
identifier: pdflatex
name: PDFLaTeX
commands:
  - command: "'true'"
arguments:
  - identifier: options
    default: "''"
  - identifier: options
    default: "''"
"#,
        );

        let err = resolve_rule("pdflatex", &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, RuleError::DuplicateOrReservedArgument { .. }));
    }

    #[test]
    fn test_reserved_argument_rejected() {
        let dir = TempDir::new().unwrap();
        write_rule(
            dir.path(),
            "pdflatex",
            r#"
identifier: pdflatex
name: PDFLaTeX
commands:
  - command: "'true'"
arguments:
  - identifier: file
    default: "''"
"#,
        );

        let err = resolve_rule("pdflatex", &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(
            err,
            RuleError::DuplicateOrReservedArgument { ref argument, .. } if argument == "file"
        ));
    }
}
