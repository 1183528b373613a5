//! Rule schema types
//!
//! The raw `*File` structs mirror the YAML layout with everything
//! optional; validation in `resolve` turns them into the strict runtime
//! types.

use std::path::PathBuf;

use serde::Deserialize;

/// Raw rule file contents as deserialized, before validation
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    pub identifier: Option<String>,

    /// Display name shown while the rule runs
    pub name: Option<String>,

    #[serde(default)]
    pub authors: Vec<String>,

    pub commands: Option<Vec<RuleCommandFile>>,

    pub arguments: Option<Vec<RuleArgumentFile>>,
}

/// Raw command entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleCommandFile {
    pub name: Option<String>,

    pub command: Option<String>,

    /// Exit-status expression, evaluated with `value` = exit code
    pub exit: Option<String>,

    /// Working-directory expression, relative paths joined to the run's
    pub dir: Option<String>,
}

/// Raw argument entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleArgumentFile {
    pub identifier: Option<String>,

    #[serde(default)]
    pub required: bool,

    pub default: Option<String>,

    pub flag: Option<String>,
}

/// A validated rule, read-only after load
#[derive(Debug, Clone)]
pub struct Rule {
    pub identifier: String,
    pub name: String,
    pub authors: Vec<String>,
    pub commands: Vec<RuleCommand>,
    pub arguments: Vec<RuleArgument>,

    /// Where the rule was loaded from, for error context
    pub path: PathBuf,
}

/// A validated command template
#[derive(Debug, Clone)]
pub struct RuleCommand {
    pub name: Option<String>,
    pub command: String,
    pub exit: Option<String>,
    pub dir: Option<String>,
}

/// A validated argument declaration
#[derive(Debug, Clone)]
pub struct RuleArgument {
    pub identifier: String,
    pub required: bool,
    pub default: Option<String>,
    pub flag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_rule_file() {
        let yaml = r#"
identifier: pdflatex
name: PDFLaTeX
authors:
  - Drover Maintainers
commands:
  - name: PDFLaTeX engine
    command: "'pdflatex ' ~ options ~ ' ' ~ quote(file)"
    exit: value == 0
arguments:
  - identifier: options
    default: "''"
  - identifier: shell
    flag: "'--shell-escape'"
"#;
        let rule: RuleFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.identifier.as_deref(), Some("pdflatex"));
        assert_eq!(rule.name.as_deref(), Some("PDFLaTeX"));
        assert_eq!(rule.commands.as_ref().unwrap().len(), 1);
        assert_eq!(rule.arguments.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_deserialize_minimal_rule_file() {
        let yaml = r#"
identifier: touch
name: Touch
commands:
  - command: "'touch ' ~ file"
arguments: []
"#;
        let rule: RuleFile = serde_yaml::from_str(yaml).unwrap();
        assert!(rule.authors.is_empty());
        assert!(rule.arguments.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let yaml = r#"
identifier: touch
name: Touch
commands: []
arguments: []
unexpected: true
"#;
        assert!(serde_yaml::from_str::<RuleFile>(yaml).is_err());
    }
}
