//! Directive extraction and multi-line assembly
//!
//! Scans document lines for the comment prefix of the document's file
//! type followed by the `drover:` trigger, groups continuation lines
//! onto their opening directive, and parses each group against the
//! directive grammar.

use regex::Regex;

use crate::config::FileType;
use crate::directive::{Conditional, ConditionalKind, Directive, ParameterMap};
use crate::error::{DirectiveError, DirectiveResult};

/// The trigger token that marks a comment as a directive
pub const TRIGGER: &str = "drover";

/// Marker opening a continuation line, applied to the captured remainder
const CONTINUATION: &str = "-->";

/// Grammar of an assembled directive:
/// `identifier (":" "{" ... "}")? ((if|while|until|unless) expression)?`
const GRAMMAR: &str = r"(?x)
    ^(?P<id>[a-zA-Z][a-zA-Z0-9_-]*)
    (?:\s*:\s*(?P<params>\{.*\}))?
    (?:\s+(?P<kw>if|while|until|unless)\s+(?P<expr>\S.*?))?
    \s*$
";

/// Line scanner for one file type
pub struct DirectiveScanner {
    directive: Regex,
    comment: Regex,
    grammar: Regex,
    header_only: bool,
}

impl DirectiveScanner {
    /// Build a scanner from the file type's comment pattern
    pub fn new(filetype: &FileType, header_only: bool) -> DirectiveResult<Self> {
        let directive = Regex::new(&format!(r"{}\s*{}:\s*(?P<content>.*)$", filetype.pattern, TRIGGER))
            .map_err(|e| DirectiveError::InvalidFormat {
                lines: Vec::new(),
                reason: e.to_string(),
            })?;
        let comment = Regex::new(&filetype.pattern).map_err(|e| DirectiveError::InvalidFormat {
            lines: Vec::new(),
            reason: e.to_string(),
        })?;
        let grammar = Regex::new(GRAMMAR).expect("directive grammar is a valid regex");
        Ok(DirectiveScanner {
            directive,
            comment,
            grammar,
            header_only,
        })
    }

    /// Collect candidate directive lines: (1-based line number, remainder)
    fn candidates(&self, content: &str) -> Vec<(usize, String)> {
        let mut found = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if let Some(caps) = self.directive.captures(line) {
                let remainder = caps
                    .name("content")
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                found.push((index + 1, remainder));
            } else if self.header_only
                && !line.trim().is_empty()
                && !self.comment.is_match(line)
            {
                // Header block ends at the first non-blank, non-comment line
                break;
            }
        }
        found
    }

    /// Group candidates, appending continuation lines to the open group
    fn assemble(&self, candidates: Vec<(usize, String)>) -> DirectiveResult<Vec<RawGroup>> {
        let mut groups: Vec<RawGroup> = Vec::new();
        for (line, content) in candidates {
            if let Some(rest) = content.strip_prefix(CONTINUATION) {
                let open = groups
                    .last_mut()
                    .ok_or(DirectiveError::OrphanContinuation(line))?;
                if !rest.trim().is_empty() {
                    open.text.push(' ');
                    open.text.push_str(rest.trim());
                }
                open.lines.push(line);
            } else {
                groups.push(RawGroup {
                    text: content,
                    lines: vec![line],
                });
            }
        }
        Ok(groups)
    }

    /// Parse one assembled group against the directive grammar
    fn parse(&self, group: RawGroup) -> DirectiveResult<Directive> {
        let caps = self
            .grammar
            .captures(&group.text)
            .ok_or_else(|| DirectiveError::InvalidFormat {
                lines: group.lines.clone(),
                reason: format!("'{}' does not match the directive grammar", group.text),
            })?;

        let identifier = caps["id"].to_string();

        let parameters: ParameterMap = match caps.name("params") {
            Some(block) => serde_yaml::from_str(block.as_str()).map_err(|e| {
                DirectiveError::InvalidFormat {
                    lines: group.lines.clone(),
                    reason: format!("parameter block: {e}"),
                }
            })?,
            None => ParameterMap::new(),
        };

        let conditional = match (caps.name("kw"), caps.name("expr")) {
            (Some(kw), Some(expr)) => Conditional {
                kind: match kw.as_str() {
                    "if" => ConditionalKind::If,
                    "unless" => ConditionalKind::Unless,
                    "while" => ConditionalKind::While,
                    "until" => ConditionalKind::Until,
                    other => unreachable!("grammar admits no keyword '{other}'"),
                },
                expression: expr.as_str().trim().to_string(),
            },
            _ => Conditional::none(),
        };

        Ok(Directive {
            identifier,
            parameters,
            conditional,
            lines: group.lines,
        })
    }
}

struct RawGroup {
    text: String,
    lines: Vec<usize>,
}

/// Extract every directive from `content`, in document order.
///
/// Zero directives over the whole document is an error; the caller names
/// the document in it.
pub fn extract_directives(
    content: &str,
    filetype: &FileType,
    header_only: bool,
) -> DirectiveResult<Vec<Directive>> {
    let scanner = DirectiveScanner::new(filetype, header_only)?;
    let groups = scanner.assemble(scanner.candidates(content))?;
    groups.into_iter().map(|g| scanner.parse(g)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileType;

    fn tex() -> FileType {
        FileType {
            extension: "tex".to_string(),
            pattern: r"^\s*%+".to_string(),
        }
    }

    fn extract(content: &str) -> DirectiveResult<Vec<Directive>> {
        extract_directives(content, &tex(), false)
    }

    #[test]
    fn test_single_directive() {
        let doc = "% drover: pdflatex\n\\documentclass{article}\n";
        let directives = extract(doc).unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].identifier, "pdflatex");
        assert!(directives[0].parameters.is_empty());
        assert_eq!(directives[0].conditional, Conditional::none());
        assert_eq!(directives[0].lines, vec![1]);
    }

    #[test]
    fn test_directives_preserve_source_order() {
        let doc = "\
% drover: first
text
% drover: second
% drover: third
";
        let directives = extract(doc).unwrap();
        let names: Vec<&str> = directives.iter().map(|d| d.identifier.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_parameter_block() {
        let doc = "% drover: convert: {density: 300, source: figure.pdf}\n";
        let directives = extract(doc).unwrap();
        let params = &directives[0].parameters;
        assert_eq!(
            params.get("density"),
            Some(&serde_yaml::Value::Number(serde_yaml::Number::from(300)))
        );
        assert_eq!(
            params.get("source"),
            Some(&serde_yaml::Value::String("figure.pdf".to_string()))
        );
    }

    #[test]
    fn test_conditional_clause() {
        let doc = "% drover: pdflatex if changed('doc.tex')\n";
        let directives = extract(doc).unwrap();
        let cond = &directives[0].conditional;
        assert_eq!(cond.kind, ConditionalKind::If);
        assert_eq!(cond.expression, "changed('doc.tex')");
    }

    #[test]
    fn test_parameters_and_conditional_together() {
        let doc = "% drover: bibtex: {style: plain} while contains('doc.log', 'Rerun')\n";
        let directives = extract(doc).unwrap();
        let d = &directives[0];
        assert_eq!(d.identifier, "bibtex");
        assert_eq!(
            d.parameters.get("style"),
            Some(&serde_yaml::Value::String("plain".to_string()))
        );
        assert_eq!(d.conditional.kind, ConditionalKind::While);
        assert_eq!(d.conditional.expression, "contains('doc.log', 'Rerun')");
    }

    #[test]
    fn test_continuation_joins_with_single_space() {
        let doc = "\
% drover: convert: {density: 300,
% drover: --> source: figure.pdf}
";
        let directives = extract(doc).unwrap();
        let d = &directives[0];
        assert_eq!(d.identifier, "convert");
        assert_eq!(
            d.parameters.get("source"),
            Some(&serde_yaml::Value::String("figure.pdf".to_string()))
        );
        assert_eq!(d.lines, vec![1, 2]);
    }

    #[test]
    fn test_continuation_without_open_group_fails() {
        let doc = "% drover: --> orphan\n";
        let err = extract(doc).unwrap_err();
        assert!(matches!(err, DirectiveError::OrphanContinuation(1)));
    }

    #[test]
    fn test_grammar_violation_cites_all_lines() {
        let doc = "\
% drover: 9bad: {x: 1,
% drover: --> y: 2}
";
        let err = extract(doc).unwrap_err();
        match err {
            DirectiveError::InvalidFormat { lines, .. } => assert_eq!(lines, vec![1, 2]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_parameter_block_fails() {
        let doc = "% drover: convert: {density: [}\n";
        let err = extract(doc).unwrap_err();
        assert!(matches!(err, DirectiveError::InvalidFormat { .. }));
    }

    #[test]
    fn test_header_only_stops_at_body() {
        let doc = "\
% a plain comment
% drover: first

\\documentclass{article}
% drover: second
";
        let directives = extract_directives(doc, &tex(), true).unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].identifier, "first");
    }

    #[test]
    fn test_full_scan_reads_past_body() {
        let doc = "\
% drover: first
\\documentclass{article}
% drover: second
";
        let directives = extract_directives(doc, &tex(), false).unwrap();
        assert_eq!(directives.len(), 2);
    }

    #[test]
    fn test_hash_comment_filetype() {
        let sh = FileType {
            extension: "sh".to_string(),
            pattern: r"^\s*#".to_string(),
        };
        let doc = "#!/bin/sh\n# drover: shellcheck\necho done\n";
        let directives = extract_directives(doc, &sh, false).unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].identifier, "shellcheck");
        assert_eq!(directives[0].lines, vec![2]);
    }
}
