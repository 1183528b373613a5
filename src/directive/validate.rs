//! Directive validation and task expansion
//!
//! Enforces the reserved-parameter rules and turns each directive into
//! one task per target file, preserving document order.

use std::path::{Path, PathBuf};

use crate::directive::{Directive, ParameterMap, Task};
use crate::error::{DirectiveError, DirectiveResult};

/// Parameter names under exclusive control of the validator
pub const RESERVED_PARAMETERS: &[&str] = &["file", "files", "reference", "item"];

/// Names the user may never set directly (`files` has its own meaning)
const FORBIDDEN_PARAMETERS: &[&str] = &["file", "reference", "item"];

/// Expand directives into tasks bound to concrete files.
///
/// A directive with a `files:` list yields one task per element, in
/// element order, with `file`/`reference` overwritten and `files`
/// removed. A directive without `files` binds to the primary document.
pub fn expand_directives(
    directives: Vec<Directive>,
    primary: &Path,
    base_dir: &Path,
) -> DirectiveResult<Vec<Task>> {
    let mut tasks = Vec::new();
    for directive in directives {
        expand_one(directive, primary, base_dir, &mut tasks)?;
    }
    Ok(tasks)
}

fn expand_one(
    directive: Directive,
    primary: &Path,
    base_dir: &Path,
    out: &mut Vec<Task>,
) -> DirectiveResult<()> {
    for name in FORBIDDEN_PARAMETERS {
        if directive.parameters.contains_key(*name) {
            return Err(DirectiveError::ReservedParameter {
                name: (*name).to_string(),
                lines: directive.lines.clone(),
            });
        }
    }

    let Directive {
        identifier,
        mut parameters,
        conditional,
        lines,
    } = directive;

    match parameters.remove("files") {
        None => {
            let name = primary.display().to_string();
            out.push(make_task(
                identifier,
                parameters,
                conditional,
                lines,
                &name,
                primary,
            ));
        }
        Some(serde_yaml::Value::Sequence(elements)) if !elements.is_empty() => {
            for element in elements {
                let name = match &element {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => scalar_to_string(other).ok_or_else(|| {
                        DirectiveError::InvalidFilesList {
                            lines: lines.clone(),
                        }
                    })?,
                };
                let target = resolve(base_dir, &name);
                out.push(make_task(
                    identifier.clone(),
                    parameters.clone(),
                    conditional.clone(),
                    lines.clone(),
                    &name,
                    &target,
                ));
            }
        }
        Some(_) => {
            return Err(DirectiveError::InvalidFilesList { lines });
        }
    }
    Ok(())
}

fn make_task(
    identifier: String,
    mut parameters: ParameterMap,
    conditional: crate::directive::Conditional,
    lines: Vec<usize>,
    name: &str,
    target: &Path,
) -> Task {
    parameters.insert(
        "file".to_string(),
        serde_yaml::Value::String(name.to_string()),
    );
    parameters.insert(
        "reference".to_string(),
        serde_yaml::Value::String(crate::store::canonical_key(target)),
    );
    Task {
        identifier,
        parameters,
        conditional,
        lines,
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn resolve(base_dir: &Path, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Conditional;
    use std::collections::BTreeMap;

    fn directive(parameters: ParameterMap) -> Directive {
        Directive {
            identifier: "pdflatex".to_string(),
            parameters,
            conditional: Conditional::none(),
            lines: vec![1],
        }
    }

    fn yaml(text: &str) -> serde_yaml::Value {
        serde_yaml::Value::String(text.to_string())
    }

    #[test]
    fn test_directive_without_files_binds_primary() {
        let primary = Path::new("/work/doc.tex");
        let tasks =
            expand_directives(vec![directive(BTreeMap::new())], primary, Path::new("/work"))
                .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].parameters.get("file"), Some(&yaml("/work/doc.tex")));
        assert!(tasks[0].parameters.contains_key("reference"));
    }

    #[test]
    fn test_files_list_expands_in_order() {
        let mut params = BTreeMap::new();
        params.insert(
            "files".to_string(),
            serde_yaml::Value::Sequence(vec![yaml("a.tex"), yaml("b.tex"), yaml("c.tex")]),
        );
        params.insert("density".to_string(), yaml("300"));

        let tasks = expand_directives(
            vec![directive(params)],
            Path::new("/work/doc.tex"),
            Path::new("/work"),
        )
        .unwrap();

        assert_eq!(tasks.len(), 3);
        let names: Vec<_> = tasks
            .iter()
            .map(|t| t.parameters.get("file").unwrap().clone())
            .collect();
        assert_eq!(names, vec![yaml("a.tex"), yaml("b.tex"), yaml("c.tex")]);
        for task in &tasks {
            assert_eq!(task.identifier, "pdflatex");
            assert_eq!(task.parameters.get("density"), Some(&yaml("300")));
            assert!(!task.parameters.contains_key("files"));
            assert!(task.parameters.contains_key("reference"));
        }
    }

    #[test]
    fn test_expanded_tasks_differ_only_in_file_binding() {
        let mut params = BTreeMap::new();
        params.insert(
            "files".to_string(),
            serde_yaml::Value::Sequence(vec![yaml("a.tex"), yaml("b.tex")]),
        );
        params.insert("style".to_string(), yaml("plain"));

        let tasks = expand_directives(
            vec![directive(params)],
            Path::new("/work/doc.tex"),
            Path::new("/work"),
        )
        .unwrap();

        let mut first = tasks[0].parameters.clone();
        let mut second = tasks[1].parameters.clone();
        for map in [&mut first, &mut second] {
            map.remove("file");
            map.remove("reference");
        }
        assert_eq!(first, second);
    }

    #[test]
    fn test_reserved_file_parameter_rejected() {
        let mut params = BTreeMap::new();
        params.insert("file".to_string(), yaml("sneaky.tex"));

        let err = expand_directives(
            vec![directive(params)],
            Path::new("/work/doc.tex"),
            Path::new("/work"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DirectiveError::ReservedParameter { ref name, .. } if name == "file"
        ));
    }

    #[test]
    fn test_reserved_reference_parameter_rejected() {
        let mut params = BTreeMap::new();
        params.insert("reference".to_string(), yaml("sneaky.tex"));

        let err = expand_directives(
            vec![directive(params)],
            Path::new("/work/doc.tex"),
            Path::new("/work"),
        )
        .unwrap_err();
        assert!(matches!(err, DirectiveError::ReservedParameter { .. }));
    }

    #[test]
    fn test_empty_files_list_rejected() {
        let mut params = BTreeMap::new();
        params.insert("files".to_string(), serde_yaml::Value::Sequence(vec![]));

        let err = expand_directives(
            vec![directive(params)],
            Path::new("/work/doc.tex"),
            Path::new("/work"),
        )
        .unwrap_err();
        assert!(matches!(err, DirectiveError::InvalidFilesList { .. }));
    }

    #[test]
    fn test_non_list_files_rejected() {
        let mut params = BTreeMap::new();
        params.insert("files".to_string(), yaml("just-one.tex"));

        let err = expand_directives(
            vec![directive(params)],
            Path::new("/work/doc.tex"),
            Path::new("/work"),
        )
        .unwrap_err();
        assert!(matches!(err, DirectiveError::InvalidFilesList { .. }));
    }

    #[test]
    fn test_document_order_preserved_across_expansion() {
        let mut with_files = BTreeMap::new();
        with_files.insert(
            "files".to_string(),
            serde_yaml::Value::Sequence(vec![yaml("x.tex"), yaml("y.tex")]),
        );

        let first = Directive {
            identifier: "first".to_string(),
            parameters: with_files,
            conditional: Conditional::none(),
            lines: vec![1],
        };
        let second = Directive {
            identifier: "second".to_string(),
            parameters: BTreeMap::new(),
            conditional: Conditional::none(),
            lines: vec![2],
        };

        let tasks = expand_directives(
            vec![first, second],
            Path::new("/work/doc.tex"),
            Path::new("/work"),
        )
        .unwrap();
        let order: Vec<&str> = tasks.iter().map(|t| t.identifier.as_str()).collect();
        assert_eq!(order, vec!["first", "first", "second"]);
    }
}
