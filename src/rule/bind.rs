//! Argument binding
//!
//! Maps a task's parameter map onto a rule's declared arguments: unknown
//! keys are rejected, required arguments are checked up front, then the
//! default pass and the flag pass run over the declarations in order.

use crate::directive::{Task, RESERVED_PARAMETERS};
use crate::error::{RuleError, RuleResult};
use crate::eval::{EvalContext, Evaluator};
use crate::rule::types::Rule;

/// Bind `task`'s parameters to `rule`'s arguments.
///
/// The returned context contains `file`, `reference` and every declared
/// argument identifier; it is the expression context for the directive's
/// conditionals, commands and exit checks.
pub fn bind_arguments(
    rule: &Rule,
    task: &Task,
    evaluator: &dyn Evaluator,
) -> RuleResult<EvalContext> {
    reject_unknown_parameters(rule, task)?;

    for argument in &rule.arguments {
        if argument.required && !task.parameters.contains_key(&argument.identifier) {
            return Err(RuleError::MissingRequiredArgument {
                identifier: rule.identifier.clone(),
                argument: argument.identifier.clone(),
            });
        }
    }

    let parameters_value = serde_yaml::to_value(&task.parameters)
        .unwrap_or(serde_yaml::Value::Null);
    let file = task
        .parameters
        .get("file")
        .cloned()
        .unwrap_or(serde_yaml::Value::Null);
    let reference = task
        .parameters
        .get("reference")
        .cloned()
        .unwrap_or(serde_yaml::Value::Null);

    // Default pass: every argument gets a binding, absent defaults bind ""
    let mut bound = EvalContext::new();
    bound.insert("file".to_string(), file.clone());
    bound.insert("reference".to_string(), reference.clone());

    let mut default_context = EvalContext::new();
    default_context.insert("parameters".to_string(), parameters_value.clone());
    default_context.insert("file".to_string(), file.clone());
    default_context.insert("reference".to_string(), reference.clone());

    for argument in &rule.arguments {
        let value = match &argument.default {
            None => serde_yaml::Value::String(String::new()),
            Some(expression) => evaluator
                .evaluate(expression, &default_context)
                .map_err(|source| RuleError::DefaultEvaluation {
                    identifier: rule.identifier.clone(),
                    argument: argument.identifier.clone(),
                    path: rule.path.clone(),
                    source,
                })?
                .into_yaml(),
        };
        bound.insert(argument.identifier.clone(), value);
    }

    // Flag pass: only arguments the directive actually set are rewritten
    for argument in &rule.arguments {
        let Some(raw) = task.parameters.get(&argument.identifier) else {
            continue;
        };
        let Some(expression) = &argument.flag else {
            continue;
        };

        let mut flag_context = bound.clone();
        flag_context.insert("parameters".to_string(), parameters_value.clone());
        flag_context.insert("value".to_string(), raw.clone());

        let value = evaluator
            .evaluate(expression, &flag_context)
            .map_err(|source| RuleError::FlagEvaluation {
                identifier: rule.identifier.clone(),
                argument: argument.identifier.clone(),
                path: rule.path.clone(),
                source,
            })?
            .into_yaml();
        bound.insert(argument.identifier.clone(), value);
    }

    Ok(bound)
}

fn reject_unknown_parameters(rule: &Rule, task: &Task) -> RuleResult<()> {
    let unknown: Vec<String> = task
        .parameters
        .keys()
        .filter(|key| {
            !RESERVED_PARAMETERS.contains(&key.as_str())
                && !rule.arguments.iter().any(|a| &a.identifier == *key)
        })
        .cloned()
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(RuleError::UnknownParameters {
            identifier: rule.identifier.clone(),
            keys: unknown,
        })
    }
}
