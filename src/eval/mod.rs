//! Expression evaluation seam
//!
//! Rule commands, defaults, flags, conditionals and exit checks are all
//! strings evaluated against a string-keyed context. The engine behind
//! them is injected through the [`Evaluator`] trait, so the rest of the
//! crate depends only on the context contract and the closed result
//! union, never on the engine's grammar.

pub mod engine;

use std::collections::BTreeMap;

use thiserror::Error;

pub use engine::ExpressionEngine;

/// The context handed to every evaluation: bound arguments, reserved
/// bindings and whatever extras the call site seeds (`parameters`,
/// `value`, ...)
pub type EvalContext = BTreeMap<String, serde_yaml::Value>;

/// Evaluation failure inside an expression
#[derive(Error, Debug)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        EvalError {
            message: message.into(),
        }
    }
}

/// A non-process side effect requested from an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Stop the whole run after the current element
    Halt,
}

/// The closed union of values an expression can produce
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    /// Null or undefined
    Null,

    /// A boolean, the only acceptable result for conditionals and exit
    /// expressions
    Boolean(bool),

    /// A textual scalar; a command line when consumed by the executor
    Text(String),

    /// A list of results, flattened before execution
    List(Vec<EvalResult>),

    /// A trigger action such as `halt()`
    Trigger(TriggerAction),
}

/// One element of a flattened command expression
#[derive(Debug, Clone, PartialEq)]
pub enum CommandElement {
    /// A command line to hand to the interpreter
    Run(String),

    /// A trigger side effect, never spawned
    Trigger(TriggerAction),
}

impl EvalResult {
    /// Flatten a command-expression result into executable elements.
    ///
    /// Lists flatten recursively; `Null` anywhere is an error reported by
    /// the caller; booleans degrade to their textual form.
    pub fn flatten(self) -> Option<Vec<CommandElement>> {
        let mut elements = Vec::new();
        if self.flatten_into(&mut elements) {
            Some(elements)
        } else {
            None
        }
    }

    fn flatten_into(self, out: &mut Vec<CommandElement>) -> bool {
        match self {
            EvalResult::Null => false,
            EvalResult::Boolean(b) => {
                out.push(CommandElement::Run(b.to_string()));
                true
            }
            EvalResult::Text(s) => {
                out.push(CommandElement::Run(s));
                true
            }
            EvalResult::Trigger(t) => {
                out.push(CommandElement::Trigger(t));
                true
            }
            EvalResult::List(items) => items.into_iter().all(|item| item.flatten_into(out)),
        }
    }

    /// Convert to a context value for argument binding
    pub fn into_yaml(self) -> serde_yaml::Value {
        match self {
            EvalResult::Null => serde_yaml::Value::Null,
            EvalResult::Boolean(b) => serde_yaml::Value::Bool(b),
            EvalResult::Text(s) => serde_yaml::Value::String(s),
            EvalResult::List(items) => {
                serde_yaml::Value::Sequence(items.into_iter().map(EvalResult::into_yaml).collect())
            }
            EvalResult::Trigger(TriggerAction::Halt) => {
                serde_yaml::Value::String("halt".to_string())
            }
        }
    }
}

/// The injected expression engine
pub trait Evaluator {
    /// Evaluate `expression` against `context`, producing a typed result
    fn evaluate(
        &self,
        expression: &str,
        context: &EvalContext,
    ) -> std::result::Result<EvalResult, EvalError>;
}
