//! The built-in expression engine
//!
//! Backed by minijinja expressions with a fixed set of capability
//! functions registered by name. The engine is stateless between calls;
//! change-tracking predicates go through the persistent store on every
//! invocation.

use std::fs;
use std::path::{Path, PathBuf};

use minijinja::value::{Object, Value, ValueKind};
use minijinja::{Environment, Error as EngineError, ErrorKind};

use crate::eval::{EvalContext, EvalError, EvalResult, Evaluator, TriggerAction};
use crate::store::ChangeStore;

/// Engine-side wrapper that carries a trigger action through a
/// minijinja value
#[derive(Debug)]
struct TriggerMarker(TriggerAction);

impl Object for TriggerMarker {}

/// The default evaluator: minijinja expressions plus the capability set
#[derive(Debug, Clone)]
pub struct ExpressionEngine {
    base_dir: PathBuf,
    store: ChangeStore,
}

impl ExpressionEngine {
    /// Create an engine resolving relative paths against `base_dir`,
    /// with the change store in the same directory
    pub fn new(base_dir: PathBuf) -> Self {
        let store = ChangeStore::in_dir(&base_dir);
        ExpressionEngine { base_dir, store }
    }

    /// Create an engine with an explicit change store
    pub fn with_store(base_dir: PathBuf, store: ChangeStore) -> Self {
        ExpressionEngine { base_dir, store }
    }

    /// Build the evaluation environment with every capability function
    /// registered. The set is fixed; rules cannot register their own.
    fn environment<'a>(&self) -> Environment<'a> {
        let mut env = Environment::new();

        let base = self.base_dir.clone();
        env.add_function("exists", move |path: String| {
            resolve(&base, &path).exists()
        });

        let base = self.base_dir.clone();
        env.add_function("missing", move |path: String| {
            !resolve(&base, &path).exists()
        });

        let base = self.base_dir.clone();
        let store = self.store.clone();
        env.add_function("changed", move |path: String| -> Result<bool, EngineError> {
            store
                .has_changed(&resolve(&base, &path))
                .map_err(|e| EngineError::new(ErrorKind::InvalidOperation, e.to_string()))
        });

        let base = self.base_dir.clone();
        let store = self.store.clone();
        env.add_function(
            "unchanged",
            move |path: String| -> Result<bool, EngineError> {
                store
                    .has_changed(&resolve(&base, &path))
                    .map(|changed| !changed)
                    .map_err(|e| EngineError::new(ErrorKind::InvalidOperation, e.to_string()))
            },
        );

        let base = self.base_dir.clone();
        env.add_function(
            "contains",
            move |path: String, pattern: String| -> Result<bool, EngineError> {
                let target = resolve(&base, &path);
                if !target.exists() {
                    return Ok(false);
                }
                let re = regex::Regex::new(&pattern)
                    .map_err(|e| EngineError::new(ErrorKind::InvalidOperation, e.to_string()))?;
                let contents = fs::read_to_string(&target)
                    .map_err(|e| EngineError::new(ErrorKind::InvalidOperation, e.to_string()))?;
                Ok(re.is_match(&contents))
            },
        );

        env.add_function("env", |name: String| {
            std::env::var(&name).unwrap_or_default()
        });

        env.add_function("quote", |text: String| shell_quote(&text));

        env.add_function("basename", |path: String| {
            Path::new(&path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(path)
        });

        let base = self.base_dir.clone();
        env.add_function("glob", move |pattern: String| -> Result<Value, EngineError> {
            let full = if Path::new(&pattern).is_absolute() {
                pattern
            } else {
                base.join(&pattern).display().to_string()
            };
            let paths = glob::glob(&full)
                .map_err(|e| EngineError::new(ErrorKind::InvalidOperation, e.to_string()))?;
            let mut matches = Vec::new();
            for entry in paths {
                let path = entry
                    .map_err(|e| EngineError::new(ErrorKind::InvalidOperation, e.to_string()))?;
                matches.push(path.display().to_string());
            }
            matches.sort();
            Ok(Value::from_serialize(&matches))
        });

        env.add_function("halt", || Value::from_object(TriggerMarker(TriggerAction::Halt)));

        env
    }
}

impl Evaluator for ExpressionEngine {
    fn evaluate(&self, expression: &str, context: &EvalContext) -> Result<EvalResult, EvalError> {
        let env = self.environment();
        let compiled = env
            .compile_expression(expression)
            .map_err(|e| EvalError::new(e.to_string()))?;
        let value = compiled
            .eval(Value::from_serialize(context))
            .map_err(|e| EvalError::new(e.to_string()))?;
        convert(value).map_err(|e| EvalError::new(e.to_string()))
    }
}

/// Map an engine value onto the closed result union
fn convert(value: Value) -> Result<EvalResult, EngineError> {
    if let Some(marker) = value.downcast_object_ref::<TriggerMarker>() {
        return Ok(EvalResult::Trigger(marker.0));
    }
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(EvalResult::Null),
        ValueKind::Bool => Ok(EvalResult::Boolean(value.is_true())),
        ValueKind::String => Ok(EvalResult::Text(
            value.as_str().unwrap_or_default().to_string(),
        )),
        ValueKind::Number => Ok(EvalResult::Text(value.to_string())),
        ValueKind::Seq | ValueKind::Iterable => {
            let mut items = Vec::new();
            for item in value.try_iter()? {
                items.push(convert(item)?);
            }
            Ok(EvalResult::List(items))
        }
        other => Err(EngineError::new(
            ErrorKind::InvalidOperation,
            format!("expression produced an unsupported {other} value"),
        )),
    }
}

fn resolve(base: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Quote a string for the POSIX shell
fn shell_quote(text: &str) -> String {
    if text.is_empty() {
        return "''".to_string();
    }
    let safe = text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./=+:@%".contains(c));
    if safe {
        text.to_string()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}
