//! Conditional evaluation state machine
//!
//! One [`ConditionalState`] lives per task execution. The executor calls
//! [`ConditionalState::advance`] once before the first command pass (the
//! gate, for `if`/`unless`/`while` only) and once after every pass (the
//! loop continuation). `none` and `until` always run their first pass.

use crate::directive::{Conditional, ConditionalKind};
use crate::error::{ExecutionError, ExecutionResult};
use crate::eval::{EvalContext, EvalResult, Evaluator};
use crate::runner::context::RunContext;

/// Loop counter and one-shot flag for one task execution
#[derive(Debug, Default)]
pub struct ConditionalState {
    counter: u32,
    consumed: bool,
}

/// Whether the conditional kind skips the pre-pass gate
pub fn runs_unconditionally(kind: ConditionalKind) -> bool {
    matches!(kind, ConditionalKind::None | ConditionalKind::Until)
}

impl ConditionalState {
    pub fn new() -> Self {
        ConditionalState::default()
    }

    /// Decide whether the (next) command pass should run.
    ///
    /// In dry-run mode the answer is always false: conditionals are
    /// displayed but never drive control flow. `while` stops once the
    /// counter exceeds the ceiling, `until` once it reaches it; the
    /// asymmetry is part of the observable contract.
    pub fn advance(
        &mut self,
        conditional: &Conditional,
        bound: &EvalContext,
        evaluator: &dyn Evaluator,
        ctx: &RunContext,
    ) -> ExecutionResult<bool> {
        if ctx.dry_run {
            return Ok(false);
        }
        match conditional.kind {
            ConditionalKind::None => Ok(false),
            ConditionalKind::If | ConditionalKind::Unless => {
                if self.consumed {
                    return Ok(false);
                }
                self.consumed = true;
                let value = self.eval_bool(&conditional.expression, bound, evaluator)?;
                Ok(if conditional.kind == ConditionalKind::Unless {
                    !value
                } else {
                    value
                })
            }
            ConditionalKind::While => {
                if self.counter > ctx.max_loops {
                    return Ok(false);
                }
                self.counter += 1;
                self.eval_bool(&conditional.expression, bound, evaluator)
            }
            ConditionalKind::Until => {
                if self.counter >= ctx.max_loops {
                    return Ok(false);
                }
                self.counter += 1;
                self.eval_bool(&conditional.expression, bound, evaluator)
                    .map(|value| !value)
            }
        }
    }

    fn eval_bool(
        &self,
        expression: &str,
        bound: &EvalContext,
        evaluator: &dyn Evaluator,
    ) -> ExecutionResult<bool> {
        let result = evaluator.evaluate(expression, bound).map_err(|source| {
            ExecutionError::ConditionalEvaluation {
                expression: expression.to_string(),
                source,
            }
        })?;
        match result {
            EvalResult::Boolean(value) => Ok(value),
            _ => Err(ExecutionError::NonBooleanConditional(
                expression.to_string(),
            )),
        }
    }
}
