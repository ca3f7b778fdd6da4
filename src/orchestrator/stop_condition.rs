//! Pluggable stop conditions for the tool loop (§4.2 "Stop evaluation").

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::LlmError;
use crate::types::{Step, Usage};

/// The loop state a [`StopCondition`] is evaluated against.
pub struct StopContext<'a> {
    pub steps: &'a [Step],
    pub accumulated_usage: &'a Usage,
    pub latest_step: &'a Step,
}

/// A predicate over loop state. Returns `Some(reason)` to request the loop
/// stop with that reason, or `None` to let the loop continue (pending other
/// conditions / the normal no-tool-calls exit / MaxSteps).
pub trait StopCondition: Send + Sync {
    fn check(&self, ctx: &StopContext) -> Option<String>;
}

/// Stops once `steps.len() >= n`.
pub struct StepCountIs(pub usize);

impl StopCondition for StepCountIs {
    fn check(&self, ctx: &StopContext) -> Option<String> {
        if ctx.steps.len() >= self.0 {
            Some("step-count-is".to_string())
        } else {
            None
        }
    }
}

/// Stops when the latest step contains a tool-call with this name.
pub struct HasToolCall(pub String);

impl StopCondition for HasToolCall {
    fn check(&self, ctx: &StopContext) -> Option<String> {
        let fired = ctx.latest_step.tool_calls.iter().any(|call| call.tool_name == self.0);
        if fired {
            Some(format!("has-tool-call:{}", self.0))
        } else {
            None
        }
    }
}

/// A caller-defined stop condition. Panics inside `predicate` are caught and
/// surfaced as [`LlmError::StopConditionPanic`] rather than unwinding through
/// the loop.
pub struct CustomStopCondition<F> {
    predicate: F,
}

impl<F> CustomStopCondition<F>
where
    F: Fn(&StopContext) -> Option<String> + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> StopCondition for CustomStopCondition<F>
where
    F: Fn(&StopContext) -> Option<String> + Send + Sync,
{
    fn check(&self, ctx: &StopContext) -> Option<String> {
        (self.predicate)(ctx)
    }
}

/// Evaluate every condition in `conditions`, in order, without
/// short-circuiting, so every condition's side effects (metrics, tracing)
/// run regardless of which one "wins." Returns the first non-empty reason
/// seen, in caller-declared order.
pub fn evaluate_stop_conditions(
    conditions: &[Arc<dyn StopCondition>],
    ctx: &StopContext,
) -> Result<Option<String>, LlmError> {
    let mut winner = None;
    for condition in conditions {
        let outcome = catch_unwind(AssertUnwindSafe(|| condition.check(ctx)))
            .map_err(|_| LlmError::StopConditionPanic("custom stop condition panicked".to_string()))?;
        if winner.is_none() {
            winner = outcome;
        }
    }
    Ok(winner)
}
