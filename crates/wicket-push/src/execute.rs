//! Step sequences and the executor that walks them.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;

/// Signal a step returns to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Proceed to the next step.
    Continue,
    /// Halt the sequence immediately; later steps never run.
    Done,
}

/// A single zero-argument unit of envelope processing.
pub type Step = Box<dyn FnOnce(&mut ExecutionContext) -> StepOutcome + Send>;

/// Transient per-message record carried across decoding and execution.
///
/// Collaborators accumulate steps and free-form attributes on it while a
/// message is being processed; it is discarded afterwards.
#[derive(Default)]
pub struct ExecutionContext {
    /// Free-form attributes shared between steps.
    pub attrs: HashMap<String, Value>,
    steps: VecDeque<Step>,
}

impl ExecutionContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step to the end of the sequence.
    pub fn push_step<F>(&mut self, step: F)
    where
        F: FnOnce(&mut ExecutionContext) -> StepOutcome + Send + 'static,
    {
        self.steps.push_back(Box::new(step));
    }

    /// Steps not yet executed.
    pub fn pending_steps(&self) -> usize {
        self.steps.len()
    }
}

/// Walks a step sequence in order until a step returns
/// [`StepOutcome::Done`] or the sequence is exhausted.
///
/// Steps run synchronously in the calling turn; the executor imposes no
/// suspension of its own. A step may append further steps, but anything
/// queued behind a halting step never runs.
pub struct StepExecutor;

impl StepExecutor {
    /// Run the context's queued steps.
    pub fn run(ctx: &mut ExecutionContext) {
        while let Some(step) = ctx.steps.pop_front() {
            if step(ctx) == StepOutcome::Done {
                break;
            }
        }
    }
}
