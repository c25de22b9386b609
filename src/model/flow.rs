//! Flow (arc) definitions and the router hook-point for OR/XOR splits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ids::{ConditionName, TaskName};
use crate::error::Result;

/// One endpoint of an outbound flow. A task target implicitly carries its
/// own synthesized condition (see [`ConditionName::implicit`]); the builder
/// resolves every `Task` target to its implicit condition before the
/// network is frozen, so the execution core only ever sees
/// [`FlowTarget::Condition`] once [`crate::model::net::WorkflowNetwork`] is
/// built. The raw variant is kept here because it is what the builder
/// layer accepts from callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowTarget {
    Condition(ConditionName),
    Task(TaskName),
}

impl FlowTarget {
    /// The condition a token actually lands on for this target — itself
    /// for a `Condition` target, or the implicit condition preceding a
    /// `Task` target.
    pub fn landing_condition(&self, from: &TaskName) -> ConditionName {
        match self {
            FlowTarget::Condition(c) => c.clone(),
            FlowTarget::Task(t) => ConditionName::implicit(from, t),
        }
    }
}

/// Read-only context handed to a router when an OR/XOR split task fires.
/// Routers must be pure functions of this context: no retained references
/// to transaction objects, no mutation.
#[derive(Debug, Clone)]
pub struct RouterContext {
    pub task: TaskName,
    /// The payload that completed the firing work item (or, for dummy and
    /// composite tasks, the payload that triggered the firing).
    pub completion_payload: serde_json::Value,
    /// Conditions currently marked in the owning workflow instance, as of
    /// just before this firing's debit step. Read-only snapshot.
    pub marked_conditions: Vec<ConditionName>,
}

/// A user-supplied router selecting the outbound subset for an OR/XOR
/// split task. Implementations must be pure with respect to `ctx` and
/// `candidates`; non-determinism (e.g. randomness) is permitted, but the
/// result must not depend on anything outside the context.
pub trait Router: Send + Sync {
    /// Select a non-empty subset of `candidates` (exactly one element for
    /// an XOR split; the engine enforces this after the call returns).
    fn route(&self, ctx: &RouterContext, candidates: &[FlowTarget]) -> Result<Vec<FlowTarget>>;
}

/// A router backed by a plain closure, for the common case of a router
/// with no state of its own.
pub struct FnRouter<F>(pub F)
where
    F: Fn(&RouterContext, &[FlowTarget]) -> Result<Vec<FlowTarget>> + Send + Sync;

impl<F> Router for FnRouter<F>
where
    F: Fn(&RouterContext, &[FlowTarget]) -> Result<Vec<FlowTarget>> + Send + Sync,
{
    fn route(&self, ctx: &RouterContext, candidates: &[FlowTarget]) -> Result<Vec<FlowTarget>> {
        (self.0)(ctx, candidates)
    }
}

/// The outbound flow owned by a task or a condition.
#[derive(Clone)]
pub enum Flow {
    /// A task's outbound flow: and-split fires all targets; or/xor-split
    /// defers target selection to `router`.
    FromTask {
        targets: Vec<FlowTarget>,
        router: Option<Arc<dyn Router>>,
    },
    /// A condition's outbound flow: every marked, enabled consumer may
    /// fire; there is no split semantics on a condition itself.
    FromCondition { targets: Vec<TaskName> },
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flow::FromTask { targets, router } => f
                .debug_struct("FromTask")
                .field("targets", targets)
                .field("has_router", &router.is_some())
                .finish(),
            Flow::FromCondition { targets } => {
                f.debug_struct("FromCondition").field("targets", targets).finish()
            }
        }
    }
}
