//! Task (transition) definitions.
//!
//! A task is a single struct with a tagged [`TaskKind`] rather than a class
//! hierarchy of Atomic/Composite/DynamicComposite/Dummy types — polymorphism
//! lives on the tag, matched in the execution core, instead of in virtual
//! dispatch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ids::{ActionName, TaskName, WorkflowName};
use crate::schema::Schema;

/// Join semantics: how a task consumes tokens from its inbound conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    /// All inbound conditions must be marked.
    And,
    /// At least one inbound condition is marked, and no concurrently
    /// enabled upstream firing can still deliver a token to an unmarked
    /// inbound condition (see `execution::enablement`).
    Or,
    /// Exactly one inbound condition is marked.
    Xor,
}

/// Split semantics: how a task produces tokens on its outbound targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitType {
    /// All outbound targets receive a token.
    And,
    /// The task's router selects a non-empty subset of outbound targets.
    Or,
    /// The task's router selects exactly one outbound target.
    Xor,
}

/// The work-item definition owned by an atomic task: the schemas its
/// lifecycle actions validate payloads against.
#[derive(Clone)]
pub struct WorkItemDefinition {
    pub initialize_schema: Arc<dyn Schema>,
    pub start_schema: Arc<dyn Schema>,
    pub complete_schema: Arc<dyn Schema>,
    pub fail_schema: Arc<dyn Schema>,
    pub reset_schema: Arc<dyn Schema>,
    pub cancel_schema: Arc<dyn Schema>,
}

impl std::fmt::Debug for WorkItemDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItemDefinition").finish_non_exhaustive()
    }
}

/// A candidate child workflow for a dynamic composite task, keyed by the
/// `workflowName` the caller supplies at `initializeWorkflow` time.
#[derive(Debug, Clone)]
pub struct DynamicCandidate {
    pub workflow_name: WorkflowName,
}

/// The variant-specific payload of a [`Task`].
#[derive(Clone)]
pub enum TaskKind {
    /// Owns a work item; a human or system actor drives its lifecycle
    /// through the action dispatcher.
    Atomic(WorkItemDefinition),
    /// Owns a single child workflow, instantiated fresh on every firing.
    Composite { child: WorkflowName },
    /// Owns a set of candidate child workflows; the caller selects one by
    /// name at `initializeWorkflow` time. Candidate names must be unique —
    /// enforced at build time (see `spec.md` §9 Open Question (b)).
    DynamicComposite { candidates: Vec<DynamicCandidate> },
    /// No work item, no sub-workflow — purely structural, used for
    /// implicit joins and routing fan-in/fan-out points.
    Dummy,
}

impl std::fmt::Debug for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Atomic(_) => f.write_str("Atomic"),
            TaskKind::Composite { child } => f.debug_struct("Composite").field("child", child).finish(),
            TaskKind::DynamicComposite { candidates } => f
                .debug_struct("DynamicComposite")
                .field("candidates", candidates)
                .finish(),
            TaskKind::Dummy => f.write_str("Dummy"),
        }
    }
}

/// A task (transition) in a workflow definition.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: TaskName,
    pub description: Option<String>,
    pub join_type: JoinType,
    pub split_type: SplitType,
    pub kind: TaskKind,
    /// The action bound to this task's `initializeWorkItem` /
    /// `initializeWorkflow` operation, used to look up the payload schema
    /// in the version's action registry.
    pub initialize_action: ActionName,
}

impl Task {
    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, TaskKind::Atomic(_))
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, TaskKind::Composite { .. } | TaskKind::DynamicComposite { .. })
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self.kind, TaskKind::Dummy)
    }

    pub fn work_item_definition(&self) -> Option<&WorkItemDefinition> {
        match &self.kind {
            TaskKind::Atomic(def) => Some(def),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EmptySchema;

    fn work_item_def() -> WorkItemDefinition {
        let empty: Arc<dyn Schema> = Arc::new(EmptySchema);
        WorkItemDefinition {
            initialize_schema: empty.clone(),
            start_schema: empty.clone(),
            complete_schema: empty.clone(),
            fail_schema: empty.clone(),
            reset_schema: empty.clone(),
            cancel_schema: empty,
        }
    }

    #[test]
    fn task_kind_predicates() {
        let atomic = Task {
            name: TaskName::from("t1"),
            description: None,
            join_type: JoinType::And,
            split_type: SplitType::And,
            kind: TaskKind::Atomic(work_item_def()),
            initialize_action: ActionName::from("initializeWorkItem"),
        };
        assert!(atomic.is_atomic());
        assert!(!atomic.is_composite());
        assert!(atomic.work_item_definition().is_some());

        let dummy = Task {
            name: TaskName::from("d1"),
            description: None,
            join_type: JoinType::And,
            split_type: SplitType::And,
            kind: TaskKind::Dummy,
            initialize_action: ActionName::from("n/a"),
        };
        assert!(dummy.is_dummy());
        assert!(dummy.work_item_definition().is_none());
    }
}
