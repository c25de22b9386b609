//! Fluent sub-builder for a single task.
//!
//! Mirrors the teacher's `ActivityDefinition::with_rules`/`with_conditions`
//! incremental-constructor style, generalized to the richer
//! atomic/composite/dynamic-composite/dummy task variants.

use super::error::BuildError;
use crate::model::ids::{ActionName, TaskName, WorkflowName};
use crate::model::task::{DynamicCandidate, JoinType, SplitType, Task, TaskKind, WorkItemDefinition};

#[derive(Default)]
pub struct TaskBuilder {
    description: Option<String>,
    join_type: Option<JoinType>,
    split_type: Option<SplitType>,
    kind: Option<TaskKind>,
    initialize_action: Option<ActionName>,
}

impl TaskBuilder {
    pub fn new() -> Self {
        TaskBuilder::default()
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn join(mut self, join_type: JoinType) -> Self {
        self.join_type = Some(join_type);
        self
    }

    pub fn split(mut self, split_type: SplitType) -> Self {
        self.split_type = Some(split_type);
        self
    }

    pub fn initialize_action(mut self, action: impl Into<ActionName>) -> Self {
        self.initialize_action = Some(action.into());
        self
    }

    pub fn atomic(mut self, work_item: WorkItemDefinition) -> Self {
        self.kind = Some(TaskKind::Atomic(work_item));
        self
    }

    pub fn composite(mut self, child: impl Into<WorkflowName>) -> Self {
        self.kind = Some(TaskKind::Composite { child: child.into() });
        self
    }

    pub fn dynamic_composite(mut self, candidates: Vec<WorkflowName>) -> Self {
        self.kind = Some(TaskKind::DynamicComposite {
            candidates: candidates
                .into_iter()
                .map(|workflow_name| DynamicCandidate { workflow_name })
                .collect(),
        });
        self
    }

    pub fn dummy(mut self) -> Self {
        self.kind = Some(TaskKind::Dummy);
        self
    }

    pub(crate) fn build(self, name: TaskName) -> Result<Task, BuildError> {
        let kind = self.kind.ok_or_else(|| BuildError::IncompleteTaskDefinition(name.clone()))?;

        if let TaskKind::DynamicComposite { candidates } = &kind {
            let mut seen = std::collections::HashSet::new();
            for candidate in candidates {
                if !seen.insert(candidate.workflow_name.clone()) {
                    return Err(BuildError::DuplicateCandidateName {
                        task: name.clone(),
                        candidate: candidate.workflow_name.clone(),
                    });
                }
            }
        }

        let default_action = match &kind {
            TaskKind::Atomic(_) => ActionName::from("initializeWorkItem"),
            TaskKind::Composite { .. } | TaskKind::DynamicComposite { .. } => {
                ActionName::from("initializeWorkflow")
            }
            TaskKind::Dummy => ActionName::from("n/a"),
        };

        Ok(Task {
            name,
            description: self.description,
            join_type: self.join_type.unwrap_or(JoinType::And),
            split_type: self.split_type.unwrap_or(SplitType::And),
            kind,
            initialize_action: self.initialize_action.unwrap_or(default_action),
        })
    }
}
