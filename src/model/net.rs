//! The frozen, immutable `WorkflowNetwork` — the runtime artifact the
//! execution core operates on. Produced exclusively by
//! `builder::WorkflowBuilder::build()`; nothing outside this module and
//! the builder constructs one directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::cancellation::CancellationRegion;
use super::condition::Condition;
use super::flow::{Flow, FlowTarget};
use super::ids::{ConditionName, TaskName, VersionName, WorkflowName};
use super::task::{JoinType, SplitType, Task, TaskKind};
use crate::error::{EngineError, Result};

/// A workflow definition, frozen after construction.
///
/// Grounded in the teacher's `WorkflowDefinition`: an owned graph plus
/// `validate()`/`find_unreachable_states()`-style structural checks, here
/// expanded from single-place activities to the richer task/condition
/// bipartite graph.
#[derive(Debug)]
pub struct WorkflowNetwork {
    pub name: WorkflowName,
    pub version: VersionName,
    tasks: HashMap<TaskName, Task>,
    conditions: HashMap<ConditionName, Condition>,
    /// Outbound flow from each task (and-split: all targets; or/xor:
    /// router-selected subset at firing time).
    task_flows: HashMap<TaskName, Flow>,
    /// Outbound flow from each condition: the set of tasks it feeds.
    condition_flows: HashMap<ConditionName, Flow>,
    pub start_condition: ConditionName,
    pub end_condition: ConditionName,
    cancellation_regions: HashMap<TaskName, CancellationRegion>,
}

impl WorkflowNetwork {
    pub(crate) fn new(
        name: WorkflowName,
        version: VersionName,
        tasks: HashMap<TaskName, Task>,
        conditions: HashMap<ConditionName, Condition>,
        task_flows: HashMap<TaskName, Flow>,
        condition_flows: HashMap<ConditionName, Flow>,
        start_condition: ConditionName,
        end_condition: ConditionName,
        cancellation_regions: HashMap<TaskName, CancellationRegion>,
    ) -> Self {
        WorkflowNetwork {
            name,
            version,
            tasks,
            conditions,
            task_flows,
            condition_flows,
            start_condition,
            end_condition,
            cancellation_regions,
        }
    }

    pub fn get_task(&self, name: &TaskName) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn get_condition(&self, name: &ConditionName) -> Option<&Condition> {
        self.conditions.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.values()
    }

    /// The name of the synthetic condition for a direct task→task edge.
    pub fn implicit_condition_name(&self, from: &TaskName, to: &TaskName) -> ConditionName {
        ConditionName::implicit(from, to)
    }

    pub fn outbound_of_task(&self, task: &TaskName) -> Option<&Flow> {
        self.task_flows.get(task)
    }

    pub fn outbound_of_condition(&self, condition: &ConditionName) -> Option<&Flow> {
        self.condition_flows.get(condition)
    }

    /// The conditions that, once marked, can enable `task` — the
    /// inbound set `I(t)` the enablement rule iterates over.
    pub fn inbound_of_task(&self, task: &TaskName) -> Vec<ConditionName> {
        self.condition_flows
            .iter()
            .filter_map(|(cond, flow)| match flow {
                Flow::FromCondition { targets } if targets.contains(task) => Some(cond.clone()),
                _ => None,
            })
            .collect()
    }

    /// The tasks whose and/or/xor-split can deliver a token to `condition`.
    /// A target is matched by its landing condition, not its literal
    /// variant — an unresolved `FlowTarget::Task(t)` lands on
    /// `implicit:task->t`, same as a `FlowTarget::Condition` would land on
    /// itself.
    pub fn inbound_of_condition(&self, condition: &ConditionName) -> Vec<TaskName> {
        self.task_flows
            .iter()
            .filter_map(|(task, flow)| match flow {
                Flow::FromTask { targets, .. } if targets.iter().any(|t| &t.landing_condition(task) == condition) => {
                    Some(task.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn cancellation_region_owned_by(&self, task: &TaskName) -> Option<&CancellationRegion> {
        self.cancellation_regions.get(task)
    }

    /// Static structural validation per the data model invariants: every
    /// task has ≥1 inbound and ≥1 outbound flow; the start condition has
    /// only outbound flows; the end condition has only inbound flows; no
    /// dangling references.
    pub fn validate_structure(&self) -> Result<()> {
        for task in self.tasks.values() {
            if self.inbound_of_task(&task.name).is_empty() {
                return Err(EngineError::InvalidDefinition(format!(
                    "task {} has no inbound flow",
                    task.name
                )));
            }
            match self.task_flows.get(&task.name) {
                Some(Flow::FromTask { targets, .. }) if !targets.is_empty() => {}
                _ => {
                    return Err(EngineError::InvalidDefinition(format!(
                        "task {} has no outbound flow",
                        task.name
                    )))
                }
            }
        }

        if !self.inbound_of_condition(&self.start_condition).is_empty() {
            return Err(EngineError::InvalidDefinition(
                "start condition must have no inbound flow".into(),
            ));
        }
        match self.condition_flows.get(&self.start_condition) {
            Some(Flow::FromCondition { targets }) if !targets.is_empty() => {}
            _ => {
                return Err(EngineError::InvalidDefinition(
                    "start condition must have an outbound flow".into(),
                ))
            }
        }

        if self
            .condition_flows
            .get(&self.end_condition)
            .map(|f| matches!(f, Flow::FromCondition { targets } if !targets.is_empty()))
            .unwrap_or(false)
        {
            return Err(EngineError::InvalidDefinition(
                "end condition must have no outbound flow".into(),
            ));
        }
        if self.inbound_of_condition(&self.end_condition).is_empty() {
            return Err(EngineError::InvalidDefinition(
                "end condition must have an inbound flow".into(),
            ));
        }

        self.check_dangling_references()?;
        Ok(())
    }

    fn check_dangling_references(&self) -> Result<()> {
        for (task, flow) in &self.task_flows {
            if !self.tasks.contains_key(task) {
                return Err(EngineError::InvalidDefinition(format!(
                    "outbound flow defined for unknown task {task}"
                )));
            }
            if let Flow::FromTask { targets, .. } = flow {
                for target in targets {
                    match target {
                        FlowTarget::Condition(c) if !self.conditions.contains_key(c) => {
                            return Err(EngineError::InvalidDefinition(format!(
                                "task {task} flows into unknown condition {c}"
                            )))
                        }
                        FlowTarget::Task(t) if !self.tasks.contains_key(t) => {
                            return Err(EngineError::InvalidDefinition(format!(
                                "task {task} flows into unknown task {t}"
                            )))
                        }
                        _ => {}
                    }
                }
            }
        }
        for (condition, flow) in &self.condition_flows {
            if !self.conditions.contains_key(condition) {
                return Err(EngineError::InvalidDefinition(format!(
                    "outbound flow defined for unknown condition {condition}"
                )));
            }
            if let Flow::FromCondition { targets } = flow {
                for task in targets {
                    if !self.tasks.contains_key(task) {
                        return Err(EngineError::InvalidDefinition(format!(
                            "condition {condition} flows into unknown task {task}"
                        )));
                    }
                }
            }
        }
        for region in self.cancellation_regions.values() {
            for t in &region.tasks {
                if !self.tasks.contains_key(t) {
                    return Err(EngineError::InvalidDefinition(format!(
                        "cancellation region references unknown task {t}"
                    )));
                }
            }
            for c in &region.conditions {
                if !self.conditions.contains_key(c) {
                    return Err(EngineError::InvalidDefinition(format!(
                        "cancellation region references unknown condition {c}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Extract a pure, serializable snapshot of this network's structure
    /// for the audit/UI layers and the version manager's metadata
    /// helpers. Calling this twice on the same network yields equal
    /// structures (testable property 10).
    pub fn extract(&self) -> ExtractedWorkflow {
        let mut tasks: Vec<ExtractedTask> = self
            .tasks
            .values()
            .map(|t| ExtractedTask {
                name: t.name.clone(),
                description: t.description.clone(),
                join_type: t.join_type,
                split_type: t.split_type,
                kind: match &t.kind {
                    TaskKind::Atomic(_) => ExtractedTaskKind::Atomic,
                    TaskKind::Composite { child } => ExtractedTaskKind::Composite { child: child.clone() },
                    TaskKind::DynamicComposite { candidates } => ExtractedTaskKind::DynamicComposite {
                        candidates: candidates.iter().map(|c| c.workflow_name.clone()).collect(),
                    },
                    TaskKind::Dummy => ExtractedTaskKind::Dummy,
                },
            })
            .collect();
        tasks.sort_by(|a, b| a.name.cmp(&b.name));

        let mut conditions: Vec<Condition> = self.conditions.values().cloned().collect();
        conditions.sort_by(|a, b| a.name.cmp(&b.name));

        let mut flows: Vec<ExtractedFlow> = Vec::new();
        for (task, flow) in &self.task_flows {
            if let Flow::FromTask { targets, router } = flow {
                flows.push(ExtractedFlow {
                    from: ExtractedEndpoint::Task(task.clone()),
                    targets: targets.clone(),
                    has_router: router.is_some(),
                });
            }
        }
        for (condition, flow) in &self.condition_flows {
            if let Flow::FromCondition { targets } = flow {
                flows.push(ExtractedFlow {
                    from: ExtractedEndpoint::Condition(condition.clone()),
                    targets: targets.iter().cloned().map(FlowTarget::Task).collect(),
                    has_router: false,
                });
            }
        }
        flows.sort_by(|a, b| format!("{:?}", a.from).cmp(&format!("{:?}", b.from)));

        let mut regions: Vec<CancellationRegion> = self.cancellation_regions.values().cloned().collect();
        regions.sort_by(|a, b| format!("{:?}", a.owner).cmp(&format!("{:?}", b.owner)));

        ExtractedWorkflow {
            name: self.name.clone(),
            version: self.version.clone(),
            start_condition: self.start_condition.clone(),
            end_condition: self.end_condition.clone(),
            tasks,
            conditions,
            flows,
            regions,
        }
    }
}

/// A pure, serializable snapshot of [`WorkflowNetwork`]'s structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedWorkflow {
    pub name: WorkflowName,
    pub version: VersionName,
    pub start_condition: ConditionName,
    pub end_condition: ConditionName,
    pub tasks: Vec<ExtractedTask>,
    pub conditions: Vec<Condition>,
    pub flows: Vec<ExtractedFlow>,
    pub regions: Vec<CancellationRegion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTask {
    pub name: TaskName,
    pub description: Option<String>,
    pub join_type: JoinType,
    pub split_type: SplitType,
    pub kind: ExtractedTaskKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtractedTaskKind {
    Atomic,
    Composite { child: WorkflowName },
    DynamicComposite { candidates: Vec<WorkflowName> },
    Dummy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtractedEndpoint {
    Task(TaskName),
    Condition(ConditionName),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFlow {
    pub from: ExtractedEndpoint,
    pub targets: Vec<FlowTarget>,
    pub has_router: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::flow::Flow;
    use crate::model::task::WorkItemDefinition;
    use crate::schema::EmptySchema;
    use std::sync::Arc;

    fn empty_work_item() -> WorkItemDefinition {
        let s: Arc<dyn crate::schema::Schema> = Arc::new(EmptySchema);
        WorkItemDefinition {
            initialize_schema: s.clone(),
            start_schema: s.clone(),
            complete_schema: s.clone(),
            fail_schema: s.clone(),
            reset_schema: s.clone(),
            cancel_schema: s,
        }
    }

    fn linear_network() -> WorkflowNetwork {
        let start = ConditionName::from("start");
        let end = ConditionName::from("end");
        let t1 = TaskName::from("t1");

        let mut tasks = HashMap::new();
        tasks.insert(
            t1.clone(),
            Task {
                name: t1.clone(),
                description: None,
                join_type: JoinType::And,
                split_type: SplitType::And,
                kind: TaskKind::Atomic(empty_work_item()),
                initialize_action: super::super::ids::ActionName::from("initializeWorkItem"),
            },
        );

        let mut conditions = HashMap::new();
        conditions.insert(start.clone(), Condition::explicit(start.clone()));
        conditions.insert(end.clone(), Condition::explicit(end.clone()));

        let mut task_flows = HashMap::new();
        task_flows.insert(
            t1.clone(),
            Flow::FromTask {
                targets: vec![FlowTarget::Condition(end.clone())],
                router: None,
            },
        );

        let mut condition_flows = HashMap::new();
        condition_flows.insert(
            start.clone(),
            Flow::FromCondition { targets: vec![t1.clone()] },
        );
        condition_flows.insert(end.clone(), Flow::FromCondition { targets: vec![] });

        WorkflowNetwork::new(
            WorkflowName::from("linear"),
            VersionName::from("v1"),
            tasks,
            conditions,
            task_flows,
            condition_flows,
            start,
            end,
            HashMap::new(),
        )
    }

    #[test]
    fn validates_a_well_formed_linear_network() {
        let net = linear_network();
        assert!(net.validate_structure().is_ok());
    }

    #[test]
    fn rejects_task_with_no_outbound_flow() {
        let mut net = linear_network();
        net.task_flows.remove(&TaskName::from("t1"));
        let err = net.validate_structure().unwrap_err();
        assert!(matches!(err, EngineError::InvalidDefinition(_)));
    }

    #[test]
    fn extract_is_pure_and_deterministic() {
        let net = linear_network();
        assert_eq!(net.extract(), net.extract());
    }
}
