//! Fluent workflow assembly.
//!
//! `WorkflowBuilder` accumulates task and condition names in `HashSet`s as
//! the caller chains calls (grounded in the teacher's `HashSet`-based
//! `WorkflowDefinition::validate()`), then resolves implicit conditions
//! and runs full structural validation once, in `build()`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::error::BuildError;
use super::task_builder::TaskBuilder;
use crate::model::cancellation::CancellationRegion;
use crate::model::condition::Condition;
use crate::model::flow::{Flow, FlowTarget, Router};
use crate::model::ids::{ConditionName, TaskName, VersionName, WorkflowName};
use crate::model::net::WorkflowNetwork;
use crate::model::task::Task;

pub struct WorkflowBuilder {
    name: WorkflowName,
    start_condition: Option<ConditionName>,
    end_condition: Option<ConditionName>,
    tasks: HashMap<TaskName, Task>,
    task_names: HashSet<TaskName>,
    explicit_conditions: HashSet<ConditionName>,
    task_flows: HashMap<TaskName, (Vec<FlowTarget>, Option<Arc<dyn Router>>)>,
    condition_flows: HashMap<ConditionName, Vec<TaskName>>,
    cancellation_regions: HashMap<TaskName, CancellationRegion>,
    errors: Vec<BuildError>,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<WorkflowName>) -> Self {
        WorkflowBuilder {
            name: name.into(),
            start_condition: None,
            end_condition: None,
            tasks: HashMap::new(),
            task_names: HashSet::new(),
            explicit_conditions: HashSet::new(),
            task_flows: HashMap::new(),
            condition_flows: HashMap::new(),
            cancellation_regions: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn start_condition(mut self, name: impl Into<ConditionName>) -> Self {
        let name = name.into();
        self.explicit_conditions.insert(name.clone());
        self.start_condition = Some(name);
        self
    }

    pub fn end_condition(mut self, name: impl Into<ConditionName>) -> Self {
        let name = name.into();
        self.explicit_conditions.insert(name.clone());
        self.end_condition = Some(name);
        self
    }

    pub fn task(mut self, name: impl Into<TaskName>, builder: TaskBuilder) -> Self {
        let name = name.into();
        if !self.task_names.insert(name.clone()) {
            self.errors.push(BuildError::DuplicateTaskName(name));
            return self;
        }
        match builder.build(name.clone()) {
            Ok(task) => {
                self.tasks.insert(name, task);
            }
            Err(e) => self.errors.push(e),
        }
        self
    }

    pub fn dummy_task(self, name: impl Into<TaskName>) -> Self {
        self.task(name, TaskBuilder::new().dummy())
    }

    /// Declare a task's outbound flow. And-split tasks fire every target;
    /// or/xor-split tasks must also be given a router via
    /// [`WorkflowBuilder::connect_task_with_router`].
    pub fn connect_task(mut self, from: impl Into<TaskName>, targets: Vec<FlowTarget>) -> Self {
        self.task_flows.insert(from.into(), (targets, None));
        self
    }

    pub fn connect_task_with_router(
        mut self,
        from: impl Into<TaskName>,
        targets: Vec<FlowTarget>,
        router: Arc<dyn Router>,
    ) -> Self {
        self.task_flows.insert(from.into(), (targets, Some(router)));
        self
    }

    pub fn connect_condition(mut self, from: impl Into<ConditionName>, targets: Vec<TaskName>) -> Self {
        let from = from.into();
        self.explicit_conditions.insert(from.clone());
        self.condition_flows.insert(from, targets);
        self
    }

    pub fn cancellation_region(
        mut self,
        owner: impl Into<TaskName>,
        tasks: Vec<TaskName>,
        conditions: Vec<ConditionName>,
    ) -> Self {
        let owner = owner.into();
        self.cancellation_regions.insert(
            owner.clone(),
            CancellationRegion {
                owner: Some(owner),
                tasks,
                conditions,
            },
        );
        self
    }

    /// Freeze the definition into an immutable [`WorkflowNetwork`],
    /// resolving implicit conditions for every task→task edge and running
    /// full structural validation.
    pub fn build(mut self, version: impl Into<VersionName>) -> Result<WorkflowNetwork, BuildError> {
        if let Some(e) = self.errors.drain(..).next() {
            return Err(e);
        }
        let start = self.start_condition.clone().ok_or(BuildError::MissingStartCondition)?;
        let end = self.end_condition.clone().ok_or(BuildError::MissingEndCondition)?;

        let task_names = self.task_names;
        let check_task = |name: &TaskName| -> Result<(), BuildError> {
            if task_names.contains(name) {
                Ok(())
            } else {
                Err(BuildError::UnknownTaskReference(name.clone()))
            }
        };

        let mut conditions: HashMap<ConditionName, Condition> = self
            .explicit_conditions
            .iter()
            .map(|name| (name.clone(), Condition::explicit(name.clone())))
            .collect();

        let mut resolved_condition_flows: HashMap<ConditionName, Vec<TaskName>> = self.condition_flows;
        let mut resolved_task_flows: HashMap<TaskName, Flow> = HashMap::new();

        for (from, (targets, router)) in self.task_flows {
            check_task(&from)?;
            // Targets are kept in their original `FlowTarget` shape (not
            // rewritten to `Condition`) so a router sees the same `Task`/
            // `Condition` variants the caller authored — `split_and_credit`
            // maps the chosen target to its landing condition afterwards via
            // `FlowTarget::landing_condition`. The implicit condition and its
            // `FromCondition` flow are still registered here so the network
            // carries a real place for every task→task edge.
            for target in &targets {
                match target {
                    FlowTarget::Condition(c) => {
                        if !conditions.contains_key(c) {
                            return Err(BuildError::UnknownConditionReference(c.clone()));
                        }
                    }
                    FlowTarget::Task(t) => {
                        check_task(t)?;
                        let implicit = ConditionName::implicit(&from, t);
                        conditions
                            .entry(implicit.clone())
                            .or_insert_with(|| Condition::implicit(implicit.clone()));
                        resolved_condition_flows.entry(implicit).or_default().push(t.clone());
                    }
                }
            }
            resolved_task_flows.insert(from, Flow::FromTask { targets, router });
        }

        let mut condition_flows: HashMap<ConditionName, Flow> = HashMap::new();
        for name in conditions.keys() {
            let targets = resolved_condition_flows.remove(name).unwrap_or_default();
            for t in &targets {
                check_task(t)?;
            }
            condition_flows.insert(name.clone(), Flow::FromCondition { targets });
        }

        for region in self.cancellation_regions.values() {
            for t in &region.tasks {
                check_task(t)?;
            }
            for c in &region.conditions {
                if !conditions.contains_key(c) {
                    return Err(BuildError::UnknownConditionReference(c.clone()));
                }
            }
        }

        let network = WorkflowNetwork::new(
            self.name.clone(),
            version.into(),
            self.tasks,
            conditions,
            resolved_task_flows,
            condition_flows,
            start,
            end,
            self.cancellation_regions,
        );

        network
            .validate_structure()
            .map_err(|source| BuildError::Structural { name: network.name.clone(), source })?;

        Ok(network)
    }
}
