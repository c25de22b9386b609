//! The action dispatcher: the ten public operations of `spec.md` §4.6.
//!
//! Grounded in the teacher's `GraphQLServerBuilder` mutation-resolver
//! pattern — validate input, call the engine, persist, return — minus the
//! GraphQL transport the teacher wraps it in, matching the explicit
//! Non-goal against shipping a REST/UI surface. Every operation has a
//! `_public` and an `_internal` entry point with identical logic; `_public`
//! additionally runs the action's registered [`AuthorizationPolicy`]
//! before step (d) of `spec.md` §4.6.
//!
//! **Composite-task completion propagation.** The execution core
//! (`crate::execution`) is deliberately network-agnostic: it only ever
//! touches the one [`WorkflowNetwork`] it was handed. Composite tasks
//! spawn a *different* network's instance as a child, and `spec.md` §4.5.4
//! requires that child's completion surface as the parent task's
//! completion. Since the engine is a library with no scheduler of its own
//! (`spec.md` §1 Non-goals), this dispatcher does not poll for child
//! completion on its own; the caller that holds both the parent and child
//! dispatchers (e.g. an orchestration host or a test) calls
//! [`ActionDispatcher::complete_composite_task`] once it observes the
//! child instance reached a terminal state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::audit::{Attribute, AuditHandle};
use crate::error::{EngineError, Result};
use crate::execution::{self, fire_task, recompute_enablement, transition_task, transition_work_item, ExecutionContext};
use crate::model::ids::{ActionName, WorkflowName};
use crate::model::net::WorkflowNetwork;
use crate::model::task::TaskKind;
use crate::runtime::{
    ParentLink, TaskInstanceId, TaskInstanceState, WorkItemInstanceId, WorkItemInstanceRecord, WorkItemState,
    WorkflowInstanceId, WorkflowInstanceRecord, WorkflowInstanceState,
};
use crate::schema::{validate_payload, Schema};
use crate::storage::WorkflowStorage;

/// Context handed to an [`AuthorizationPolicy`]: the same information the
/// handler itself will act on.
pub struct DispatchContext<'a> {
    pub action: &'a ActionName,
    pub workflow_id: Option<WorkflowInstanceId>,
    pub payload: &'a Value,
}

/// An opaque predicate deciding whether a public dispatcher call may
/// proceed. A denial surfaces as [`EngineError::Forbidden`].
pub trait AuthorizationPolicy: Send + Sync {
    fn authorize(&self, ctx: &DispatchContext) -> Result<()>;
}

/// The default policy for actions with no registered policy: allow.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AuthorizationPolicy for AllowAll {
    fn authorize(&self, _ctx: &DispatchContext) -> Result<()> {
        Ok(())
    }
}

/// Binds one [`WorkflowNetwork`] version to a storage backend, activity
/// callbacks, and an audit sink, and exposes the ten operations of
/// `spec.md` §4.6 over it.
pub struct ActionDispatcher {
    network: Arc<WorkflowNetwork>,
    storage: Arc<dyn WorkflowStorage>,
    activities: Arc<dyn execution::router::Activities>,
    audit: Arc<dyn AuditHandle>,
    action_schemas: HashMap<ActionName, Arc<dyn Schema>>,
    policies: HashMap<ActionName, Arc<dyn AuthorizationPolicy>>,
    /// Child workflow networks reachable from this dispatcher's composite
    /// and dynamic-composite tasks, keyed by workflow name. Must include
    /// every network any task in this workflow (transitively) may spawn.
    children: HashMap<WorkflowName, Arc<WorkflowNetwork>>,
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl ActionDispatcher {
    pub fn new(
        network: Arc<WorkflowNetwork>,
        storage: Arc<dyn WorkflowStorage>,
        activities: Arc<dyn execution::router::Activities>,
        audit: Arc<dyn AuditHandle>,
    ) -> Self {
        ActionDispatcher {
            network,
            storage,
            activities,
            audit,
            action_schemas: HashMap::new(),
            policies: HashMap::new(),
            children: HashMap::new(),
        }
    }

    pub fn with_action_schema(mut self, action: impl Into<ActionName>, schema: Arc<dyn Schema>) -> Self {
        self.action_schemas.insert(action.into(), schema);
        self
    }

    pub fn with_policy(mut self, action: impl Into<ActionName>, policy: Arc<dyn AuthorizationPolicy>) -> Self {
        self.policies.insert(action.into(), policy);
        self
    }

    pub fn with_child(mut self, network: Arc<WorkflowNetwork>) -> Self {
        self.children.insert(network.name.clone(), network);
        self
    }

    pub fn network(&self) -> &WorkflowNetwork {
        &self.network
    }

    fn context(&self) -> ExecutionContext<'_> {
        ExecutionContext {
            network: &self.network,
            storage: self.storage.as_ref(),
            activities: self.activities.as_ref(),
            audit: self.audit.as_ref(),
        }
    }

    fn validate(&self, action: &ActionName, payload: &Value) -> Result<()> {
        match self.action_schemas.get(action) {
            Some(schema) => validate_payload(schema.as_ref(), action.as_str(), payload),
            None => Ok(()),
        }
    }

    fn authorize(&self, action: &ActionName, workflow_id: Option<WorkflowInstanceId>, payload: &Value) -> Result<()> {
        let policy = self.policies.get(action);
        let ctx = DispatchContext { action, workflow_id, payload };
        match policy {
            Some(p) => p.authorize(&ctx),
            None => AllowAll.authorize(&ctx),
        }
    }

    fn child_dispatcher(&self, network: Arc<WorkflowNetwork>) -> ActionDispatcher {
        ActionDispatcher {
            network,
            storage: self.storage.clone(),
            activities: self.activities.clone(),
            audit: self.audit.clone(),
            action_schemas: HashMap::new(),
            policies: HashMap::new(),
            children: self.children.clone(),
        }
    }

    // ---- initializeRootWorkflow ----------------------------------------

    pub async fn initialize_root_workflow_public(&self, payload: Value) -> Result<WorkflowInstanceRecord> {
        let action = ActionName::from("initializeRootWorkflow");
        self.authorize(&action, None, &payload)?;
        self.initialize_root_workflow_internal(payload).await
    }

    pub async fn initialize_root_workflow_internal(&self, payload: Value) -> Result<WorkflowInstanceRecord> {
        let action = ActionName::from("initializeRootWorkflow");
        self.validate(&action, &payload)?;

        let mut record =
            WorkflowInstanceRecord::new_root(self.network.name.clone(), self.network.version.clone(), payload, Utc::now());
        self.storage.insert_workflow_instance(record.clone()).await?;

        let span = self.audit.open_span(
            "initializeRootWorkflow",
            &[Attribute::Workflow {
                workflow_id: record.id,
                name: self.network.name.clone(),
                version: self.network.version.clone(),
                action: action.to_string(),
                state: Some(record.state),
            }],
        );

        let ctx = self.context();
        execution::firing::credit(&ctx, record.id, &self.network.start_condition).await?;
        crate::execution::transition_workflow(record.state, WorkflowInstanceState::Started)?;
        record.state = WorkflowInstanceState::Started;
        self.storage.update_workflow_instance(record.clone()).await?;

        let mut touched = std::collections::HashSet::new();
        touched.insert(self.network.start_condition.clone());
        recompute_enablement(&ctx, record.id, &touched).await?;

        self.audit.close_span(
            span,
            &[Attribute::Workflow {
                workflow_id: record.id,
                name: self.network.name.clone(),
                version: self.network.version.clone(),
                action: action.to_string(),
                state: Some(record.state),
            }],
        );
        Ok(record)
    }

    // ---- cancelRootWorkflow / cancelWorkflow ----------------------------

    pub async fn cancel_root_workflow_public(&self, workflow_id: WorkflowInstanceId, payload: Value) -> Result<()> {
        let action = ActionName::from("cancelRootWorkflow");
        self.authorize(&action, Some(workflow_id), &payload)?;
        self.cancel_root_workflow_internal(workflow_id, payload).await
    }

    pub async fn cancel_root_workflow_internal(&self, workflow_id: WorkflowInstanceId, payload: Value) -> Result<()> {
        self.validate(&ActionName::from("cancelRootWorkflow"), &payload)?;
        let ctx = self.context();
        execution::cancellation::cancel_workflow(&ctx, workflow_id).await
    }

    pub async fn cancel_workflow_public(&self, workflow_id: WorkflowInstanceId, payload: Value) -> Result<()> {
        let action = ActionName::from("cancelWorkflow");
        self.authorize(&action, Some(workflow_id), &payload)?;
        self.cancel_workflow_internal(workflow_id, payload).await
    }

    pub async fn cancel_workflow_internal(&self, workflow_id: WorkflowInstanceId, payload: Value) -> Result<()> {
        self.validate(&ActionName::from("cancelWorkflow"), &payload)?;
        let ctx = self.context();
        execution::cancellation::cancel_workflow(&ctx, workflow_id).await
    }

    // ---- initializeWorkflow (composite / dynamic composite) ------------

    pub async fn initialize_workflow_public(
        &self,
        parent_task_id: TaskInstanceId,
        payload: Value,
    ) -> Result<WorkflowInstanceRecord> {
        let action = ActionName::from("initializeWorkflow");
        self.authorize(&action, None, &payload)?;
        self.initialize_workflow_internal(parent_task_id, payload).await
    }

    pub async fn initialize_workflow_internal(
        &self,
        parent_task_id: TaskInstanceId,
        payload: Value,
    ) -> Result<WorkflowInstanceRecord> {
        self.validate(&ActionName::from("initializeWorkflow"), &payload)?;

        let parent_task = self
            .storage
            .get_task_instance(parent_task_id)
            .await?
            .ok_or_else(|| EngineError::PathNotFound(parent_task_id.to_string()))?;
        let def = self
            .network
            .get_task(&parent_task.name)
            .ok_or_else(|| EngineError::PathNotFound(parent_task.name.to_string()))?;

        if parent_task.state != TaskInstanceState::Enabled {
            return Err(EngineError::PreconditionViolated(format!(
                "task {} is not enabled",
                parent_task.name
            )));
        }

        let child_name = match &def.kind {
            TaskKind::Composite { child } => child.clone(),
            TaskKind::DynamicComposite { candidates } => {
                let requested = payload.get("workflowName").and_then(|v| v.as_str()).ok_or_else(|| {
                    EngineError::InvalidPayload {
                        action: "initializeWorkflow".into(),
                        reason: "payload missing workflowName".into(),
                    }
                })?;
                let name = WorkflowName::from(requested);
                if !candidates.iter().any(|c| c.workflow_name == name) {
                    return Err(EngineError::PathNotFound(format!(
                        "{requested} is not a candidate for task {}",
                        parent_task.name
                    )));
                }
                name
            }
            _ => return Err(EngineError::PathNotFound(format!("task {} is not a composite task", parent_task.name))),
        };

        let child_network = self
            .children
            .get(&child_name)
            .cloned()
            .ok_or_else(|| EngineError::DefinitionNotFound { workflow: child_name.to_string() })?;

        let mut started = parent_task.clone();
        transition_task(started.state, TaskInstanceState::Started)?;
        started.state = TaskInstanceState::Started;
        started.updated_at = Utc::now();
        self.storage.update_task_instance(started).await?;

        let child_record = WorkflowInstanceRecord::new_child(
            child_network.name.clone(),
            child_network.version.clone(),
            ParentLink { workflow_id: parent_task.workflow_id, task_name: parent_task.name.clone() },
            payload,
            Utc::now(),
        );
        self.storage.insert_workflow_instance(child_record.clone()).await?;

        let child_dispatcher = self.child_dispatcher(child_network.clone());
        let child_ctx = child_dispatcher.context();
        execution::firing::credit(&child_ctx, child_record.id, &child_network.start_condition).await?;
        let mut touched = std::collections::HashSet::new();
        touched.insert(child_network.start_condition.clone());
        recompute_enablement(&child_ctx, child_record.id, &touched).await?;

        Ok(child_record)
    }

    /// Called by the orchestration host once a composite task's child
    /// workflow instance has reached a terminal state, surfacing that
    /// completion as the parent task's completion (`spec.md` §4.5.4). A
    /// cancelled child is treated the same as a completed one: the parent
    /// task still completes with whatever payload the child carried.
    pub async fn complete_composite_task(&self, parent_task_id: TaskInstanceId, child_payload: Value) -> Result<()> {
        let task = self
            .storage
            .get_task_instance(parent_task_id)
            .await?
            .ok_or_else(|| EngineError::PathNotFound(parent_task_id.to_string()))?;
        let ctx = self.context();
        fire_task(&ctx, task.workflow_id, &task, child_payload).await
    }

    // ---- initializeWorkItem ---------------------------------------------

    pub async fn initialize_work_item_public(
        &self,
        parent_task_id: TaskInstanceId,
        payload: Value,
    ) -> Result<WorkItemInstanceRecord> {
        let action = ActionName::from("initializeWorkItem");
        self.authorize(&action, None, &payload)?;
        self.initialize_work_item_internal(parent_task_id, payload).await
    }

    pub async fn initialize_work_item_internal(
        &self,
        parent_task_id: TaskInstanceId,
        payload: Value,
    ) -> Result<WorkItemInstanceRecord> {
        self.validate(&ActionName::from("initializeWorkItem"), &payload)?;

        let task = self
            .storage
            .get_task_instance(parent_task_id)
            .await?
            .ok_or_else(|| EngineError::PathNotFound(parent_task_id.to_string()))?;
        if task.state != TaskInstanceState::Enabled {
            return Err(EngineError::PreconditionViolated(format!("task {} is not enabled", task.name)));
        }

        let record = WorkItemInstanceRecord::new(task.id, payload, Utc::now());
        self.storage.insert_work_item(record.clone()).await?;
        self.activities.on_enabled(task.workflow_id, &task.name).await?;
        self.audit.event(
            "workItem.initialized",
            &[Attribute::WorkItem {
                work_item_id: record.id,
                action: "initializeWorkItem".to_string(),
                from: None,
                to: WorkItemState::Initialized,
            }],
        );
        Ok(record)
    }

    // ---- startWorkItem ----------------------------------------------------

    pub async fn start_work_item_public(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<WorkItemInstanceRecord> {
        let action = ActionName::from("startWorkItem");
        self.authorize(&action, None, &payload)?;
        self.start_work_item_internal(work_item_id, payload).await
    }

    pub async fn start_work_item_internal(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<WorkItemInstanceRecord> {
        self.validate(&ActionName::from("startWorkItem"), &payload)?;
        let mut item = self
            .storage
            .get_work_item(work_item_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(work_item_id.to_string()))?;
        transition_work_item(item.state, WorkItemState::Started)?;
        let from = item.state;
        item.state = WorkItemState::Started;
        item.updated_at = Utc::now();
        self.storage.update_work_item(item.clone()).await?;

        if let Some(mut task) = self.storage.get_task_instance(item.task_id).await? {
            // A task may already be `started` from an earlier work item on
            // the same task (or from an earlier start of this same work
            // item, before a fail/reset cycle) — only drive the transition
            // the first time.
            if task.state != TaskInstanceState::Started {
                transition_task(task.state, TaskInstanceState::Started)?;
                task.state = TaskInstanceState::Started;
                task.updated_at = Utc::now();
                self.storage.update_task_instance(task).await?;
            }
        }

        self.audit.event(
            "workItem.started",
            &[Attribute::WorkItem { work_item_id: item.id, action: "startWorkItem".to_string(), from: Some(from), to: WorkItemState::Started }],
        );
        Ok(item)
    }

    // ---- completeWorkItem --------------------------------------------------

    pub async fn complete_work_item_public(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<()> {
        let action = ActionName::from("completeWorkItem");
        self.authorize(&action, None, &payload)?;
        self.complete_work_item_internal(work_item_id, payload).await
    }

    pub async fn complete_work_item_internal(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<()> {
        self.validate(&ActionName::from("completeWorkItem"), &payload)?;
        let mut item = self
            .storage
            .get_work_item(work_item_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(work_item_id.to_string()))?;
        transition_work_item(item.state, WorkItemState::Completed)?;
        let from = item.state;
        item.state = WorkItemState::Completed;
        item.updated_at = Utc::now();
        self.storage.update_work_item(item.clone()).await?;
        self.audit.event(
            "workItem.completed",
            &[Attribute::WorkItem { work_item_id: item.id, action: "completeWorkItem".to_string(), from: Some(from), to: WorkItemState::Completed }],
        );

        let task = self
            .storage
            .get_task_instance(item.task_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(item.task_id.to_string()))?;
        let ctx = self.context();
        fire_task(&ctx, task.workflow_id, &task, payload).await
    }

    // ---- failWorkItem -------------------------------------------------------

    pub async fn fail_work_item_public(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<WorkItemInstanceRecord> {
        let action = ActionName::from("failWorkItem");
        self.authorize(&action, None, &payload)?;
        self.fail_work_item_internal(work_item_id, payload).await
    }

    pub async fn fail_work_item_internal(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<WorkItemInstanceRecord> {
        self.validate(&ActionName::from("failWorkItem"), &payload)?;
        let mut item = self
            .storage
            .get_work_item(work_item_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(work_item_id.to_string()))?;
        transition_work_item(item.state, WorkItemState::Failed)?;
        let from = item.state;
        item.state = WorkItemState::Failed;
        item.updated_at = Utc::now();
        self.storage.update_work_item(item.clone()).await?;

        if let Some(task) = self.storage.get_task_instance(item.task_id).await? {
            self.activities.on_failed(task.workflow_id, &task.name).await?;
        }
        self.audit.event(
            "workItem.failed",
            &[Attribute::WorkItem { work_item_id: item.id, action: "failWorkItem".to_string(), from: Some(from), to: WorkItemState::Failed }],
        );
        Ok(item)
    }

    // ---- resetWorkItem --------------------------------------------------

    pub async fn reset_work_item_public(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<WorkItemInstanceRecord> {
        let action = ActionName::from("resetWorkItem");
        self.authorize(&action, None, &payload)?;
        self.reset_work_item_internal(work_item_id, payload).await
    }

    pub async fn reset_work_item_internal(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<WorkItemInstanceRecord> {
        self.validate(&ActionName::from("resetWorkItem"), &payload)?;
        let mut item = self
            .storage
            .get_work_item(work_item_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(work_item_id.to_string()))?;
        transition_work_item(item.state, WorkItemState::Initialized)?;
        let from = item.state;
        item.state = WorkItemState::Initialized;
        item.updated_at = Utc::now();
        self.storage.update_work_item(item.clone()).await?;
        self.audit.event(
            "workItem.reset",
            &[Attribute::WorkItem { work_item_id: item.id, action: "resetWorkItem".to_string(), from: Some(from), to: WorkItemState::Initialized }],
        );
        Ok(item)
    }

    // ---- cancelWorkItem -------------------------------------------------

    pub async fn cancel_work_item_public(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<()> {
        let action = ActionName::from("cancelWorkItem");
        self.authorize(&action, None, &payload)?;
        self.cancel_work_item_internal(work_item_id, payload).await
    }

    pub async fn cancel_work_item_internal(&self, work_item_id: WorkItemInstanceId, payload: Value) -> Result<()> {
        self.validate(&ActionName::from("cancelWorkItem"), &payload)?;
        let item = self
            .storage
            .get_work_item(work_item_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(work_item_id.to_string()))?;
        let task = self
            .storage
            .get_task_instance(item.task_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(item.task_id.to_string()))?;
        let ctx = self.context();
        execution::cancellation::cancel_work_item(&ctx, task.workflow_id, item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAudit;
    use crate::builder::{TaskBuilder, WorkflowBuilder};
    use crate::execution::NullActivities;
    use crate::model::flow::FlowTarget;
    use crate::model::ids::{ConditionName, TaskName};
    use crate::model::task::WorkItemDefinition;
    use crate::schema::EmptySchema;
    use crate::storage::InMemoryStore;
    use serde_json::json;

    fn atomic() -> TaskBuilder {
        let s: Arc<dyn Schema> = Arc::new(EmptySchema);
        TaskBuilder::new().atomic(WorkItemDefinition {
            initialize_schema: s.clone(),
            start_schema: s.clone(),
            complete_schema: s.clone(),
            fail_schema: s.clone(),
            reset_schema: s.clone(),
            cancel_schema: s,
        })
    }

    fn linear_dispatcher() -> ActionDispatcher {
        let net = WorkflowBuilder::new("linear")
            .start_condition("start")
            .end_condition("end")
            .task("t1", atomic())
            .connect_condition("start", vec![TaskName::from("t1")])
            .connect_task("t1", vec![FlowTarget::Condition(ConditionName::from("end"))])
            .build("v1")
            .unwrap();
        ActionDispatcher::new(
            Arc::new(net),
            Arc::new(InMemoryStore::new()),
            Arc::new(NullActivities),
            Arc::new(NullAudit),
        )
    }

    #[tokio::test]
    async fn full_lifecycle_completes_the_workflow() {
        let dispatcher = linear_dispatcher();
        let workflow = dispatcher.initialize_root_workflow_public(json!({})).await.unwrap();

        let tasks = dispatcher
            .storage
            .scan_tasks_by_workflow(workflow.id)
            .await
            .unwrap();
        let t1 = tasks.into_iter().find(|t| t.name == TaskName::from("t1")).unwrap();

        let item = dispatcher.initialize_work_item_public(t1.id, json!({})).await.unwrap();
        dispatcher.start_work_item_public(item.id, json!({})).await.unwrap();
        dispatcher.complete_work_item_public(item.id, json!({"result": "ok"})).await.unwrap();

        let final_record = dispatcher.storage.get_workflow_instance(workflow.id).await.unwrap().unwrap();
        assert_eq!(final_record.state, WorkflowInstanceState::Completed);
    }

    #[tokio::test]
    async fn fail_then_reset_then_complete_matches_happy_path() {
        let dispatcher = linear_dispatcher();
        let workflow = dispatcher.initialize_root_workflow_public(json!({})).await.unwrap();
        let tasks = dispatcher.storage.scan_tasks_by_workflow(workflow.id).await.unwrap();
        let t1 = tasks.into_iter().find(|t| t.name == TaskName::from("t1")).unwrap();

        let item = dispatcher.initialize_work_item_public(t1.id, json!({})).await.unwrap();
        dispatcher.start_work_item_public(item.id, json!({})).await.unwrap();
        dispatcher.fail_work_item_public(item.id, json!({})).await.unwrap();
        dispatcher.reset_work_item_public(item.id, json!({})).await.unwrap();
        dispatcher.start_work_item_public(item.id, json!({})).await.unwrap();
        dispatcher.complete_work_item_public(item.id, json!({})).await.unwrap();

        let final_record = dispatcher.storage.get_workflow_instance(workflow.id).await.unwrap().unwrap();
        assert_eq!(final_record.state, WorkflowInstanceState::Completed);
    }

    #[tokio::test]
    async fn cancelling_an_already_terminal_workflow_is_idempotent() {
        let dispatcher = linear_dispatcher();
        let workflow = dispatcher.initialize_root_workflow_public(json!({})).await.unwrap();
        dispatcher.cancel_root_workflow_public(workflow.id, json!({})).await.unwrap();
        dispatcher.cancel_root_workflow_public(workflow.id, json!({})).await.unwrap();
    }
}
