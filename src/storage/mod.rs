//! The storage interface the execution core requires of its host.
//!
//! Mirrors the teacher's `WorkflowStorage` async trait — `async-trait`,
//! `Send + Sync` bound, CRUD-plus-list methods returning `Result<Option<T>>`
//! — generalized from two record kinds (workflows, resources) to the four
//! the definition model needs (workflow instances, task instances,
//! work-item instances, condition markings), with one scan method per
//! secondary index named in the data model.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::ids::{ConditionName, TaskName};
use crate::runtime::{
    ConditionMarkingRecord, TaskInstanceId, TaskInstanceRecord, TaskInstanceState, WorkItemInstanceId,
    WorkItemInstanceRecord, WorkflowInstanceId, WorkflowInstanceRecord,
};

pub use memory::InMemoryStore;

/// Transactional record storage for workflow instances, task instances,
/// work-item instances, and condition markings.
///
/// Every dispatcher operation runs its reads and writes against one
/// implementer, inside whatever host transaction the implementer's
/// concrete type represents; this trait says nothing about transaction
/// boundaries itself (see `spec.md` §4.4 / §5).
#[async_trait]
pub trait WorkflowStorage: Send + Sync {
    async fn insert_workflow_instance(&self, record: WorkflowInstanceRecord) -> Result<WorkflowInstanceRecord>;
    async fn get_workflow_instance(&self, id: WorkflowInstanceId) -> Result<Option<WorkflowInstanceRecord>>;
    async fn update_workflow_instance(&self, record: WorkflowInstanceRecord) -> Result<WorkflowInstanceRecord>;
    /// Index: `(parent)` on workflow instances.
    async fn scan_workflows_by_parent(&self, parent: WorkflowInstanceId) -> Result<Vec<WorkflowInstanceRecord>>;

    async fn insert_task_instance(&self, record: TaskInstanceRecord) -> Result<TaskInstanceRecord>;
    async fn get_task_instance(&self, id: TaskInstanceId) -> Result<Option<TaskInstanceRecord>>;
    async fn update_task_instance(&self, record: TaskInstanceRecord) -> Result<TaskInstanceRecord>;
    /// Index: `(workflowId)` on tasks.
    async fn scan_tasks_by_workflow(&self, workflow_id: WorkflowInstanceId) -> Result<Vec<TaskInstanceRecord>>;
    /// Index: `(workflowId, name, state)` on tasks.
    async fn scan_tasks_by_workflow_name_state(
        &self,
        workflow_id: WorkflowInstanceId,
        name: &TaskName,
        state: TaskInstanceState,
    ) -> Result<Vec<TaskInstanceRecord>>;

    async fn insert_work_item(&self, record: WorkItemInstanceRecord) -> Result<WorkItemInstanceRecord>;
    async fn get_work_item(&self, id: WorkItemInstanceId) -> Result<Option<WorkItemInstanceRecord>>;
    async fn update_work_item(&self, record: WorkItemInstanceRecord) -> Result<WorkItemInstanceRecord>;
    /// Index: `(taskId)` on work items.
    async fn scan_work_items_by_task(&self, task_id: TaskInstanceId) -> Result<Vec<WorkItemInstanceRecord>>;

    async fn upsert_marking(&self, record: ConditionMarkingRecord) -> Result<ConditionMarkingRecord>;
    async fn get_marking(
        &self,
        workflow_id: WorkflowInstanceId,
        condition: &ConditionName,
    ) -> Result<Option<ConditionMarkingRecord>>;
    /// Index: `(workflowId, conditionName)` on markings.
    async fn scan_markings_by_workflow(&self, workflow_id: WorkflowInstanceId) -> Result<Vec<ConditionMarkingRecord>>;
}
