//! A complete in-memory implementation of [`super::WorkflowStorage`].
//!
//! Grounded directly in the teacher's `InMemoryStorage`: one `RwLock`-guarded
//! `HashMap` per record kind, `.read()`/`.write()` with `.unwrap()` (lock
//! poisoning is not handled, matching the teacher). Not a production
//! storage backend — a reference double this crate's own tests run
//! against, and that downstream integration tests can depend on too.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::WorkflowStorage;
use crate::error::{EngineError, Result};
use crate::model::ids::{ConditionName, TaskName};
use crate::runtime::{
    ConditionMarkingId, ConditionMarkingRecord, TaskInstanceId, TaskInstanceRecord, TaskInstanceState,
    WorkItemInstanceId, WorkItemInstanceRecord, WorkflowInstanceId, WorkflowInstanceRecord,
};

#[derive(Default)]
pub struct InMemoryStore {
    workflows: RwLock<HashMap<WorkflowInstanceId, WorkflowInstanceRecord>>,
    tasks: RwLock<HashMap<TaskInstanceId, TaskInstanceRecord>>,
    work_items: RwLock<HashMap<WorkItemInstanceId, WorkItemInstanceRecord>>,
    markings: RwLock<HashMap<ConditionMarkingId, ConditionMarkingRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }
}

#[async_trait]
impl WorkflowStorage for InMemoryStore {
    async fn insert_workflow_instance(&self, record: WorkflowInstanceRecord) -> Result<WorkflowInstanceRecord> {
        let mut workflows = self.workflows.write().map_err(|_| poison_err("workflows"))?;
        workflows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_workflow_instance(&self, id: WorkflowInstanceId) -> Result<Option<WorkflowInstanceRecord>> {
        let workflows = self.workflows.read().map_err(|_| poison_err("workflows"))?;
        Ok(workflows.get(&id).cloned())
    }

    async fn update_workflow_instance(&self, record: WorkflowInstanceRecord) -> Result<WorkflowInstanceRecord> {
        let mut workflows = self.workflows.write().map_err(|_| poison_err("workflows"))?;
        workflows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn scan_workflows_by_parent(&self, parent: WorkflowInstanceId) -> Result<Vec<WorkflowInstanceRecord>> {
        let workflows = self.workflows.read().map_err(|_| poison_err("workflows"))?;
        Ok(workflows
            .values()
            .filter(|w| w.parent.as_ref().map(|p| p.workflow_id) == Some(parent))
            .cloned()
            .collect())
    }

    async fn insert_task_instance(&self, record: TaskInstanceRecord) -> Result<TaskInstanceRecord> {
        let mut tasks = self.tasks.write().map_err(|_| poison_err("tasks"))?;
        tasks.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_task_instance(&self, id: TaskInstanceId) -> Result<Option<TaskInstanceRecord>> {
        let tasks = self.tasks.read().map_err(|_| poison_err("tasks"))?;
        Ok(tasks.get(&id).cloned())
    }

    async fn update_task_instance(&self, record: TaskInstanceRecord) -> Result<TaskInstanceRecord> {
        let mut tasks = self.tasks.write().map_err(|_| poison_err("tasks"))?;
        tasks.insert(record.id, record.clone());
        Ok(record)
    }

    async fn scan_tasks_by_workflow(&self, workflow_id: WorkflowInstanceId) -> Result<Vec<TaskInstanceRecord>> {
        let tasks = self.tasks.read().map_err(|_| poison_err("tasks"))?;
        Ok(tasks.values().filter(|t| t.workflow_id == workflow_id).cloned().collect())
    }

    async fn scan_tasks_by_workflow_name_state(
        &self,
        workflow_id: WorkflowInstanceId,
        name: &TaskName,
        state: TaskInstanceState,
    ) -> Result<Vec<TaskInstanceRecord>> {
        let tasks = self.tasks.read().map_err(|_| poison_err("tasks"))?;
        Ok(tasks
            .values()
            .filter(|t| t.workflow_id == workflow_id && &t.name == name && t.state == state)
            .cloned()
            .collect())
    }

    async fn insert_work_item(&self, record: WorkItemInstanceRecord) -> Result<WorkItemInstanceRecord> {
        let mut work_items = self.work_items.write().map_err(|_| poison_err("work_items"))?;
        work_items.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_work_item(&self, id: WorkItemInstanceId) -> Result<Option<WorkItemInstanceRecord>> {
        let work_items = self.work_items.read().map_err(|_| poison_err("work_items"))?;
        Ok(work_items.get(&id).cloned())
    }

    async fn update_work_item(&self, record: WorkItemInstanceRecord) -> Result<WorkItemInstanceRecord> {
        let mut work_items = self.work_items.write().map_err(|_| poison_err("work_items"))?;
        work_items.insert(record.id, record.clone());
        Ok(record)
    }

    async fn scan_work_items_by_task(&self, task_id: TaskInstanceId) -> Result<Vec<WorkItemInstanceRecord>> {
        let work_items = self.work_items.read().map_err(|_| poison_err("work_items"))?;
        Ok(work_items.values().filter(|w| w.task_id == task_id).cloned().collect())
    }

    async fn upsert_marking(&self, record: ConditionMarkingRecord) -> Result<ConditionMarkingRecord> {
        let mut markings = self.markings.write().map_err(|_| poison_err("markings"))?;
        if let Some(existing) = markings
            .values_mut()
            .find(|m| m.workflow_id == record.workflow_id && m.condition_name == record.condition_name)
        {
            existing.count = record.count;
            return Ok(existing.clone());
        }
        markings.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_marking(
        &self,
        workflow_id: WorkflowInstanceId,
        condition: &ConditionName,
    ) -> Result<Option<ConditionMarkingRecord>> {
        let markings = self.markings.read().map_err(|_| poison_err("markings"))?;
        Ok(markings
            .values()
            .find(|m| m.workflow_id == workflow_id && &m.condition_name == condition)
            .cloned())
    }

    async fn scan_markings_by_workflow(&self, workflow_id: WorkflowInstanceId) -> Result<Vec<ConditionMarkingRecord>> {
        let markings = self.markings.read().map_err(|_| poison_err("markings"))?;
        Ok(markings.values().filter(|m| m.workflow_id == workflow_id).cloned().collect())
    }
}

fn poison_err(table: &str) -> EngineError {
    EngineError::Storage(anyhow::anyhow!("lock poisoned on in-memory table {table}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn round_trips_a_workflow_instance() {
        let store = InMemoryStore::new();
        let record = WorkflowInstanceRecord::new_root(
            crate::model::ids::WorkflowName::from("doc_review"),
            crate::model::ids::VersionName::from("v1"),
            json!({}),
            chrono::Utc::now(),
        );
        let id = record.id;
        store.insert_workflow_instance(record).await.unwrap();
        let fetched = store.get_workflow_instance(id).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn marking_upsert_replaces_existing_count() {
        let store = InMemoryStore::new();
        let workflow_id = WorkflowInstanceId::new();
        let condition = ConditionName::from("start");
        store
            .upsert_marking(ConditionMarkingRecord::new(workflow_id, condition.clone(), 1))
            .await
            .unwrap();
        store
            .upsert_marking(ConditionMarkingRecord::new(workflow_id, condition.clone(), 0))
            .await
            .unwrap();
        let marking = store.get_marking(workflow_id, &condition).await.unwrap().unwrap();
        assert_eq!(marking.count, 0);

        let all = store.scan_markings_by_workflow(workflow_id).await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
