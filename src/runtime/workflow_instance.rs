//! Workflow instance runtime record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::WorkflowInstanceId;
use crate::model::ids::{TaskName, VersionName, WorkflowName};

/// `initialized -> started -> (completed | cancelled)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowInstanceState {
    Initialized,
    Started,
    Completed,
    Cancelled,
}

impl WorkflowInstanceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowInstanceState::Completed | WorkflowInstanceState::Cancelled)
    }
}

/// A child workflow instance's link back to the composite task that
/// spawned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub workflow_id: WorkflowInstanceId,
    pub task_name: TaskName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstanceRecord {
    pub id: WorkflowInstanceId,
    pub definition_name: WorkflowName,
    pub version: VersionName,
    pub parent: Option<ParentLink>,
    pub state: WorkflowInstanceState,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowInstanceRecord {
    pub fn new_root(
        definition_name: WorkflowName,
        version: VersionName,
        payload: Value,
        now: DateTime<Utc>,
    ) -> Self {
        WorkflowInstanceRecord {
            id: WorkflowInstanceId::new(),
            definition_name,
            version,
            parent: None,
            state: WorkflowInstanceState::Initialized,
            payload,
            created_at: now,
            completed_at: None,
        }
    }

    pub fn new_child(
        definition_name: WorkflowName,
        version: VersionName,
        parent: ParentLink,
        payload: Value,
        now: DateTime<Utc>,
    ) -> Self {
        WorkflowInstanceRecord {
            id: WorkflowInstanceId::new(),
            definition_name,
            version,
            parent: Some(parent),
            state: WorkflowInstanceState::Initialized,
            payload,
            created_at: now,
            completed_at: None,
        }
    }
}
