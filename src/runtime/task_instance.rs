//! Task instance runtime record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TaskInstanceId, WorkflowInstanceId};
use crate::model::ids::TaskName;

/// `disabled -> enabled -> started -> (completed | cancelled)`, with
/// `enabled -> disabled` if inputs become insufficient before firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskInstanceState {
    Disabled,
    Enabled,
    Started,
    Completed,
    Cancelled,
}

impl TaskInstanceState {
    pub fn is_active(self) -> bool {
        matches!(self, TaskInstanceState::Enabled | TaskInstanceState::Started)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskInstanceState::Completed | TaskInstanceState::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInstanceRecord {
    pub id: TaskInstanceId,
    pub workflow_id: WorkflowInstanceId,
    pub name: TaskName,
    pub state: TaskInstanceState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskInstanceRecord {
    pub fn new_enabled(workflow_id: WorkflowInstanceId, name: TaskName, now: DateTime<Utc>) -> Self {
        TaskInstanceRecord {
            id: TaskInstanceId::new(),
            workflow_id,
            name,
            state: TaskInstanceState::Enabled,
            created_at: now,
            updated_at: now,
        }
    }
}
