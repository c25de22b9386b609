//! Work-item instance runtime record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{TaskInstanceId, WorkItemInstanceId};

/// `initialized -> started -> (completed | failed | cancelled)`;
/// `failed` may transition back to `initialized` via reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkItemState {
    Initialized,
    Started,
    Completed,
    Failed,
    Cancelled,
}

impl WorkItemState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkItemState::Completed | WorkItemState::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemInstanceRecord {
    pub id: WorkItemInstanceId,
    pub task_id: TaskInstanceId,
    pub state: WorkItemState,
    /// Opaque metadata attached by user activities at initialize time;
    /// the engine never inspects its contents.
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItemInstanceRecord {
    pub fn new(task_id: TaskInstanceId, metadata: Value, now: DateTime<Utc>) -> Self {
        WorkItemInstanceRecord {
            id: WorkItemInstanceId::new(),
            task_id,
            state: WorkItemState::Initialized,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}
