//! Condition marking runtime record.
//!
//! A marking is logically a map from `(workflowInstance, conditionName)` to
//! a non-negative token count; it is stored as one record per occupied
//! pair rather than a dense map, matching the storage interface's
//! record-plus-index style (grounded in the teacher's per-resource
//! `Resource` records rather than a single blob).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::WorkflowInstanceId;
use crate::model::ids::ConditionName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionMarkingId(pub Uuid);

impl ConditionMarkingId {
    pub fn new() -> Self {
        ConditionMarkingId(Uuid::new_v4())
    }
}

impl Default for ConditionMarkingId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionMarkingRecord {
    pub id: ConditionMarkingId,
    pub workflow_id: WorkflowInstanceId,
    pub condition_name: ConditionName,
    pub count: u64,
}

impl ConditionMarkingRecord {
    pub fn new(workflow_id: WorkflowInstanceId, condition_name: ConditionName, count: u64) -> Self {
        ConditionMarkingRecord {
            id: ConditionMarkingId::new(),
            workflow_id,
            condition_name,
            count,
        }
    }

    pub fn is_marked(&self) -> bool {
        self.count > 0
    }
}
