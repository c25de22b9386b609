//! Cancellation regions.

use serde::{Deserialize, Serialize};

use super::ids::{ConditionName, TaskName};

/// A cancellation region owned by a task: the set of tasks and conditions
/// reset to idle when the owner fires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancellationRegion {
    pub owner: Option<TaskName>,
    pub tasks: Vec<TaskName>,
    pub conditions: Vec<ConditionName>,
}

impl CancellationRegion {
    pub fn new(owner: TaskName) -> Self {
        CancellationRegion {
            owner: Some(owner),
            tasks: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.conditions.is_empty()
    }
}
