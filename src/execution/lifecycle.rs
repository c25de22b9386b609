//! The three state machines and their legal transition tables.
//!
//! Grounded in the teacher's explicit `CircuitBreakerError::InvalidTransition`
//! pattern: every transition is a `match` arm, illegal pairs fall through
//! to a descriptive `PreconditionViolated`, never a panic.

use crate::error::{EngineError, Result};
use crate::runtime::{TaskInstanceState, WorkItemState, WorkflowInstanceState};

pub fn transition_workflow(from: WorkflowInstanceState, to: WorkflowInstanceState) -> Result<()> {
    use WorkflowInstanceState::*;
    match (from, to) {
        (Initialized, Started) => Ok(()),
        (Initialized, Cancelled) => Ok(()),
        (Started, Completed) => Ok(()),
        (Started, Cancelled) => Ok(()),
        _ => Err(EngineError::PreconditionViolated(format!(
            "workflow cannot transition from {from:?} to {to:?}"
        ))),
    }
}

pub fn transition_task(from: TaskInstanceState, to: TaskInstanceState) -> Result<()> {
    use TaskInstanceState::*;
    match (from, to) {
        (Disabled, Enabled) => Ok(()),
        (Enabled, Disabled) => Ok(()),
        (Enabled, Started) => Ok(()),
        (Enabled, Cancelled) => Ok(()),
        (Started, Completed) => Ok(()),
        (Started, Cancelled) => Ok(()),
        _ => Err(EngineError::PreconditionViolated(format!(
            "task cannot transition from {from:?} to {to:?}"
        ))),
    }
}

pub fn transition_work_item(from: WorkItemState, to: WorkItemState) -> Result<()> {
    use WorkItemState::*;
    match (from, to) {
        (Initialized, Started) => Ok(()),
        (Initialized, Cancelled) => Ok(()),
        (Started, Completed) => Ok(()),
        (Started, Failed) => Ok(()),
        (Started, Cancelled) => Ok(()),
        (Failed, Initialized) => Ok(()),
        _ => Err(EngineError::PreconditionViolated(format!(
            "work item cannot transition from {from:?} to {to:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_item_reset_allowed_only_from_failed() {
        assert!(transition_work_item(WorkItemState::Failed, WorkItemState::Initialized).is_ok());
        assert!(transition_work_item(WorkItemState::Completed, WorkItemState::Initialized).is_err());
    }

    #[test]
    fn workflow_cannot_restart_once_terminal() {
        assert!(transition_workflow(WorkflowInstanceState::Completed, WorkflowInstanceState::Started).is_err());
    }
}
