//! The router and activity seams the execution core invokes synchronously
//! under the host transaction.
//!
//! `Router` lives in [`crate::model::flow`] since it's part of a task's
//! definition; this module re-exports it alongside [`Activities`], the
//! lifecycle-callback bundle, grounded in the teacher's `Rule`/
//! `RuleCondition` pattern of small, composable, side-effect-free
//! predicate objects — generalized here from rule evaluation to
//! lifecycle notification.

use async_trait::async_trait;

pub use crate::model::flow::{FnRouter, Router, RouterContext};

use crate::error::Result;
use crate::model::ids::TaskName;
use crate::runtime::WorkflowInstanceId;

/// User-defined callbacks invoked on task lifecycle transitions. Every
/// method has a no-op default so implementers only override what they
/// need.
#[async_trait]
pub trait Activities: Send + Sync {
    async fn on_enabled(&self, _workflow_id: WorkflowInstanceId, _task: &TaskName) -> Result<()> {
        Ok(())
    }

    async fn on_disabled(&self, _workflow_id: WorkflowInstanceId, _task: &TaskName) -> Result<()> {
        Ok(())
    }

    async fn on_canceled(&self, _workflow_id: WorkflowInstanceId, _task: &TaskName) -> Result<()> {
        Ok(())
    }

    async fn on_failed(&self, _workflow_id: WorkflowInstanceId, _task: &TaskName) -> Result<()> {
        Ok(())
    }
}

/// An `Activities` implementation that does nothing, for tests and for
/// workflows with no lifecycle hooks registered.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActivities;

#[async_trait]
impl Activities for NullActivities {}
