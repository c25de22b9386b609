//! Narrow outbound audit handle.
//!
//! Grounded in the teacher's `EventBus` (`emit_resource_created`,
//! `emit_workflow_created`, ... over a `tokio::sync::broadcast` channel),
//! narrowed from the teacher's open `TriggerEvent`/`EventType` enum to the
//! closed, tagged `Attribute` set the audit component calls for. The
//! engine only ever writes through this handle — it never reads spans
//! back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ids::{ConditionName, TaskName, VersionName, WorkflowName};
use crate::runtime::{TaskInstanceId, TaskInstanceState, WorkItemInstanceId, WorkItemState, WorkflowInstanceId, WorkflowInstanceState};

/// A structured attribute attached to a span or a standalone event.
/// Closed and tagged by `type` — the dispatcher never constructs an
/// attribute kind outside this set, and an audit sink may exhaustively
/// match on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Attribute {
    #[serde(rename = "workflow")]
    Workflow {
        workflow_id: WorkflowInstanceId,
        name: WorkflowName,
        version: VersionName,
        action: String,
        state: Option<WorkflowInstanceState>,
    },
    #[serde(rename = "task")]
    Task {
        task_id: TaskInstanceId,
        name: TaskName,
        parent_workflow_id: WorkflowInstanceId,
        from: Option<TaskInstanceState>,
        to: TaskInstanceState,
    },
    #[serde(rename = "workItem")]
    WorkItem {
        work_item_id: WorkItemInstanceId,
        action: String,
        from: Option<WorkItemState>,
        to: WorkItemState,
    },
    #[serde(rename = "condition")]
    Condition {
        name: ConditionName,
        before: u64,
        after: u64,
    },
    #[serde(rename = "activity")]
    Activity {
        name: String,
        phase: ActivityPhase,
    },
    #[serde(rename = "custom")]
    Custom { fields: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityPhase {
    Pre,
    Post,
    Error,
}

/// Opaque handle to an open span, returned by [`AuditHandle::open_span`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(pub uuid::Uuid);

/// The narrow outbound interface the dispatcher writes through.
///
/// Errors raised from an audit handle are non-fatal: the dispatcher logs
/// and drops them rather than aborting the action (`spec.md` §7).
pub trait AuditHandle: Send + Sync {
    fn open_span(&self, name: &str, attrs: &[Attribute]) -> SpanId;
    fn close_span(&self, span: SpanId, attrs: &[Attribute]);
    fn event(&self, name: &str, attrs: &[Attribute]);
}

/// A no-op audit sink, grounded in the teacher always standing up a
/// default `EventBus` even when nothing subscribes to it — dispatcher
/// tests use this so they don't need a real audit backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudit;

impl AuditHandle for NullAudit {
    fn open_span(&self, _name: &str, _attrs: &[Attribute]) -> SpanId {
        SpanId(uuid::Uuid::new_v4())
    }

    fn close_span(&self, _span: SpanId, _attrs: &[Attribute]) {}

    fn event(&self, _name: &str, _attrs: &[Attribute]) {}
}
