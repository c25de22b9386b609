//! The execution core: enablement, firing, cancellation, and the
//! router/activity seams user code plugs into.

pub mod cancellation;
pub mod enablement;
pub mod firing;
pub mod lifecycle;
pub mod router;

use std::collections::HashSet;

use chrono::Utc;

use crate::audit::{Attribute, AuditHandle};
use crate::error::Result;
use crate::model::ids::ConditionName;
use crate::model::net::WorkflowNetwork;
use crate::runtime::{TaskInstanceRecord, TaskInstanceState, WorkflowInstanceId};
use crate::storage::WorkflowStorage;
use router::Activities;

pub use enablement::{is_enabled, OR_JOIN_RULE_NAME};
pub use firing::{fire_task, try_complete_workflow, MarkingSnapshot};
pub use lifecycle::{transition_task, transition_work_item, transition_workflow};
pub use router::{FnRouter, NullActivities, Router, RouterContext};

/// Everything the execution core needs to advance one workflow instance:
/// the frozen definition, the storage backend, the user's activity
/// callbacks, and the audit sink. Borrowed fresh for the duration of one
/// dispatcher operation.
pub struct ExecutionContext<'a> {
    pub network: &'a WorkflowNetwork,
    pub storage: &'a dyn WorkflowStorage,
    pub activities: &'a dyn Activities,
    pub audit: &'a dyn AuditHandle,
}

/// Re-run enablement for every task whose inbound set intersects
/// `touched`, per step 6 of the firing algorithm. Dummy tasks that become
/// newly enabled fire immediately, since they own no work item to wait on.
pub async fn recompute_enablement(
    ctx: &ExecutionContext<'_>,
    workflow_id: WorkflowInstanceId,
    touched: &HashSet<ConditionName>,
) -> Result<()> {
    let snap = firing::snapshot(ctx, workflow_id).await?;

    let candidates: Vec<_> = ctx
        .network
        .tasks()
        .filter(|t| ctx.network.inbound_of_task(&t.name).iter().any(|c| touched.contains(c)))
        .collect();

    for task in candidates {
        let should_enable = enablement::is_enabled(ctx.network, &task.name, &snap.marked, &snap.active_tasks);

        let enabled_instance = ctx
            .storage
            .scan_tasks_by_workflow_name_state(workflow_id, &task.name, TaskInstanceState::Enabled)
            .await?
            .into_iter()
            .next();
        let started_instance = ctx
            .storage
            .scan_tasks_by_workflow_name_state(workflow_id, &task.name, TaskInstanceState::Started)
            .await?
            .into_iter()
            .next();

        if should_enable && enabled_instance.is_none() && started_instance.is_none() {
            let record = TaskInstanceRecord::new_enabled(workflow_id, task.name.clone(), Utc::now());
            ctx.storage.insert_task_instance(record.clone()).await?;
            ctx.activities.on_enabled(workflow_id, &task.name).await?;
            ctx.audit.event(
                "task.enabled",
                &[Attribute::Task {
                    task_id: record.id,
                    name: task.name.clone(),
                    parent_workflow_id: workflow_id,
                    from: Some(TaskInstanceState::Disabled),
                    to: TaskInstanceState::Enabled,
                }],
            );

            if task.is_dummy() {
                let mut started = record.clone();
                transition_task(started.state, TaskInstanceState::Started)?;
                started.state = TaskInstanceState::Started;
                started.updated_at = Utc::now();
                ctx.storage.update_task_instance(started.clone()).await?;
                Box::pin(fire_task(ctx, workflow_id, &started, serde_json::Value::Null)).await?;
            }
        } else if !should_enable {
            if let Some(mut instance) = enabled_instance {
                transition_task(instance.state, TaskInstanceState::Disabled)?;
                instance.state = TaskInstanceState::Disabled;
                instance.updated_at = Utc::now();
                ctx.storage.update_task_instance(instance).await?;
                ctx.activities.on_disabled(workflow_id, &task.name).await?;
            }
        }
    }
    Ok(())
}
