//! Cancellation-region application and depth-first instance cancellation
//! (`spec.md` §4.5.5).

use chrono::Utc;
use futures::future::BoxFuture;

use super::firing::set_marking;
use super::lifecycle::{transition_task, transition_work_item, transition_workflow};
use super::ExecutionContext;
use crate::audit::Attribute;
use crate::error::{EngineError, Result};
use crate::model::ids::TaskName;
use crate::runtime::{TaskInstanceRecord, TaskInstanceState, WorkItemState, WorkflowInstanceId, WorkflowInstanceState};

/// Cancel every task/condition listed in the cancellation region owned by
/// `owner`, invoked as step 4 of the firing algorithm. A no-op if `owner`
/// owns no region.
pub async fn apply_cancellation_region(
    ctx: &ExecutionContext<'_>,
    workflow_id: WorkflowInstanceId,
    owner: &TaskName,
) -> Result<()> {
    let Some(region) = ctx.network.cancellation_region_owned_by(owner) else {
        return Ok(());
    };
    let region_tasks = region.tasks.clone();
    let region_conditions = region.conditions.clone();

    let instances = ctx.storage.scan_tasks_by_workflow(workflow_id).await?;
    for instance in instances.into_iter().filter(|t| region_tasks.contains(&t.name) && t.state.is_active()) {
        cancel_task_instance(ctx, workflow_id, &instance).await?;
    }

    for condition in &region_conditions {
        let marked = ctx
            .storage
            .get_marking(workflow_id, condition)
            .await?
            .map(|m| m.count)
            .unwrap_or(0);
        if marked > 0 {
            set_marking(ctx, workflow_id, condition, 0).await?;
        }
    }
    Ok(())
}

/// Cancel a single task instance and every active work item under it.
/// Idempotent: cancelling an already-terminal task is a no-op.
pub async fn cancel_task_instance(
    ctx: &ExecutionContext<'_>,
    workflow_id: WorkflowInstanceId,
    instance: &TaskInstanceRecord,
) -> Result<()> {
    if instance.state.is_terminal() {
        return Ok(());
    }

    let work_items = ctx.storage.scan_work_items_by_task(instance.id).await?;
    for item in work_items.into_iter().filter(|w| !w.state.is_terminal()) {
        let mut item = item;
        transition_work_item(item.state, WorkItemState::Cancelled)?;
        let from = item.state;
        item.state = WorkItemState::Cancelled;
        item.updated_at = Utc::now();
        ctx.storage.update_work_item(item.clone()).await?;
        ctx.audit.event(
            "workItem.cancelled",
            &[Attribute::WorkItem {
                work_item_id: item.id,
                action: "cancelWorkItem".to_string(),
                from: Some(from),
                to: WorkItemState::Cancelled,
            }],
        );
    }

    let mut cancelled = instance.clone();
    let from = cancelled.state;
    transition_task(cancelled.state, TaskInstanceState::Cancelled)?;
    cancelled.state = TaskInstanceState::Cancelled;
    cancelled.updated_at = Utc::now();
    ctx.storage.update_task_instance(cancelled.clone()).await?;
    ctx.activities.on_canceled(workflow_id, &instance.name).await?;
    ctx.audit.event(
        "task.cancelled",
        &[Attribute::Task {
            task_id: instance.id,
            name: instance.name.clone(),
            parent_workflow_id: workflow_id,
            from: Some(from),
            to: TaskInstanceState::Cancelled,
        }],
    );
    Ok(())
}

/// Cancel `workflow_id` and every non-terminal descendant, depth-first:
/// child workflows cancel before the parent's own tasks, so `onCanceled`
/// fires children-before-parents as `spec.md` §4.5.5 requires. Idempotent:
/// cancelling an already-terminal workflow is a no-op (testable property 7).
pub fn cancel_workflow<'a>(ctx: &'a ExecutionContext<'a>, workflow_id: WorkflowInstanceId) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let Some(mut record) = ctx.storage.get_workflow_instance(workflow_id).await? else {
            return Err(EngineError::NotFound(workflow_id.to_string()));
        };
        if record.state.is_terminal() {
            return Ok(());
        }

        for child in ctx.storage.scan_workflows_by_parent(workflow_id).await? {
            cancel_workflow(ctx, child.id).await?;
        }

        for task in ctx.storage.scan_tasks_by_workflow(workflow_id).await? {
            if task.state.is_active() {
                cancel_task_instance(ctx, workflow_id, &task).await?;
            }
        }

        for marking in ctx.storage.scan_markings_by_workflow(workflow_id).await? {
            if marking.count > 0 {
                set_marking(ctx, workflow_id, &marking.condition_name, 0).await?;
            }
        }

        transition_workflow(record.state, WorkflowInstanceState::Cancelled)?;
        record.state = WorkflowInstanceState::Cancelled;
        record.completed_at = Some(Utc::now());
        ctx.storage.update_workflow_instance(record.clone()).await?;
        ctx.audit.event(
            "workflow.cancelled",
            &[Attribute::Workflow {
                workflow_id,
                name: record.definition_name.clone(),
                version: record.version.clone(),
                action: "cancelWorkflow".to_string(),
                state: Some(WorkflowInstanceState::Cancelled),
            }],
        );
        Ok(())
    })
}

/// Cancel a work item. If it was the only active work item under its
/// task, the task is cancelled too (`spec.md` §4.5.5: "cancelling a work
/// item cancels its task iff the task has no other active work items").
pub async fn cancel_work_item(
    ctx: &ExecutionContext<'_>,
    workflow_id: WorkflowInstanceId,
    mut item: crate::runtime::WorkItemInstanceRecord,
) -> Result<()> {
    if item.state.is_terminal() {
        return Ok(());
    }
    let from = item.state;
    transition_work_item(item.state, WorkItemState::Cancelled)?;
    item.state = WorkItemState::Cancelled;
    item.updated_at = Utc::now();
    ctx.storage.update_work_item(item.clone()).await?;
    ctx.audit.event(
        "workItem.cancelled",
        &[Attribute::WorkItem {
            work_item_id: item.id,
            action: "cancelWorkItem".to_string(),
            from: Some(from),
            to: WorkItemState::Cancelled,
        }],
    );

    let siblings = ctx.storage.scan_work_items_by_task(item.task_id).await?;
    if siblings.iter().all(|w| w.state.is_terminal()) {
        if let Some(task) = ctx.storage.get_task_instance(item.task_id).await? {
            cancel_task_instance(ctx, workflow_id, &task).await?;
        }
    }
    Ok(())
}
