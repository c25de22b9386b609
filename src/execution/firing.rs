//! The six-step firing algorithm (`spec.md` §4.5.3) and the enablement
//! recomputation it triggers.
//!
//! No suspension point is allowed inside [`fire_task`] between the debit
//! and the enablement recompute at the end — the whole function is meant
//! to run as one atomic unit under the host transaction, per `spec.md` §5.

use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;

use super::ExecutionContext;
use crate::audit::Attribute;
use crate::error::{EngineError, Result};
use crate::model::flow::{Flow, FlowTarget, RouterContext};
use crate::model::ids::{ConditionName, TaskName};
use crate::model::task::{JoinType, SplitType};
use crate::runtime::{
    ConditionMarkingRecord, TaskInstanceRecord, TaskInstanceState, WorkflowInstanceId, WorkflowInstanceState,
};

use super::lifecycle::{transition_task, transition_workflow};

/// A read-only snapshot of which conditions are marked and which tasks are
/// active (`enabled` or `started`) in a workflow instance, used by the
/// enablement rule and assembled fresh before every recompute.
pub struct MarkingSnapshot {
    pub marked: HashSet<ConditionName>,
    pub active_tasks: HashSet<TaskName>,
}

pub async fn snapshot(ctx: &ExecutionContext<'_>, workflow_id: WorkflowInstanceId) -> Result<MarkingSnapshot> {
    let markings = ctx.storage.scan_markings_by_workflow(workflow_id).await?;
    let marked = markings
        .into_iter()
        .filter(|m| m.is_marked())
        .map(|m| m.condition_name)
        .collect();

    let tasks = ctx.storage.scan_tasks_by_workflow(workflow_id).await?;
    let active_tasks = tasks
        .into_iter()
        .filter(|t| t.state.is_active())
        .map(|t| t.name)
        .collect();

    Ok(MarkingSnapshot { marked, active_tasks })
}

pub(crate) async fn set_marking(ctx: &ExecutionContext<'_>, workflow_id: WorkflowInstanceId, condition: &ConditionName, count: u64) -> Result<()> {
    let before = ctx
        .storage
        .get_marking(workflow_id, condition)
        .await?
        .map(|m| m.count)
        .unwrap_or(0);
    ctx.storage
        .upsert_marking(ConditionMarkingRecord::new(workflow_id, condition.clone(), count))
        .await?;
    ctx.audit.event(
        "condition.marking_changed",
        &[Attribute::Condition {
            name: condition.clone(),
            before,
            after: count,
        }],
    );
    Ok(())
}

/// Credit one token to `condition`.
pub async fn credit(ctx: &ExecutionContext<'_>, workflow_id: WorkflowInstanceId, condition: &ConditionName) -> Result<()> {
    let current = ctx.storage.get_marking(workflow_id, condition).await?.map(|m| m.count).unwrap_or(0);
    set_marking(ctx, workflow_id, condition, current + 1).await
}

/// Debit one token from `condition`. Errors if the condition is not
/// currently marked — callers must only debit conditions already known to
/// be marked (the join-type rule guarantees this for and/xor; for or-join
/// the caller iterates only the marked subset).
async fn debit(ctx: &ExecutionContext<'_>, workflow_id: WorkflowInstanceId, condition: &ConditionName) -> Result<()> {
    let current = ctx.storage.get_marking(workflow_id, condition).await?.map(|m| m.count).unwrap_or(0);
    if current == 0 {
        return Err(EngineError::PreconditionViolated(format!(
            "cannot debit unmarked condition {condition}"
        )));
    }
    set_marking(ctx, workflow_id, condition, current - 1).await
}

/// Debit the inbound conditions consumed when `task` fires, per its join
/// type. Returns the set of conditions actually debited.
async fn debit_inbound(
    ctx: &ExecutionContext<'_>,
    workflow_id: WorkflowInstanceId,
    task: &TaskName,
    marked: &HashSet<ConditionName>,
) -> Result<Vec<ConditionName>> {
    let inbound = ctx.network.inbound_of_task(task);
    let join_type = ctx
        .network
        .get_task(task)
        .ok_or_else(|| EngineError::NotFound(task.to_string()))?
        .join_type;

    let to_debit: Vec<ConditionName> = match join_type {
        JoinType::And => inbound,
        JoinType::Xor => inbound.into_iter().filter(|c| marked.contains(c)).take(1).collect(),
        JoinType::Or => inbound.into_iter().filter(|c| marked.contains(c)).collect(),
    };

    for c in &to_debit {
        debit(ctx, workflow_id, c).await?;
    }
    Ok(to_debit)
}

/// Select the outbound subset for `task`'s split and credit a token to
/// each selected target's landing condition.
async fn split_and_credit(
    ctx: &ExecutionContext<'_>,
    workflow_id: WorkflowInstanceId,
    task: &TaskName,
    completion_payload: &Value,
    marked_before: &HashSet<ConditionName>,
) -> Result<Vec<ConditionName>> {
    let def = ctx.network.get_task(task).ok_or_else(|| EngineError::NotFound(task.to_string()))?;
    let flow = ctx.network.outbound_of_task(task);
    let Some(Flow::FromTask { targets, router }) = flow else {
        return Ok(Vec::new());
    };

    let selected: Vec<FlowTarget> = match def.split_type {
        SplitType::And => targets.clone(),
        SplitType::Or | SplitType::Xor => {
            let router = router.as_ref().ok_or_else(|| EngineError::RouterFailed {
                task: task.to_string(),
                reason: "or/xor-split task has no router configured".to_string(),
            })?;
            let rctx = RouterContext {
                task: task.clone(),
                completion_payload: completion_payload.clone(),
                marked_conditions: marked_before.iter().cloned().collect(),
            };
            let chosen = router.route(&rctx, targets)?;
            if chosen.is_empty() {
                return Err(EngineError::RouterFailed {
                    task: task.to_string(),
                    reason: "router returned an empty selection".to_string(),
                });
            }
            if def.split_type == SplitType::Xor && chosen.len() != 1 {
                return Err(EngineError::RouterFailed {
                    task: task.to_string(),
                    reason: format!("xor-split router returned {} targets, expected 1", chosen.len()),
                });
            }
            chosen
        }
    };

    let mut landed = Vec::with_capacity(selected.len());
    for target in &selected {
        let condition = target.landing_condition(task);
        credit(ctx, workflow_id, &condition).await?;
        landed.push(condition);
    }
    Ok(landed)
}

/// Fire `task`: the six steps of `spec.md` §4.5.3. Called when an atomic
/// task's work item completes, when a dummy task starts, or when a
/// composite task's child workflow completes.
pub async fn fire_task(
    ctx: &ExecutionContext<'_>,
    workflow_id: WorkflowInstanceId,
    task_instance: &TaskInstanceRecord,
    completion_payload: Value,
) -> Result<()> {
    let task = &task_instance.name;
    let before = snapshot(ctx, workflow_id).await?;

    let debited = debit_inbound(ctx, workflow_id, task, &before.marked).await?;
    let credited = split_and_credit(ctx, workflow_id, task, &completion_payload, &before.marked).await?;
    super::cancellation::apply_cancellation_region(ctx, workflow_id, task).await?;

    let mut completed = task_instance.clone();
    transition_task(completed.state, TaskInstanceState::Completed)?;
    completed.state = TaskInstanceState::Completed;
    completed.updated_at = Utc::now();
    ctx.storage.update_task_instance(completed).await?;
    ctx.audit.event(
        "task.completed",
        &[Attribute::Task {
            task_id: task_instance.id,
            name: task.clone(),
            parent_workflow_id: workflow_id,
            from: Some(TaskInstanceState::Started),
            to: TaskInstanceState::Completed,
        }],
    );

    let mut touched: HashSet<ConditionName> = HashSet::new();
    touched.extend(debited);
    touched.extend(credited);
    super::recompute_enablement(ctx, workflow_id, &touched).await?;
    try_complete_workflow(ctx, workflow_id).await?;
    Ok(())
}

/// The workflow instance transitions to `completed` exactly when the end
/// condition is marked and no task is `enabled` or `started`.
pub async fn try_complete_workflow(ctx: &ExecutionContext<'_>, workflow_id: WorkflowInstanceId) -> Result<()> {
    let end_marked = ctx
        .storage
        .get_marking(workflow_id, &ctx.network.end_condition)
        .await?
        .map(|m| m.is_marked())
        .unwrap_or(false);
    if !end_marked {
        return Ok(());
    }
    let tasks = ctx.storage.scan_tasks_by_workflow(workflow_id).await?;
    if tasks.iter().any(|t| t.state.is_active()) {
        return Ok(());
    }
    let Some(mut record) = ctx.storage.get_workflow_instance(workflow_id).await? else {
        return Ok(());
    };
    if record.state.is_terminal() {
        return Ok(());
    }
    transition_workflow(record.state, WorkflowInstanceState::Completed)?;
    record.state = WorkflowInstanceState::Completed;
    record.completed_at = Some(Utc::now());
    ctx.storage.update_workflow_instance(record.clone()).await?;
    ctx.audit.event(
        "workflow.completed",
        &[Attribute::Workflow {
            workflow_id,
            name: record.definition_name,
            version: record.version,
            action: "complete".to_string(),
            state: Some(WorkflowInstanceState::Completed),
        }],
    );
    Ok(())
}
