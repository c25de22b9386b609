//! End-to-end scenarios driven through [`ActionDispatcher`], one per
//! concrete case in the definition's testable-properties list, plus a
//! handful of the universal invariants that don't already have a
//! dedicated unit test closer to the code they exercise.

use std::sync::Arc;

use serde_json::{json, Value};
use tasquencer::{
    ActionDispatcher, EmptySchema, FlowTarget, FnRouter, NullActivities, NullAudit, RouterContext, Schema, SplitType,
    TaskBuilder, TaskInstanceState, TaskName, WorkItemDefinition, WorkItemState, WorkflowBuilder, WorkflowInstanceState,
    WorkflowName, WorkflowStorage,
};
use tasquencer::{ConditionName, InMemoryStore};

fn open_work_item() -> WorkItemDefinition {
    let s: Arc<dyn Schema> = Arc::new(EmptySchema);
    WorkItemDefinition {
        initialize_schema: s.clone(),
        start_schema: s.clone(),
        complete_schema: s.clone(),
        fail_schema: s.clone(),
        reset_schema: s.clone(),
        cancel_schema: s,
    }
}

fn atomic() -> TaskBuilder {
    TaskBuilder::new().atomic(open_work_item())
}

fn dispatcher_for(net: tasquencer::WorkflowNetwork) -> (ActionDispatcher, Arc<InMemoryStore>) {
    let storage = Arc::new(InMemoryStore::new());
    let dispatcher = ActionDispatcher::new(Arc::new(net), storage.clone(), Arc::new(NullActivities), Arc::new(NullAudit));
    (dispatcher, storage)
}

async fn enabled_task(storage: &InMemoryStore, workflow_id: tasquencer::WorkflowInstanceId, name: &str) -> tasquencer::TaskInstanceRecord {
    storage
        .scan_tasks_by_workflow(workflow_id)
        .await
        .unwrap()
        .into_iter()
        .find(|t| t.name == TaskName::from(name) && t.state == TaskInstanceState::Enabled)
        .unwrap_or_else(|| panic!("task '{name}' is not enabled"))
}

async fn drive(dispatcher: &ActionDispatcher, storage: &InMemoryStore, workflow_id: tasquencer::WorkflowInstanceId, name: &str, completion: Value) {
    let task = enabled_task(storage, workflow_id, name).await;
    let item = dispatcher.initialize_work_item_public(task.id, Value::Null).await.unwrap();
    dispatcher.start_work_item_public(item.id, Value::Null).await.unwrap();
    dispatcher.complete_work_item_public(item.id, completion).await.unwrap();
}

// ---- S1: AND-split / AND-join ------------------------------------------

/// `start -> t1 (and-split) -> {t2, t3} -> t4 (and-join, via implicit
/// conditions) -> end`. Completing only `t2` must not enable `t4`;
/// completing `t3` too must.
#[tokio::test]
async fn and_split_and_join_waits_for_every_branch() {
    let net = WorkflowBuilder::new("and_join")
        .start_condition("start")
        .end_condition("end")
        .task("t1", atomic())
        .task("t2", atomic())
        .task("t3", atomic())
        .task("t4", atomic())
        .connect_condition("start", vec![TaskName::from("t1")])
        .connect_task("t1", vec![FlowTarget::Task(TaskName::from("t2")), FlowTarget::Task(TaskName::from("t3"))])
        .connect_task("t2", vec![FlowTarget::Task(TaskName::from("t4"))])
        .connect_task("t3", vec![FlowTarget::Task(TaskName::from("t4"))])
        .connect_task("t4", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .build("v1")
        .unwrap();
    let (dispatcher, storage) = dispatcher_for(net);
    let workflow = dispatcher.initialize_root_workflow_public(Value::Null).await.unwrap();

    drive(&dispatcher, &storage, workflow.id, "t1", Value::Null).await;
    drive(&dispatcher, &storage, workflow.id, "t2", Value::Null).await;

    // t3's branch hasn't fed its half of t4's implicit and-join yet.
    let tasks = storage.scan_tasks_by_workflow(workflow.id).await.unwrap();
    assert!(tasks.iter().find(|t| t.name == TaskName::from("t4")).is_none());

    drive(&dispatcher, &storage, workflow.id, "t3", Value::Null).await;
    drive(&dispatcher, &storage, workflow.id, "t4", Value::Null).await;

    let record = storage.get_workflow_instance(workflow.id).await.unwrap().unwrap();
    assert_eq!(record.state, WorkflowInstanceState::Completed);

    // No task instance is left enabled or started once the workflow is terminal.
    let tasks = storage.scan_tasks_by_workflow(workflow.id).await.unwrap();
    assert!(tasks.iter().all(|t| t.state.is_terminal()));
}

// ---- S2: XOR-split router -----------------------------------------------

/// A router keyed on the completing work item's payload picks exactly one
/// branch; the branch not taken never gets a task instance at all.
#[tokio::test]
async fn xor_split_router_picks_one_branch_the_other_is_never_created() {
    let router = Arc::new(FnRouter(|ctx: &RouterContext, candidates: &[FlowTarget]| {
        let path = ctx.completion_payload.get("path").and_then(Value::as_str).unwrap_or("b");
        Ok(candidates
            .iter()
            .filter(|t| matches!(t, FlowTarget::Task(name) if name.as_str() == path))
            .cloned()
            .collect())
    }));

    let net = WorkflowBuilder::new("xor_split")
        .start_condition("start")
        .end_condition("end")
        .task("t1", atomic().split(SplitType::Xor))
        .task("a", atomic())
        .task("b", atomic())
        .connect_condition("start", vec![TaskName::from("t1")])
        .connect_task_with_router("t1", vec![FlowTarget::Task(TaskName::from("a")), FlowTarget::Task(TaskName::from("b"))], router)
        .connect_task("a", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .connect_task("b", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .build("v1")
        .unwrap();
    let (dispatcher, storage) = dispatcher_for(net);
    let workflow = dispatcher.initialize_root_workflow_public(Value::Null).await.unwrap();

    drive(&dispatcher, &storage, workflow.id, "t1", json!({"path": "a"})).await;

    let tasks = storage.scan_tasks_by_workflow(workflow.id).await.unwrap();
    assert!(tasks.iter().any(|t| t.name == TaskName::from("a")));
    assert!(tasks.iter().all(|t| t.name != TaskName::from("b")), "the branch not routed to must never get a task instance");

    drive(&dispatcher, &storage, workflow.id, "a", Value::Null).await;
    let record = storage.get_workflow_instance(workflow.id).await.unwrap().unwrap();
    assert_eq!(record.state, WorkflowInstanceState::Completed);
}

// ---- S3: cancellation region ---------------------------------------------

/// Two tasks enabled off the same condition; firing one cancels the
/// other via a cancellation region it owns, without the cancelled task
/// ever attempting to debit the already-consumed shared condition.
#[tokio::test]
async fn cancellation_region_cancels_the_sibling_branch() {
    let net = WorkflowBuilder::new("cancel_region")
        .start_condition("start")
        .end_condition("end")
        .task("a", atomic())
        .task("b", atomic())
        .connect_condition("start", vec![TaskName::from("a"), TaskName::from("b")])
        .connect_task("a", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .connect_task("b", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .cancellation_region("a", vec![TaskName::from("b")], vec![])
        .build("v1")
        .unwrap();
    let (dispatcher, storage) = dispatcher_for(net);
    let workflow = dispatcher.initialize_root_workflow_public(Value::Null).await.unwrap();

    let a = enabled_task(&storage, workflow.id, "a").await;
    let b = enabled_task(&storage, workflow.id, "b").await;
    assert_eq!(b.state, TaskInstanceState::Enabled);

    let item = dispatcher.initialize_work_item_public(a.id, Value::Null).await.unwrap();
    dispatcher.start_work_item_public(item.id, Value::Null).await.unwrap();
    dispatcher.complete_work_item_public(item.id, Value::Null).await.unwrap();

    let b_after = storage.get_task_instance(b.id).await.unwrap().unwrap();
    assert_eq!(b_after.state, TaskInstanceState::Cancelled);

    let record = storage.get_workflow_instance(workflow.id).await.unwrap().unwrap();
    assert_eq!(record.state, WorkflowInstanceState::Completed);
}

// ---- S4: OR-join deferred firing -----------------------------------------

/// `start -> fork (dummy, and-split) -> {upstream_a, upstream_b}`, each
/// feeding its own condition into an or-join task `j`. `j` must stay
/// uncreated while the other upstream branch could still feed it, and
/// become enabled trivially once both have (or have not) fed it. The
/// fork is an explicit and-split task, not a condition shared directly
/// by both branches, so the two branches hold independent tokens instead
/// of racing for one (see [`document_approval`]'s doc comment).
#[tokio::test]
async fn or_join_defers_until_every_feeding_branch_has_settled() {
    let net = WorkflowBuilder::new("or_join")
        .start_condition("start")
        .end_condition("end")
        .dummy_task("fork")
        .task("upstream_a", atomic())
        .task("upstream_b", atomic())
        .task("j", atomic().join(tasquencer::JoinType::Or))
        .connect_condition("start", vec![TaskName::from("fork")])
        .connect_task("fork", vec![FlowTarget::Task(TaskName::from("upstream_a")), FlowTarget::Task(TaskName::from("upstream_b"))])
        .connect_task("upstream_a", vec![FlowTarget::Task(TaskName::from("j"))])
        .connect_task("upstream_b", vec![FlowTarget::Task(TaskName::from("j"))])
        .connect_task("j", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .build("v1")
        .unwrap();
    let (dispatcher, storage) = dispatcher_for(net);
    let workflow = dispatcher.initialize_root_workflow_public(Value::Null).await.unwrap();

    drive(&dispatcher, &storage, workflow.id, "upstream_a", Value::Null).await;

    // upstream_b is still active (enabled), so it could still feed j's
    // other inbound condition — j must not be enabled yet.
    let tasks = storage.scan_tasks_by_workflow(workflow.id).await.unwrap();
    assert!(tasks.iter().find(|t| t.name == TaskName::from("j")).is_none());

    drive(&dispatcher, &storage, workflow.id, "upstream_b", Value::Null).await;

    // Both branches have now settled; j becomes enabled trivially.
    let j = enabled_task(&storage, workflow.id, "j").await;
    let item = dispatcher.initialize_work_item_public(j.id, Value::Null).await.unwrap();
    dispatcher.start_work_item_public(item.id, Value::Null).await.unwrap();
    dispatcher.complete_work_item_public(item.id, Value::Null).await.unwrap();

    let record = storage.get_workflow_instance(workflow.id).await.unwrap().unwrap();
    assert_eq!(record.state, WorkflowInstanceState::Completed);
}

// ---- S5: composite task recursion ----------------------------------------

fn child_flow(version: &str) -> tasquencer::WorkflowNetwork {
    WorkflowBuilder::new("child_flow")
        .start_condition("start")
        .end_condition("end")
        .task("c1", atomic())
        .task("c2", atomic())
        .connect_condition("start", vec![TaskName::from("c1")])
        .connect_task("c1", vec![FlowTarget::Task(TaskName::from("c2"))])
        .connect_task("c2", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .build(version)
        .unwrap()
}

fn parent_flow(version: &str) -> tasquencer::WorkflowNetwork {
    WorkflowBuilder::new("parent_flow")
        .start_condition("start")
        .end_condition("end")
        .task("delegate", TaskBuilder::new().composite(WorkflowName::from("child_flow")))
        .connect_condition("start", vec![TaskName::from("delegate")])
        .connect_task("delegate", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .build(version)
        .unwrap()
}

/// A composite task's child workflow runs its own two-task lifecycle to
/// completion; the host then surfaces that completion as the parent
/// task's own completion, and the parent workflow finishes in turn.
#[tokio::test]
async fn composite_task_delegates_to_a_child_workflow_and_completes() {
    let storage = Arc::new(InMemoryStore::new());
    let child_net = Arc::new(child_flow("v1"));
    let parent_net = Arc::new(parent_flow("v1"));
    let parent = ActionDispatcher::new(parent_net, storage.clone(), Arc::new(NullActivities), Arc::new(NullAudit))
        .with_child(child_net.clone());
    let child = ActionDispatcher::new(child_net, storage.clone(), Arc::new(NullActivities), Arc::new(NullAudit));

    let root = parent.initialize_root_workflow_public(Value::Null).await.unwrap();
    let delegate = enabled_task(&storage, root.id, "delegate").await;

    let child_instance = parent.initialize_workflow_public(delegate.id, json!({"input": "doc-1"})).await.unwrap();
    assert_eq!(child_instance.parent.as_ref().unwrap().task_name, TaskName::from("delegate"));

    drive(&child, &storage, child_instance.id, "c1", Value::Null).await;
    drive(&child, &storage, child_instance.id, "c2", json!({"result": "reviewed"})).await;

    let finished_child = storage.get_workflow_instance(child_instance.id).await.unwrap().unwrap();
    assert_eq!(finished_child.state, WorkflowInstanceState::Completed);

    parent.complete_composite_task(delegate.id, finished_child.payload.clone()).await.unwrap();

    let final_parent = storage.get_workflow_instance(root.id).await.unwrap().unwrap();
    assert_eq!(final_parent.state, WorkflowInstanceState::Completed);
}

/// Cancelling a root workflow with a still-running composite child
/// cascades the cancellation to the child before the parent itself is
/// marked cancelled, leaving no non-terminal descendant behind.
#[tokio::test]
async fn cancelling_root_workflow_cascades_to_non_terminal_children() {
    let storage = Arc::new(InMemoryStore::new());
    let child_net = Arc::new(child_flow("v1"));
    let parent_net = Arc::new(parent_flow("v1"));
    let parent = ActionDispatcher::new(parent_net, storage.clone(), Arc::new(NullActivities), Arc::new(NullAudit))
        .with_child(child_net.clone());

    let root = parent.initialize_root_workflow_public(Value::Null).await.unwrap();
    let delegate = enabled_task(&storage, root.id, "delegate").await;
    let child_instance = parent.initialize_workflow_public(delegate.id, Value::Null).await.unwrap();

    parent.cancel_root_workflow_public(root.id, Value::Null).await.unwrap();

    let final_parent = storage.get_workflow_instance(root.id).await.unwrap().unwrap();
    let final_child = storage.get_workflow_instance(child_instance.id).await.unwrap().unwrap();
    assert_eq!(final_parent.state, WorkflowInstanceState::Cancelled);
    assert_eq!(final_child.state, WorkflowInstanceState::Cancelled);

    let children = storage.scan_workflows_by_parent(root.id).await.unwrap();
    assert!(children.iter().all(|c| c.state.is_terminal()));
}

// ---- S6: reset after failure ----------------------------------------------

fn linear_net(version: &str) -> tasquencer::WorkflowNetwork {
    WorkflowBuilder::new("linear")
        .start_condition("start")
        .end_condition("end")
        .task("t1", atomic())
        .connect_condition("start", vec![TaskName::from("t1")])
        .connect_task("t1", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .build(version)
        .unwrap()
}

/// A work item that fails, is reset, restarted, and completed ends the
/// workflow in exactly the same final state as one that completes on its
/// first attempt.
#[tokio::test]
async fn fail_reset_restart_completes_equivalently_to_the_happy_path() {
    let (happy, happy_storage) = dispatcher_for(linear_net("v1"));
    let happy_workflow = happy.initialize_root_workflow_public(json!({"doc": 1})).await.unwrap();
    let happy_task = enabled_task(&happy_storage, happy_workflow.id, "t1").await;
    let happy_item = happy.initialize_work_item_public(happy_task.id, Value::Null).await.unwrap();
    happy.start_work_item_public(happy_item.id, Value::Null).await.unwrap();
    happy.complete_work_item_public(happy_item.id, json!({"outcome": "ok"})).await.unwrap();
    let happy_final = happy_storage.get_workflow_instance(happy_workflow.id).await.unwrap().unwrap();

    let (recovered, recovered_storage) = dispatcher_for(linear_net("v1"));
    let recovered_workflow = recovered.initialize_root_workflow_public(json!({"doc": 1})).await.unwrap();
    let recovered_task = enabled_task(&recovered_storage, recovered_workflow.id, "t1").await;
    let recovered_item = recovered.initialize_work_item_public(recovered_task.id, Value::Null).await.unwrap();
    recovered.start_work_item_public(recovered_item.id, Value::Null).await.unwrap();
    recovered.fail_work_item_public(recovered_item.id, Value::Null).await.unwrap();
    recovered.reset_work_item_public(recovered_item.id, Value::Null).await.unwrap();
    recovered.start_work_item_public(recovered_item.id, Value::Null).await.unwrap();
    recovered.complete_work_item_public(recovered_item.id, json!({"outcome": "ok"})).await.unwrap();
    let recovered_final = recovered_storage.get_workflow_instance(recovered_workflow.id).await.unwrap().unwrap();

    assert_eq!(happy_final.state, recovered_final.state);
    assert_eq!(happy_final.payload, recovered_final.payload);
}

// ---- Universal invariants without a closer-by unit test -----------------

/// Once a task has a started work item, a second `initializeWorkItem`
/// call against the same task is rejected: a started atomic task has
/// exactly one active work-item child.
#[tokio::test]
async fn a_started_task_rejects_a_second_work_item() {
    let (dispatcher, storage) = dispatcher_for(linear_net("v1"));
    let workflow = dispatcher.initialize_root_workflow_public(Value::Null).await.unwrap();
    let task = enabled_task(&storage, workflow.id, "t1").await;
    let item = dispatcher.initialize_work_item_public(task.id, Value::Null).await.unwrap();
    dispatcher.start_work_item_public(item.id, Value::Null).await.unwrap();

    let err = dispatcher.initialize_work_item_public(task.id, Value::Null).await.unwrap_err();
    assert!(matches!(err, tasquencer::EngineError::PreconditionViolated(_)));
}

/// A rejected action (completing a work item twice) leaves no persisted
/// state change behind: the work item and workflow stay exactly as they
/// were after the first, successful completion.
#[tokio::test]
async fn rejected_action_leaves_no_persisted_state_change() {
    let (dispatcher, storage) = dispatcher_for(linear_net("v1"));
    let workflow = dispatcher.initialize_root_workflow_public(Value::Null).await.unwrap();
    let task = enabled_task(&storage, workflow.id, "t1").await;
    let item = dispatcher.initialize_work_item_public(task.id, Value::Null).await.unwrap();
    dispatcher.start_work_item_public(item.id, Value::Null).await.unwrap();
    dispatcher.complete_work_item_public(item.id, json!({"outcome": "ok"})).await.unwrap();

    let before = storage.get_workflow_instance(workflow.id).await.unwrap().unwrap();
    let before_item = storage.get_work_item(item.id).await.unwrap().unwrap();

    let err = dispatcher.complete_work_item_public(item.id, json!({"outcome": "replayed"})).await.unwrap_err();
    assert!(matches!(err, tasquencer::EngineError::PreconditionViolated(_)));

    let after = storage.get_workflow_instance(workflow.id).await.unwrap().unwrap();
    let after_item = storage.get_work_item(item.id).await.unwrap().unwrap();
    assert_eq!(before.state, after.state);
    assert_eq!(before.payload, after.payload);
    assert_eq!(before_item.state, after_item.state);
    assert_eq!(after_item.state, WorkItemState::Completed);
}
