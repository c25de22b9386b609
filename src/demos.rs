//! Demonstration workflow definitions used by the `tasquencer-admin`
//! binary's `run-demo` command and by the integration test suite.
//!
//! Not part of the library's functional surface — callers assemble their
//! own [`WorkflowNetwork`]s with [`WorkflowBuilder`] the same way these
//! are built.

use std::sync::Arc;

use serde_json::Value;

use crate::builder::{TaskBuilder, WorkflowBuilder};
use crate::model::flow::{FlowTarget, FnRouter, RouterContext};
use crate::model::ids::{ConditionName, TaskName, VersionName, WorkflowName};
use crate::model::task::{SplitType, WorkItemDefinition};
use crate::model::net::WorkflowNetwork;
use crate::schema::{EmptySchema, Schema};

fn open_work_item() -> WorkItemDefinition {
    let schema: Arc<dyn Schema> = Arc::new(EmptySchema);
    WorkItemDefinition {
        initialize_schema: schema.clone(),
        start_schema: schema.clone(),
        complete_schema: schema.clone(),
        fail_schema: schema.clone(),
        reset_schema: schema.clone(),
        cancel_schema: schema,
    }
}

fn atomic() -> TaskBuilder {
    TaskBuilder::new().atomic(open_work_item())
}

/// The simplest possible network: one atomic task between `start` and
/// `end`. Useful as a smoke test and as a fixture for unit tests
/// elsewhere in the crate.
pub fn linear_review(version: &str) -> WorkflowNetwork {
    WorkflowBuilder::new("linear_review")
        .start_condition("start")
        .end_condition("end")
        .task("review", atomic().description("review the submitted document"))
        .connect_condition("start", vec![TaskName::from("review")])
        .connect_task("review", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .build(version)
        .expect("linear_review is a well-formed network")
}

/// A document-approval network exercising an AND-split/AND-join pair
/// (two parallel reviews must both complete before approval is
/// considered), an XOR-split router (approve vs. request changes, keyed
/// on the completion payload's `"decision"` field), a cancellation
/// region (an approved decision cancels the still-open revision cycle),
/// and dummy tasks (the fork and the AND-join point carry no work item
/// of their own).
///
/// A single condition feeding two tasks directly would put
/// `legal_review` and `content_review` in conflict over one token —
/// whichever fires first would disable the other (see `spec.md` §4.2:
/// "from a condition, a set of target tasks"). True parallelism needs an
/// and-split task upstream, crediting each branch its own implicit
/// condition:
///
/// ```text
/// start --> begin_reviews (dummy, and-split) --> legal_review    --\
///                                            \--> content_review -+--> review_complete (dummy, and-join) --> decide (xor-split)
///                                                                                                              |-> approved --> end
///                                                                                                              '-> revise ----> end
/// ```
pub fn document_approval(version: &str) -> WorkflowNetwork {
    let decision_router = Arc::new(FnRouter(|ctx: &RouterContext, candidates: &[FlowTarget]| {
        let approved = ctx
            .completion_payload
            .get("decision")
            .and_then(Value::as_str)
            .map(|d| d == "approved")
            .unwrap_or(false);
        let wanted = if approved { "approved" } else { "revise" };
        Ok(candidates
            .iter()
            .filter(|t| matches!(t, FlowTarget::Task(name) if name.as_str() == wanted))
            .cloned()
            .collect())
    }));

    WorkflowBuilder::new("document_approval")
        .start_condition("start")
        .end_condition("end")
        .dummy_task("begin_reviews")
        .task("legal_review", atomic())
        .task("content_review", atomic())
        .dummy_task("review_complete")
        .task("decide", atomic().split(SplitType::Xor))
        .task("approved", atomic())
        .task("revise", atomic())
        .connect_condition("start", vec![TaskName::from("begin_reviews")])
        .connect_task(
            "begin_reviews",
            vec![FlowTarget::Task(TaskName::from("legal_review")), FlowTarget::Task(TaskName::from("content_review"))],
        )
        .connect_task("legal_review", vec![FlowTarget::Task(TaskName::from("review_complete"))])
        .connect_task("content_review", vec![FlowTarget::Task(TaskName::from("review_complete"))])
        .connect_task("review_complete", vec![FlowTarget::Task(TaskName::from("decide"))])
        .connect_task_with_router(
            "decide",
            vec![FlowTarget::Task(TaskName::from("approved")), FlowTarget::Task(TaskName::from("revise"))],
            decision_router,
        )
        .connect_task("approved", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .connect_task("revise", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .cancellation_region("approved", vec![TaskName::from("revise")], vec![])
        .build(version)
        .expect("document_approval is a well-formed network")
}

/// Parent network for the composite-task recursion demo: a single
/// composite task spawning [`linear_review`] as its child workflow.
pub fn composite_parent(version: &str) -> WorkflowNetwork {
    WorkflowBuilder::new("composite_parent")
        .start_condition("start")
        .end_condition("end")
        .task("delegate", TaskBuilder::new().composite(WorkflowName::from("linear_review")))
        .connect_condition("start", vec![TaskName::from("delegate")])
        .connect_task("delegate", vec![FlowTarget::Condition(ConditionName::from("end"))])
        .build(version)
        .expect("composite_parent is a well-formed network")
}

pub fn linear_review_v1() -> Arc<WorkflowNetwork> {
    Arc::new(linear_review("v1"))
}

pub fn document_approval_v1() -> Arc<WorkflowNetwork> {
    Arc::new(document_approval("v1"))
}

pub fn composite_parent_v1() -> Arc<WorkflowNetwork> {
    Arc::new(composite_parent("v1"))
}

/// Placeholder version-name helper so callers building demo definitions
/// don't scatter string literals for the single version these demos ship.
pub fn demo_version() -> VersionName {
    VersionName::from("v1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_review_validates() {
        assert!(linear_review("v1").validate_structure().is_ok());
    }

    #[test]
    fn document_approval_validates() {
        assert!(document_approval("v1").validate_structure().is_ok());
    }

    #[test]
    fn composite_parent_validates() {
        assert!(composite_parent("v1").validate_structure().is_ok());
    }
}
