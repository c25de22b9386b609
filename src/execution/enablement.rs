//! The join-type enablement rule.
//!
//! ## OR-join approximation
//!
//! YAWL's non-local OR-join semantics ("at least one input marked, and no
//! currently-reachable firing can still deliver a token to an unmarked
//! input") is, in general, equivalent to deciding reachability in the
//! residual net — expensive to compute exactly on every marking change.
//! This engine approximates it conservatively, per `spec.md` §9's Design
//! Note: a task is OR-enabled once at least one inbound condition is
//! marked *and* every unmarked inbound condition has no upstream task that
//! is currently `enabled` or `started` (i.e. no task that could still fire
//! and feed it). This can delay enablement relative to full reachability
//! analysis (it does not look past one hop), but it never enables a join
//! early. Callers that need the exact rule documented in an audit trail
//! should attach `audit::Attribute::Custom { fields: {"orJoinRule":
//! "one-hop-upstream-approximation"} }` alongside the enablement decision.

use std::collections::HashSet;

use crate::model::ids::{ConditionName, TaskName};
use crate::model::net::WorkflowNetwork;
use crate::model::task::JoinType;

/// The name of the OR-join approximation this module implements, for
/// callers that want to record it in an audit attribute.
pub const OR_JOIN_RULE_NAME: &str = "one-hop-upstream-approximation";

/// Whether `task` is enabled given the current marking and the set of
/// tasks currently `enabled` or `started` elsewhere in the same workflow
/// instance.
pub fn is_enabled(
    net: &WorkflowNetwork,
    task: &TaskName,
    marked: &HashSet<ConditionName>,
    active_tasks: &HashSet<TaskName>,
) -> bool {
    let inbound = net.inbound_of_task(task);
    if inbound.is_empty() {
        return false;
    }
    let Some(def) = net.get_task(task) else { return false };

    match def.join_type {
        JoinType::And => inbound.iter().all(|c| marked.contains(c)),
        JoinType::Xor => inbound.iter().filter(|c| marked.contains(*c)).count() == 1,
        JoinType::Or => {
            let any_marked = inbound.iter().any(|c| marked.contains(c));
            if !any_marked {
                return false;
            }
            inbound
                .iter()
                .filter(|c| !marked.contains(*c))
                .all(|c| !could_still_feed(net, c, active_tasks))
        }
    }
}

fn could_still_feed(net: &WorkflowNetwork, condition: &ConditionName, active_tasks: &HashSet<TaskName>) -> bool {
    net.inbound_of_condition(condition).iter().any(|t| active_tasks.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{TaskBuilder, WorkflowBuilder};
    use crate::model::flow::FlowTarget;
    use crate::model::task::{JoinType as JT, SplitType, WorkItemDefinition};
    use crate::schema::EmptySchema;
    use std::sync::Arc;

    fn atomic() -> TaskBuilder {
        let s: Arc<dyn crate::schema::Schema> = Arc::new(EmptySchema);
        TaskBuilder::new().atomic(WorkItemDefinition {
            initialize_schema: s.clone(),
            start_schema: s.clone(),
            complete_schema: s.clone(),
            fail_schema: s.clone(),
            reset_schema: s.clone(),
            cancel_schema: s,
        })
    }

    fn or_join_network() -> WorkflowNetwork {
        WorkflowBuilder::new("or_join")
            .start_condition("start")
            .end_condition("end")
            .task("upstream_a", atomic())
            .task("upstream_b", atomic())
            .task("join", atomic().join(JT::Or).split(SplitType::And))
            .connect_condition("start", vec![TaskName::from("upstream_a"), TaskName::from("upstream_b")])
            .connect_task(
                "upstream_a",
                vec![FlowTarget::Condition(ConditionName::from("c1"))],
            )
            .connect_task(
                "upstream_b",
                vec![FlowTarget::Condition(ConditionName::from("c2"))],
            )
            .connect_condition("c1", vec![TaskName::from("join")])
            .connect_condition("c2", vec![TaskName::from("join")])
            .connect_task("join", vec![FlowTarget::Condition(ConditionName::from("end"))])
            .build("v1")
            .expect("builds")
    }

    #[test]
    fn or_join_waits_while_other_branch_still_active() {
        let net = or_join_network();
        let mut marked = HashSet::new();
        marked.insert(ConditionName::from("c1"));
        let mut active = HashSet::new();
        active.insert(TaskName::from("upstream_b"));

        assert!(!is_enabled(&net, &TaskName::from("join"), &marked, &active));
    }

    #[test]
    fn or_join_fires_once_other_branch_cannot_feed_it() {
        let net = or_join_network();
        let mut marked = HashSet::new();
        marked.insert(ConditionName::from("c1"));
        let active = HashSet::new();

        assert!(is_enabled(&net, &TaskName::from("join"), &marked, &active));
    }

    #[test]
    fn or_join_enabled_trivially_when_all_inputs_marked() {
        let net = or_join_network();
        let mut marked = HashSet::new();
        marked.insert(ConditionName::from("c1"));
        marked.insert(ConditionName::from("c2"));
        let active = HashSet::new();
        assert!(is_enabled(&net, &TaskName::from("join"), &marked, &active));
    }
}
