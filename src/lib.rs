//! # tasquencer
//!
//! A Workflow-Net / YAWL-style workflow orchestration engine: a bipartite
//! task/condition graph (places and transitions, in Petri-net terms) with
//! AND/OR/XOR split and join semantics, cancellation regions, and
//! composite tasks that spawn child workflow instances.
//!
//! ## Layout
//!
//! - [`model`] — the immutable definition: tasks, conditions, flows,
//!   cancellation regions, frozen into a [`model::WorkflowNetwork`].
//! - [`builder`] — the fluent API that assembles a `WorkflowNetwork` and
//!   validates its structure once, at build time.
//! - [`runtime`] — the mutable instance records (workflow/task/work-item)
//!   the execution core reads and writes.
//! - [`storage`] — the `WorkflowStorage` trait the execution core runs
//!   against, plus an in-memory reference implementation.
//! - [`execution`] — enablement, the six-step firing algorithm,
//!   cancellation, and the lifecycle state tables.
//! - [`schema`] — payload validation for the ten dispatcher actions.
//! - [`audit`] — the audit span/event sink actions report through.
//! - [`dispatcher`] — the ten user-facing actions (`initializeWorkflow`,
//!   `completeWorkItem`, ...), each validating its payload, authorizing
//!   the caller, and delegating into `execution`.
//! - [`version`] — the named registry of `(workflowName, version)` pairs
//!   and the migrations between them.
//!
//! The engine does not prescribe a scheduler: callers decide which action
//! to invoke next, and composite-task completion propagation is an
//! explicit method (`dispatcher::ActionDispatcher::complete_composite_task`)
//! rather than something the engine drives on its own.

pub mod audit;
pub mod builder;
pub mod demos;
pub mod dispatcher;
pub mod error;
pub mod execution;
pub mod model;
pub mod runtime;
pub mod schema;
pub mod storage;
pub mod version;

pub use audit::{AuditHandle, NullAudit};
pub use builder::{BuildError, TaskBuilder, WorkflowBuilder};
pub use dispatcher::{ActionDispatcher, AllowAll, AuthorizationPolicy, DispatchContext};
pub use error::{EngineError, Result};
pub use execution::{ExecutionContext, FnRouter, NullActivities, Router, RouterContext};
pub use model::{
    ActionName, CancellationRegion, Condition, ConditionName, DynamicCandidate, ExtractedWorkflow, Flow, FlowTarget,
    JoinType, SplitType, Task, TaskKind, TaskName, VersionName, WorkItemDefinition, WorkflowName, WorkflowNetwork,
};
pub use runtime::{
    ParentLink, TaskInstanceId, TaskInstanceRecord, TaskInstanceState, WorkItemInstanceId, WorkItemInstanceRecord,
    WorkItemState, WorkflowInstanceId, WorkflowInstanceRecord, WorkflowInstanceState,
};
pub use schema::{EmptySchema, JsonSchema, Schema};
pub use storage::{InMemoryStore, WorkflowStorage};
pub use version::{Migration, VersionManager};
