//! The in-memory definition model: tasks, conditions, flows, cancellation
//! regions, and the frozen `WorkflowNetwork` that ties them together.

pub mod cancellation;
pub mod condition;
pub mod flow;
pub mod ids;
pub mod net;
pub mod task;

pub use cancellation::CancellationRegion;
pub use condition::Condition;
pub use flow::{Flow, FlowTarget, FnRouter, Router, RouterContext};
pub use ids::{ActionName, ConditionName, TaskName, VersionName, WorkflowName};
pub use net::{ExtractedEndpoint, ExtractedFlow, ExtractedTask, ExtractedTaskKind, ExtractedWorkflow, WorkflowNetwork};
pub use task::{DynamicCandidate, JoinType, SplitType, Task, TaskKind, WorkItemDefinition};
