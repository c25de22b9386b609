//! Runtime instance records: the mutable state the execution core reads
//! and writes through the [`crate::storage`] interface, as distinct from
//! the immutable [`crate::model`] definitions they're instances of.

pub mod ids;
pub mod marking;
pub mod task_instance;
pub mod work_item;
pub mod workflow_instance;

pub use ids::{TaskInstanceId, WorkItemInstanceId, WorkflowInstanceId};
pub use marking::{ConditionMarkingId, ConditionMarkingRecord};
pub use task_instance::{TaskInstanceRecord, TaskInstanceState};
pub use work_item::{WorkItemInstanceRecord, WorkItemState};
pub use workflow_instance::{ParentLink, WorkflowInstanceRecord, WorkflowInstanceState};
