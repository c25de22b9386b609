//! Errors raised while assembling a [`crate::model::WorkflowNetwork`].
//!
//! The builder never panics on a bad reference; every problem surfaces as
//! a `BuildError` out of `build()`, per the "compile-time name checking"
//! design note — since Rust can't prove cross-task name references valid
//! at compile time the way the source's type system did, the builder
//! accumulates names as it runs and rejects unknown ones eagerly here.

use thiserror::Error;

use crate::error::EngineError;
use crate::model::{ConditionName, TaskName, WorkflowName};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("task {0} declared more than once")]
    DuplicateTaskName(TaskName),

    #[error("condition {0} declared more than once")]
    DuplicateConditionName(ConditionName),

    #[error("dynamic composite task {task} has duplicate candidate workflow name {candidate}")]
    DuplicateCandidateName { task: TaskName, candidate: WorkflowName },

    #[error("flow references unknown task {0}")]
    UnknownTaskReference(TaskName),

    #[error("flow references unknown condition {0}")]
    UnknownConditionReference(ConditionName),

    #[error("start condition was never set")]
    MissingStartCondition,

    #[error("end condition was never set")]
    MissingEndCondition,

    #[error("task {0} has no kind configured (call one of atomic/composite/dynamic_composite/dummy)")]
    IncompleteTaskDefinition(TaskName),

    #[error("workflow {name} failed structural validation: {source}")]
    Structural {
        name: WorkflowName,
        #[source]
        source: EngineError,
    },
}
