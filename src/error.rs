//! Core error type for the engine.
//!
//! ## Rust Learning Notes:
//!
//! ### The `thiserror` Crate
//! `#[derive(Error)]` implements `std::error::Error` for us; `#[error("...")]`
//! supplies the `Display` message, and `#[from]` gives us a free `From` impl
//! so `?` can convert a lower-level error into `EngineError` automatically.

use thiserror::Error;

/// Everything that can go wrong while building, validating, or running a
/// workflow definition.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An action payload failed JSON-Schema validation.
    #[error("invalid payload for action {action}: {reason}")]
    InvalidPayload { action: String, reason: String },

    /// A referenced workflow, task, condition, or instance does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A dispatcher operation named a workflow/task/work-item path that
    /// doesn't resolve to a live instance.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// An operation was attempted from a state that doesn't permit it, e.g.
    /// completing a work item that was never started.
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    /// A task's router returned an invalid or empty selection for an OR/XOR
    /// split.
    #[error("router failed for task {task}: {reason}")]
    RouterFailed { task: String, reason: String },

    /// The caller's authorization policy rejected a public dispatcher call.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No version of the named workflow definition could be found.
    #[error("workflow definition not found: {workflow}")]
    DefinitionNotFound { workflow: String },

    /// A migration between workflow definition versions failed.
    #[error("migration failed from {from} to {to}: {reason}")]
    MigrationFailed {
        from: String,
        to: String,
        reason: String,
    },

    /// An optimistic-concurrency write lost a race and must be retried by
    /// the caller.
    #[error("concurrency conflict on {0}, retry")]
    ConcurrencyAborted(String),

    /// A workflow definition failed structural validation at build time.
    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// Storage-layer failure, wrapped from whatever backend is in use.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shorthand for `Result<T, EngineError>`, used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
