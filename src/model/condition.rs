//! Condition (place) definitions.

use serde::{Deserialize, Serialize};

use super::ids::ConditionName;

/// A condition (place) in a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: ConditionName,
    /// Whether this condition was synthesized by the builder for a direct
    /// task→task edge rather than declared explicitly.
    pub implicit: bool,
}

impl Condition {
    pub fn explicit(name: impl Into<ConditionName>) -> Self {
        Condition {
            name: name.into(),
            implicit: false,
        }
    }

    pub fn implicit(name: ConditionName) -> Self {
        Condition {
            name,
            implicit: true,
        }
    }
}
