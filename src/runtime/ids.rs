//! Identifiers for runtime instances, as opposed to the definition-level
//! names in [`crate::model::ids`]. These wrap a `Uuid` rather than a
//! `String` since instances are created at runtime, not authored.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                $name(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(WorkflowInstanceId, "Identity of a live workflow instance.");
uuid_id!(TaskInstanceId, "Identity of a live task instance.");
uuid_id!(WorkItemInstanceId, "Identity of a live work-item instance.");
