//! Identifiers for workflow-net elements.
//!
//! Every identifier in this module follows the same pattern as the
//! `PlaceId`/`TransitionId` newtypes workflow engines built on Petri-net
//! theory typically use: a single owned `String`, cheap `Clone`, `Hash`-able
//! for use as map keys, and constructible from anything `Into<String>` so
//! callers can pass `&str` literals everywhere.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Build an identifier from anything string-like.
            pub fn new<S: Into<String>>(name: S) -> Self {
                $name(name.into())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(WorkflowName, "Name of a workflow definition, e.g. \"document_review\".");
string_id!(VersionName, "Name of a specific version of a workflow definition, e.g. \"v2\".");
string_id!(TaskName, "Name of a task (transition) within a workflow definition.");
string_id!(
    ConditionName,
    "Name of a condition (place) within a workflow definition. Implicit conditions \
     synthesized for task\\u2192task edges are named `implicit:<from>-><to>`."
);
string_id!(ActionName, "Name of a user-registered action bound to a schema and, for the public dispatcher, an authorization policy.");

impl ConditionName {
    /// Name of the synthetic condition inserted for a direct task→task edge.
    pub fn implicit(from: &TaskName, to: &TaskName) -> Self {
        ConditionName(format!("implicit:{}->{}", from.as_str(), to.as_str()))
    }

    /// Whether this condition was synthesized for a task→task edge
    /// rather than declared explicitly in the builder.
    pub fn is_implicit(&self) -> bool {
        self.0.starts_with("implicit:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_compare_and_display() {
        let a = TaskName::from("submit");
        let b = TaskName::new("submit".to_string());
        assert_eq!(a, b);
        assert_eq!(format!("{}", a), "submit");
    }

    #[test]
    fn implicit_condition_naming() {
        let from = TaskName::from("t1");
        let to = TaskName::from("t2");
        let implicit = ConditionName::implicit(&from, &to);
        assert_eq!(implicit.as_str(), "implicit:t1->t2");
        assert!(implicit.is_implicit());
        assert!(!ConditionName::from("draft").is_implicit());
    }
}
