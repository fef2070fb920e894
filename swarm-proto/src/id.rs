//! Typed ID wrappers for agents, tasks, handoffs, teams, and sandboxes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up an agent ID with a team ID at a call
/// site. These are plain strings underneath — no format is enforced, callers
/// choose their own ID scheme.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to `String`.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the underlying string is empty.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(AgentId, "Unique identifier for an agent/persona instance.");
typed_id!(TaskId, "Unique identifier for a unit of work handed off between agents.");
typed_id!(HandoffId, "Unique identifier for a single handoff (and its preserved context).");
typed_id!(TeamId, "Unique identifier for a collaborating team.");
typed_id!(SandboxId, "Unique identifier for a live sandbox instance.");
