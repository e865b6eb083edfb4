//! Opaque identifier newtypes used throughout the data model.
//!
//! All identifiers in the source system are opaque strings; we keep that
//! shape here (rather than forcing everything through `Uuid`) so that
//! identifiers coined by external channels (chat JIDs, worker ids from a
//! fleet inventory file) round-trip exactly as given.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Build from anything string-like.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the inner string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

opaque_id!(ChatJid, "Opaque identifier for a conversation on a channel.");
opaque_id!(MessageId, "Unique identifier for a single chat message.");
opaque_id!(TaskId, "Identifier of a scheduled `Task`.");
opaque_id!(GovTaskId, "Identifier of a `GovTask`.");
opaque_id!(WorkerId, "Identifier of a fleet `Worker`.");
opaque_id!(SessionId, "Identifier of a resumable agent conversation.");
opaque_id!(MemoryId, "Identifier of a stored `Memory`.");
opaque_id!(ProductId, "Identifier of a product under `scope = PRODUCT`.");
opaque_id!(GroupFolder, "Identifier of a tenant group's IPC/working folder.");

/// Deterministic idempotency key for one governed state transition.
///
/// Built as `"{task_id}:{from}->{to}:v{version}"`; a unique-constraint
/// insert on this value is the dispatch claim primitive (see
/// `GovDispatch`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchKey(pub String);

impl DispatchKey {
    /// Build the canonical dispatch key for a transition.
    #[must_use]
    pub fn build(task_id: &GovTaskId, from: &str, to: &str, version: u64) -> Self {
        Self(format!("{task_id}:{from}->{to}:v{version}"))
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_id_roundtrip() {
        let id = ChatJid::new("120363012345@g.us");
        assert_eq!(id.as_str(), "120363012345@g.us");
        assert_eq!(id.to_string(), "120363012345@g.us");
    }

    #[test]
    fn test_dispatch_key_format() {
        let key = DispatchKey::build(&GovTaskId::new("T"), "READY", "DOING", 4);
        assert_eq!(key.0, "T:READY->DOING:v4");
    }

    #[test]
    fn test_ids_serialize_transparent() {
        let id = WorkerId::new("worker-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"worker-1\"");
        let back: WorkerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
