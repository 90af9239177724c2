//! Stable entity identifiers.
//!
//! All graph references (knowledge edges, claim subjects, defeater targets) are plain
//! IDs, never owning pointers, so the knowledge and evidence graphs can be cyclic
//! without fighting the borrow checker — see DESIGN.md for the arena-by-ID rationale.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

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
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(FunctionId, "Stable ID of a Function entity.");
string_id!(ModuleId, "Stable ID of a Module entity.");
string_id!(PackId, "Stable ID of a context pack.");
string_id!(ClaimId, "Stable ID of an evidence claim.");
string_id!(DefeaterId, "Stable ID of a defeater.");
string_id!(ContradictionId, "Stable ID of a contradiction.");
string_id!(LedgerEntryId, "Stable ID of an append-only ledger entry.");
string_id!(SessionId, "Stable ID of a ledger/trace session.");
string_id!(EntityId, "A generic reference to any subject entity (file, function, module, decision) by opaque ID.");

/// Sentinel `traceId` returned when no ledger session was supplied for a query.
pub const REPLAY_UNAVAILABLE_TRACE: &str = "REPLAY_UNAVAILABLE_TRACE";
