//! Evidence graph: claims, defeaters, contradictions, confidence decomposition, and the
//! traversal operations the execution pipeline uses to answer "why" a pack was returned.

pub mod confidence;
pub mod contradiction;
pub mod graph;

pub use confidence::recompute_confidence;
pub use contradiction::{detect as detect_contradiction, mutually_exclusive};
pub use graph::{EvidenceGraph, FullGraph};
