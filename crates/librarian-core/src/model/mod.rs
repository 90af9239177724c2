//! Data model shared by storage, retrieval, evidence, indexer, and pipeline crates.

pub mod claim;
pub mod contradiction;
pub mod defeater;
pub mod edge;
pub mod evidence_meta;
pub mod file;
pub mod function;
pub mod ledger;
pub mod pack;
pub mod watch_state;

pub use claim::{AggregationMethod, Claim, ClaimSource, ClaimSourceType, ClaimStatus, ClaimSubject, ClaimSubjectType, ConfidenceComponents};
pub use contradiction::{Contradiction, ContradictionResolution, ContradictionSeverity, ContradictionStatus};
pub use defeater::{Defeater, DefeaterSeverity, DefeaterStatus, DefeaterType};
pub use edge::{ArgumentEdgeType, EdgeType, KnowledgeEdge, StructuralEdgeType};
pub use evidence_meta::EvidenceGraphMeta;
pub use file::{content_checksum, File, FileCategory, FileRole};
pub use function::{Function, Module, OutcomeCounters};
pub use ledger::{LedgerEntry, LedgerEntryKind};
pub use pack::{ContextPack, InvalidationTrigger, PackData};
pub use watch_state::{WatchCursor, WatchState, WATCH_STATE_KEY};
