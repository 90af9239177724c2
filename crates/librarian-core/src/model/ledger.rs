//! Append-only ledger entries. A `session_id` binds a query's stages together; the
//! response's `traceId` equals that session ID (spec §8 "trace binding").

use crate::ids::{LedgerEntryId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntryKind {
    SessionOpened,
    StageObserved,
    PackAssembly,
    SynthesisProduced,
    AdequacyChecked,
    OutcomeReported,
    SessionClosed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub timestamp: DateTime<Utc>,
    pub kind: LedgerEntryKind,
    pub payload: Value,
    pub provenance: String,
    pub confidence: Option<f64>,
    pub related_entries: Vec<LedgerEntryId>,
    pub session_id: Option<SessionId>,
}
