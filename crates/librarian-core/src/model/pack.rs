//! Context pack: the unit returned to agents. DESIGN NOTES calls for a tagged variant
//! rather than the source's loose dynamic record — `PackKind`/`PackData` below.

use crate::ids::{FunctionId, ModuleId, PackId};
use crate::model::function::OutcomeCounters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pack kind discriminant. `Knowledge` carries its own sub-kind string (e.g.
/// `"architecture"`, `"decision"`) since the source's `knowledge.*` family is open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PackData {
    Function {
        function_id: FunctionId,
        signature: String,
    },
    Module {
        module_id: ModuleId,
        exports: Vec<String>,
    },
    ChangeImpact {
        changed_path: String,
        impacted_paths: Vec<String>,
    },
    Pattern {
        pattern_name: String,
        occurrences: Vec<String>,
    },
    Knowledge {
        subkind: String,
        topic: String,
    },
}

impl PackData {
    pub fn kind_label(&self) -> &'static str {
        match self {
            PackData::Function { .. } => "function",
            PackData::Module { .. } => "module",
            PackData::ChangeImpact { .. } => "change_impact",
            PackData::Pattern { .. } => "pattern",
            PackData::Knowledge { .. } => "knowledge",
        }
    }
}

/// Reasons a pack can be invalidated. `Explicit` carries a free-form tag supplied by
/// the caller (e.g. `"manual_review"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationTrigger {
    FileChanged(String),
    VersionBump,
    Explicit(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPack {
    pub id: PackId,
    pub data: PackData,
    pub summary: String,
    pub key_facts: Vec<String>,
    pub related_files: Vec<String>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub invalidated: bool,
    pub invalidation_triggers: Vec<InvalidationTrigger>,
    pub access_count: u64,
    pub outcomes: OutcomeCounters,
}

impl ContextPack {
    pub fn new(id: PackId, data: PackData, summary: impl Into<String>) -> Self {
        Self {
            id,
            data,
            summary: summary.into(),
            key_facts: Vec::new(),
            related_files: Vec::new(),
            confidence: 0.5,
            created_at: Utc::now(),
            version: "1".to_string(),
            invalidated: false,
            invalidation_triggers: Vec::new(),
            access_count: 0,
            outcomes: OutcomeCounters::default(),
        }
    }

    /// Soft-invalidate: the row is retained and only visible when the caller passes
    /// `includeInvalidated` (spec §3).
    pub fn invalidate(&mut self, trigger: InvalidationTrigger) {
        self.invalidated = true;
        self.invalidation_triggers.push(trigger);
    }

    pub fn visible(&self, include_invalidated: bool) -> bool {
        include_invalidated || !self.invalidated
    }
}
