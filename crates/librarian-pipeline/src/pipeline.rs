//! The `executeQuery` orchestrator (spec §4.6): wires sanitization, ledger session
//! management, template selection, capability enforcement, retrieval, synthesis,
//! citation validation, adequacy, ledger recording, and episode logging into the
//! ten-step contract a single query follows.

use std::sync::Arc;

use chrono::Utc;
use librarian_core::config::LibrarianConfig;
use librarian_core::disclosure::Disclosure;
use librarian_core::error::{LibrarianError, StorageError, ValidationError};
use librarian_core::governor::Governor;
use librarian_core::ids::{PackId, SessionId, REPLAY_UNAVAILABLE_TRACE};
use librarian_core::model::ledger::{LedgerEntry, LedgerEntryKind};
use librarian_core::model::ContextPack;
use librarian_core::sanitizer::{sanitize_string, PathSanitizeOptions, StringSanitizeOptions};
use librarian_embeddings::EmbeddingService;
use librarian_evidence::EvidenceGraph;
use librarian_indexer::StalenessTracker;
use librarian_ratelimit::{CircuitBreaker, CompositeLimiter, FailureKind, Operation};
use librarian_retrieval::{CoChangeMatrix, RetrievalEngine};
use librarian_storage::Storage;
use serde_json::json;
use uuid::Uuid;

use crate::adequacy::{compute_adequacy, AssembledObjects};
use crate::capability::{enforce, Capability, CapabilityContract, CapabilitySet};
use crate::citation::validate_citations;
use crate::episode::{record_episode, QueryEpisode};
use crate::llm::LlmProvider;
use crate::request::{Depth, LlmRequirement, QueryRequest};
use crate::response::{Adequacy, ConstructionPlan, QueryResponse, StageTiming, SynthesisResult};
use crate::stage::{QueryStage, StageObserver, StageTracker, TracingStageObserver};
use crate::synthesis::synthesize;
use crate::template::{select_template, ObjectKind};

pub struct Pipeline {
    storage: Arc<dyn Storage>,
    retrieval: Arc<RetrievalEngine>,
    embeddings: Arc<EmbeddingService>,
    evidence: EvidenceGraph,
    staleness: Arc<StalenessTracker>,
    llm: Arc<dyn LlmProvider>,
    rate_limiter: CompositeLimiter,
    circuit_breaker: CircuitBreaker,
    capabilities: CapabilitySet,
    config: LibrarianConfig,
}

fn depth_return_top_k(depth: Depth) -> usize {
    match depth {
        Depth::L0 => 3,
        Depth::L1 => 8,
        Depth::L2 => 15,
        Depth::L3 => 30,
    }
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Arc<dyn Storage>,
        retrieval: Arc<RetrievalEngine>,
        embeddings: Arc<EmbeddingService>,
        evidence: EvidenceGraph,
        staleness: Arc<StalenessTracker>,
        llm: Arc<dyn LlmProvider>,
        capabilities: CapabilitySet,
        config: LibrarianConfig,
    ) -> Self {
        let rate_limiter = CompositeLimiter::new(config.rate_limit.clone());
        let circuit_breaker = CircuitBreaker::new(config.circuit_breaker.clone());
        Self {
            storage,
            retrieval,
            embeddings,
            evidence,
            staleness,
            llm,
            rate_limiter,
            circuit_breaker,
            capabilities,
            config,
        }
    }

    /// Run one query end to end. `session_id` is the caller-supplied ledger session;
    /// when absent the response's `traceId` is the `REPLAY_UNAVAILABLE_TRACE` sentinel
    /// plus a `replay_unavailable` disclosure (spec §4.6 step 2).
    pub async fn execute_query(
        &self,
        request: QueryRequest,
        session_id: Option<String>,
    ) -> Result<QueryResponse, LibrarianError> {
        let observer = TracingStageObserver;
        let mut tracker = StageTracker::new(&observer);
        let started_at = Utc::now();
        let mut disclosures: Vec<Disclosure> = Vec::new();

        if self
            .rate_limiter
            .try_acquire(Operation::Query)
            .is_err()
        {
            return Err(LibrarianError::Validation(ValidationError::new(
                "query rejected by rate limiter",
            )));
        }
        if !self.circuit_breaker.allow_request() {
            return Err(LibrarianError::Validation(ValidationError::new(
                "query rejected: circuit breaker is open",
            )));
        }

        let governor = Governor::new(self.config.governor.clone());

        // --- step 1: sanitize intent and affected files --------------------------
        let intent = sanitize_string(&request.intent, &StringSanitizeOptions::default())
            .map_err(LibrarianError::Validation)?;
        let path_options = PathSanitizeOptions::new(self.config.workspace_root.clone());
        let mut affected_files = Vec::with_capacity(request.affected_files.len());
        for raw_path in &request.affected_files {
            match librarian_core::sanitizer::sanitize_path(raw_path, &path_options) {
                Ok(resolved) => affected_files.push(resolved.to_string_lossy().to_string()),
                Err(_) => affected_files.push(raw_path.clone()),
            }
        }

        // --- step 2: open ledger session / determine trace id --------------------
        let trace_id = match &session_id {
            Some(id) => {
                self.storage
                    .open_ledger_session(id)
                    .await
                    .map_err(LibrarianError::Storage)?;
                id.clone()
            }
            None => {
                disclosures.push(Disclosure::replay_unavailable());
                REPLAY_UNAVAILABLE_TRACE.to_string()
            }
        };
        self.append_stage_entry(&session_id, LedgerEntryKind::SessionOpened, json!({"traceId": trace_id}))
            .await;

        tracker.enter(QueryStage::Planned, Some(json!({"intent": intent})));

        // --- step 3: select construction template ---------------------------------
        let (template, used_default) = select_template(request.task_type.as_deref());
        if used_default {
            disclosures.push(Disclosure::new(
                librarian_core::disclosure::DisclosureCode::AdequacyUnavailable,
                format!("no template resolver match for task_type; defaulted to {}", template.id.as_str()),
            ));
        }

        // --- step 4: enforce capability contract ----------------------------------
        let contract = self.contract_for(request.llm_requirement, &template);
        let capability_result = enforce(&contract, &self.capabilities);
        disclosures.extend(capability_result.disclosures.clone());
        if !capability_result.satisfied {
            self.close_session(&session_id).await;
            return Ok(self.assemble_blocked_response(
                trace_id,
                template.id.as_str(),
                disclosures,
                started_at,
                &mut tracker,
            ));
        }

        governor.check_budget().map_err(LibrarianError::Governor)?;

        tracker.enter(QueryStage::Retrieving, None);

        // --- step 5: retrieve packs + annotate with claims/freshness --------------
        let cochange = CoChangeMatrix::build(&[], 50);
        let scored = self
            .retrieval
            .query(
                &self.embeddings,
                &governor,
                &intent,
                &affected_files,
                &cochange,
                &self.config.retrieval,
            )
            .await;
        let scored = match scored {
            Ok(results) => results,
            Err(err) => {
                self.circuit_breaker.record_failure(FailureKind::General);
                disclosures.push(Disclosure::new(
                    librarian_core::disclosure::DisclosureCode::ProviderUnavailable,
                    format!("retrieval failed: {err}"),
                ));
                Vec::new()
            }
        };

        let top_k = depth_return_top_k(request.depth).min(scored.len());
        let mut packs: Vec<ContextPack> = Vec::new();
        for result in scored.into_iter().take(top_k) {
            let freshness = self.staleness.freshness_confidence(std::slice::from_ref(&result.path), Utc::now());
            let pack_id = PackId::new(Uuid::new_v4().to_string());
            let mut pack = ContextPack::new(
                pack_id.clone(),
                librarian_core::model::PackData::Knowledge {
                    subkind: "retrieval".to_string(),
                    topic: result.path.clone(),
                },
                format!("Retrieved context for {}", result.path),
            );
            pack.related_files.push(result.path.clone());
            pack.confidence = (result.score.clamp(0.0, 1.0) * 0.6 + freshness * 0.4).clamp(0.01, 1.0);

            // Annotate with claim IDs (spec §4.6 step 5): link this pack to any claim
            // whose evidence graph edges already reference the same file path.
            match self.evidence.traverse_from(&result.path, 1).await {
                Ok(related) => {
                    for claim_id in related {
                        pack.key_facts.push(format!("claim:{claim_id}"));
                        if let Err(err) = self.evidence.link(pack.id.as_str(), &claim_id, "cites").await {
                            disclosures.push(storage_disclosure(&err));
                        }
                    }
                }
                Err(err) => disclosures.push(storage_disclosure(&err)),
            }

            if let Err(err) = self.storage.upsert_pack(pack.clone()).await {
                disclosures.push(storage_disclosure(&err));
            }
            packs.push(pack);
        }

        tracker.enter(QueryStage::Synthesizing, None);

        // --- step 6: synthesize ----------------------------------------------------
        let synthesis = if request.llm_requirement == LlmRequirement::Disabled {
            None
        } else {
            match synthesize(self.llm.as_ref(), &governor, &intent, &packs, &mut disclosures).await {
                Ok(result) => Some(result),
                Err(err) => {
                    self.circuit_breaker.record_failure(FailureKind::General);
                    disclosures.push(Disclosure::new(
                        librarian_core::disclosure::DisclosureCode::ProviderUnavailable,
                        err.to_string(),
                    ));
                    Some(SynthesisResult {
                        answer: String::new(),
                        confidence: 0.1,
                        citations: Vec::new(),
                        key_insights: Vec::new(),
                        uncertainties: vec!["synthesis provider unavailable".to_string()],
                    })
                }
            }
        };

        tracker.enter(QueryStage::Verifying, None);

        // --- step 7: validate citations --------------------------------------------
        let pack_ids: Vec<PackId> = packs.iter().map(|p| p.id.clone()).collect();
        let synthesis = synthesis.map(|mut s| {
            let (kept, dropped) = validate_citations(&s.citations, &pack_ids);
            if dropped > 0 {
                disclosures.push(Disclosure::new(
                    librarian_core::disclosure::DisclosureCode::ConflictObjectsRequired,
                    format!("{dropped} citation(s) referenced a pack that was not assembled and were dropped"),
                ));
            }
            s.citations = kept;
            s
        });

        tracker.enter(QueryStage::Assembled, None);

        // --- step 8: compute adequacy -----------------------------------------------
        let mut object_kinds = vec![ObjectKind::Pack];
        if !packs.is_empty() {
            object_kinds.push(ObjectKind::Map);
        }
        let assembled = AssembledObjects {
            object_kinds,
            artifacts: Vec::new(),
        };
        let (adequacy, adequacy_disclosures) = compute_adequacy(&template, &assembled);
        disclosures.extend(adequacy_disclosures);

        let total_confidence = if packs.is_empty() {
            0.0
        } else {
            packs.iter().map(|p| p.confidence).sum::<f64>() / packs.len() as f64
        };

        self.append_stage_entry(
            &session_id,
            LedgerEntryKind::PackAssembly,
            json!({"packCount": packs.len(), "totalConfidence": total_confidence}),
        )
        .await;
        if let Some(s) = &synthesis {
            self.append_stage_entry(
                &session_id,
                LedgerEntryKind::SynthesisProduced,
                json!({"confidence": s.confidence, "citations": s.citations}),
            )
            .await;
        }
        self.append_stage_entry(
            &session_id,
            LedgerEntryKind::AdequacyChecked,
            json!({"blocking": adequacy.blocking, "missingEvidence": adequacy.missing_evidence}),
        )
        .await;

        // --- step 9: close the ledger session ---------------------------------------
        self.close_session(&session_id).await;
        self.append_stage_entry(&session_id, LedgerEntryKind::SessionClosed, json!({})).await;

        tracker.enter(QueryStage::Closed, None);
        tracker.finish(None);

        // --- step 10: record the query episode --------------------------------------
        let episode = QueryEpisode::new(Uuid::new_v4().to_string(), intent.clone(), &pack_ids, total_confidence);
        if let Err(err) = record_episode(self.storage.as_ref(), &episode).await {
            disclosures.push(storage_disclosure(&err));
        }

        self.circuit_breaker.record_success();

        let latency_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        let stages = tracker
            .trail
            .iter()
            .map(|(stage, duration_ms)| StageTiming {
                stage: stage.label().to_string(),
                duration_ms: *duration_ms,
            })
            .collect();

        Ok(QueryResponse {
            trace_id,
            packs,
            total_confidence,
            synthesis,
            adequacy: Some(adequacy),
            disclosures: disclosures.iter().map(|d| d.to_string()).collect(),
            stages,
            latency_ms,
            cache_hit: false,
            construction_plan: Some(ConstructionPlan {
                template_id: template.id.as_str().to_string(),
            }),
            version: "1".to_string(),
        })
    }

    fn contract_for(&self, llm_requirement: LlmRequirement, _template: &crate::template::ConstructionTemplate) -> CapabilityContract {
        let mut required = vec![Capability::StorageSqlite];
        let mut optional = vec![Capability::EmbeddingProvider, Capability::CrossEncoder];
        match llm_requirement {
            LlmRequirement::Required => required.push(Capability::LlmChat),
            LlmRequirement::Optional => optional.push(Capability::LlmChat),
            LlmRequirement::Disabled => {}
        }
        CapabilityContract { required, optional }
    }

    fn assemble_blocked_response(
        &self,
        trace_id: String,
        template_id: &str,
        disclosures: Vec<Disclosure>,
        started_at: chrono::DateTime<Utc>,
        tracker: &mut StageTracker<'_>,
    ) -> QueryResponse {
        tracker.finish(None);
        let latency_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        QueryResponse {
            trace_id,
            packs: Vec::new(),
            total_confidence: 0.0,
            synthesis: None,
            adequacy: Some(Adequacy {
                spec: template_id.to_string(),
                blocking: true,
                missing_evidence: vec!["capability_missing".to_string()],
                difficulties: Vec::new(),
            }),
            disclosures: disclosures.iter().map(|d| d.to_string()).collect(),
            stages: tracker
                .trail
                .iter()
                .map(|(stage, duration_ms)| StageTiming {
                    stage: stage.label().to_string(),
                    duration_ms: *duration_ms,
                })
                .collect(),
            latency_ms,
            cache_hit: false,
            construction_plan: Some(ConstructionPlan {
                template_id: template_id.to_string(),
            }),
            version: "1".to_string(),
        }
    }

    async fn append_stage_entry(&self, session_id: &Option<String>, kind: LedgerEntryKind, payload: serde_json::Value) {
        let Some(session_id) = session_id else {
            return;
        };
        let entry = LedgerEntry {
            id: librarian_core::ids::LedgerEntryId::generate(),
            timestamp: Utc::now(),
            kind,
            payload,
            provenance: "librarian-pipeline".to_string(),
            confidence: None,
            related_entries: Vec::new(),
            session_id: Some(SessionId::new(session_id.clone())),
        };
        let _ = self.storage.append_ledger_entry(entry).await;
    }

    async fn close_session(&self, session_id: &Option<String>) {
        if let Some(session_id) = session_id {
            let _ = self.storage.close_ledger_session(session_id).await;
        }
    }
}

fn storage_disclosure(err: &StorageError) -> Disclosure {
    Disclosure::new(
        librarian_core::disclosure::DisclosureCode::ProviderUnavailable,
        format!("storage error: {}", err.message),
    )
}
