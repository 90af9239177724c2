//! Synthesis (spec §4.6 step 6): ask the configured [`LlmProvider`] for a JSON answer
//! over the assembled packs. A malformed response gets exactly one repair-pass retry
//! (re-prompting with the parse error); persistent failure falls back to an
//! unstructured, low-confidence answer plus a `synthesis_unstructured` disclosure
//! rather than failing the query outright.

use librarian_core::disclosure::{Disclosure, DisclosureCode};
use librarian_core::error::ProviderError;
use librarian_core::governor::Governor;
use librarian_core::model::ContextPack;
use serde::Deserialize;

use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::response::SynthesisResult;

#[derive(Debug, Deserialize)]
struct RawSynthesis {
    answer: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    citations: Vec<String>,
    #[serde(rename = "keyInsights", default)]
    key_insights: Vec<String>,
    #[serde(default)]
    uncertainties: Vec<String>,
}

const UNSTRUCTURED_FALLBACK_CONFIDENCE: f64 = 0.15;

fn build_prompt(intent: &str, packs: &[ContextPack]) -> String {
    let mut body = String::new();
    body.push_str("Answer the request using only the packs below. Respond with a single JSON object: ");
    body.push_str("{\"answer\": string, \"confidence\": number 0..1, \"citations\": [packId...], ");
    body.push_str("\"keyInsights\": [string...], \"uncertainties\": [string...]}.\n\n");
    body.push_str("Request: ");
    body.push_str(intent);
    body.push_str("\n\nPacks:\n");
    for pack in packs {
        body.push_str(&format!("- {} ({}): {}\n", pack.id.as_str(), pack.data.kind_label(), pack.summary));
    }
    body
}

fn try_parse(raw: &str) -> Result<RawSynthesis, serde_json::Error> {
    serde_json::from_str(raw)
}

fn unstructured_result(raw_text: &str, disclosures: &mut Vec<Disclosure>) -> SynthesisResult {
    disclosures.push(Disclosure::new(
        DisclosureCode::SynthesisUnstructured,
        "synthesis response could not be parsed as structured JSON after a repair attempt",
    ));
    SynthesisResult {
        answer: raw_text.to_string(),
        confidence: UNSTRUCTURED_FALLBACK_CONFIDENCE,
        citations: Vec::new(),
        key_insights: Vec::new(),
        uncertainties: vec!["synthesis output was not valid structured JSON".to_string()],
    }
}

/// Run one synthesis attempt plus (on a parse failure) one repair pass. Never returns
/// an `Err` for a malformed LLM response — only for a provider-level failure, which the
/// caller should turn into a `provider_unavailable` disclosure and an unstructured
/// fallback of its own.
pub async fn synthesize(
    provider: &dyn LlmProvider,
    governor: &Governor,
    intent: &str,
    packs: &[ContextPack],
    disclosures: &mut Vec<Disclosure>,
) -> Result<SynthesisResult, ProviderError> {
    let prompt = build_prompt(intent, packs);
    let first = provider
        .chat(
            governor,
            ChatRequest {
                messages: vec![ChatMessage::system("You are a precise code-context synthesizer."), ChatMessage::user(prompt.clone())],
                max_tokens: None,
            },
        )
        .await?;

    match try_parse(&first.content) {
        Ok(parsed) => Ok(SynthesisResult {
            answer: parsed.answer,
            confidence: parsed.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
            citations: parsed.citations,
            key_insights: parsed.key_insights,
            uncertainties: parsed.uncertainties,
        }),
        Err(parse_err) => {
            let repair_prompt = format!(
                "Your previous response failed to parse as JSON ({parse_err}). Re-emit ONLY the JSON object, no prose:\n{}",
                first.content
            );
            let repaired = provider
                .chat(
                    governor,
                    ChatRequest {
                        messages: vec![ChatMessage::system("You are a precise code-context synthesizer."), ChatMessage::user(repair_prompt)],
                        max_tokens: None,
                    },
                )
                .await?;
            match try_parse(&repaired.content) {
                Ok(parsed) => Ok(SynthesisResult {
                    answer: parsed.answer,
                    confidence: parsed.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
                    citations: parsed.citations,
                    key_insights: parsed.key_insights,
                    uncertainties: parsed.uncertainties,
                }),
                Err(_) => Ok(unstructured_result(&repaired.content, disclosures)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use librarian_core::config::GovernorBudgets;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedProvider {
        responses: Vec<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn model_id(&self) -> &str {
            "scripted"
        }
        fn provider_name(&self) -> &str {
            "scripted"
        }
        async fn chat(&self, _governor: &Governor, _request: ChatRequest) -> Result<crate::llm::ChatResponse, ProviderError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(crate::llm::ChatResponse {
                content: self.responses[i.min(self.responses.len() - 1)].to_string(),
                tokens_in: 10,
                tokens_out: 10,
            })
        }
    }

    #[tokio::test]
    async fn well_formed_response_parses_on_the_first_attempt() {
        let provider = ScriptedProvider {
            responses: vec!["{\"answer\":\"ok\",\"confidence\":0.9,\"citations\":[\"p1\"],\"keyInsights\":[],\"uncertainties\":[]}"],
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let governor = Governor::new(GovernorBudgets::default());
        let mut disclosures = Vec::new();
        let result = synthesize(&provider, &governor, "explain foo", &[], &mut disclosures).await.unwrap();
        assert_eq!(result.answer, "ok");
        assert!(disclosures.is_empty());
    }

    #[tokio::test]
    async fn malformed_response_is_repaired_on_the_second_attempt() {
        let provider = ScriptedProvider {
            responses: vec!["not json", "{\"answer\":\"fixed\",\"confidence\":0.4,\"citations\":[],\"keyInsights\":[],\"uncertainties\":[]}"],
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let governor = Governor::new(GovernorBudgets::default());
        let mut disclosures = Vec::new();
        let result = synthesize(&provider, &governor, "explain foo", &[], &mut disclosures).await.unwrap();
        assert_eq!(result.answer, "fixed");
        assert!(disclosures.is_empty());
    }

    #[tokio::test]
    async fn persistently_malformed_response_falls_back_to_unstructured() {
        let provider = ScriptedProvider {
            responses: vec!["still not json", "still not json either"],
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let governor = Governor::new(GovernorBudgets::default());
        let mut disclosures = Vec::new();
        let result = synthesize(&provider, &governor, "explain foo", &[], &mut disclosures).await.unwrap();
        assert!((result.confidence - UNSTRUCTURED_FALLBACK_CONFIDENCE).abs() < 1e-9);
        assert_eq!(disclosures.len(), 1);
    }
}
