//! The provider boundary: anything that turns sanitized text into raw (not necessarily
//! normalized) vectors. Production binaries supply an HTTP-backed implementation;
//! [`service::EmbeddingService`](crate::service::EmbeddingService) handles redaction,
//! retry, and normalization on top regardless of which provider is plugged in.

use async_trait::async_trait;
use librarian_core::error::ProviderError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier of the underlying model, used to detect a dimension mismatch
    /// against an index built with a different model (spec §4.3 step 2).
    fn model_id(&self) -> &str;

    fn provider_name(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Approximate token count for budget accounting; need not be exact.
    fn estimate_tokens(&self, text: &str) -> u32;

    /// Embed one batch of already-redacted texts. Implementations classify their own
    /// failures into [`ProviderError`] variants; the service layer applies the
    /// lowercased-substring non-retryable rule on top for opaque upstream errors.
    async fn embed_raw(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, ProviderError>;
}
