//! Error taxonomy shared by every crate in the workspace.
//!
//! Each variant corresponds to one of the typed errors named in the component design:
//! `ValidationError`, `StorageError`, `ProviderError`, `EpistemicError`,
//! `CapabilityMissing`, and `BudgetExceeded`/`Canceled`. Retryability is carried on the
//! variant itself rather than inferred by callers.

use thiserror::Error;

/// Bad input or schema mismatch, refused before any side effect. Never retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("validation error: {message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Storage-layer failure. `retryable` distinguishes a transient lock/IO condition from
/// schema corruption.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("storage error: {message}")]
pub struct StorageError {
    pub message: String,
    pub retryable: bool,
}

impl StorageError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Failure from an embedding or LLM provider boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider timed out after {0}ms")]
    Timeout(u64),
    #[error("provider rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("provider authentication failed: {0}")]
    Auth(String),
    #[error("invalid request to provider: {0}")]
    InvalidRequest(String),
    #[error("input blocked by redaction policy: {0}")]
    RedactionBlocked(String),
}

impl ProviderError {
    /// Non-retryable substrings per §4.2: a lowercased match on any of these fails fast.
    const NON_RETRYABLE_SUBSTRINGS: &'static [&'static str] = &[
        "provider_unavailable",
        "embedding_redaction_blocked",
        "invalid_input",
        "invalid_request",
    ];

    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::RateLimited { .. } => true,
            ProviderError::Unavailable(_) | ProviderError::Auth(_) => false,
            ProviderError::InvalidRequest(_) | ProviderError::RedactionBlocked(_) => false,
        }
    }

    /// Classify an opaque provider error message using the lowercased-substring rule.
    pub fn classify_message(message: &str) -> bool {
        let lowered = message.to_lowercase();
        !Self::NON_RETRYABLE_SUBSTRINGS
            .iter()
            .any(|needle| lowered.contains(needle))
    }
}

/// A contradiction was detected where a single answer was demanded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("epistemic conflict: claims {claim_a} and {claim_b} contradict ({explanation})")]
pub struct EpistemicError {
    pub claim_a: String,
    pub claim_b: String,
    pub explanation: String,
}

/// A required capability was not available to satisfy a query's contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("capability missing: {0}")]
pub struct CapabilityMissingError(pub String);

/// The governor aborted the current query: budget exceeded or explicit cancellation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernorError {
    #[error("budget exceeded: {resource} ({used}/{limit})")]
    BudgetExceeded {
        resource: String,
        used: u64,
        limit: u64,
    },
    #[error("query canceled")]
    Canceled,
}

/// Umbrella error used at crate boundaries that may surface any of the above.
#[derive(Debug, Error)]
pub enum LibrarianError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Epistemic(#[from] EpistemicError),
    #[error(transparent)]
    CapabilityMissing(#[from] CapabilityMissingError),
    #[error(transparent)]
    Governor(#[from] GovernorError),
}

impl LibrarianError {
    /// Whether retrying the operation that produced this error is ever sensible.
    pub fn is_retryable(&self) -> bool {
        match self {
            LibrarianError::Validation(_) => false,
            LibrarianError::Storage(e) => e.retryable,
            LibrarianError::Provider(e) => e.is_retryable(),
            LibrarianError::Epistemic(_) => false,
            LibrarianError::CapabilityMissing(_) => false,
            LibrarianError::Governor(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_classifies_non_retryable_substrings() {
        assert!(!ProviderError::classify_message("Provider_Unavailable: down for maintenance"));
        assert!(!ProviderError::classify_message("Embedding_Redaction_Blocked: secret found"));
        assert!(ProviderError::classify_message("connection reset by peer"));
    }

    #[test]
    fn storage_error_retryability() {
        assert!(StorageError::transient("lock timeout").retryable);
        assert!(!StorageError::corruption("schema mismatch").retryable);
    }
}
