//! Shared data model, error taxonomy, sanitizer, configuration, and governor for the
//! librarian code knowledge service workspace.
//!
//! This crate has no I/O of its own: storage, embeddings, retrieval, evidence,
//! indexing, rate-limiting, and pipeline orchestration each live in their own crate and
//! depend on this one for shared types.

pub mod config;
pub mod disclosure;
pub mod error;
pub mod governor;
pub mod ids;
pub mod model;
pub mod sanitizer;

pub use disclosure::{Disclosure, DisclosureCode};
pub use governor::Governor;
pub use ids::REPLAY_UNAVAILABLE_TRACE;
