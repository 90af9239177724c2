//! Durable storage for the knowledge service: SQLite-backed persistence for files,
//! context packs, the knowledge graph, the evidence graph, and the replay ledger.

pub mod connection;
pub mod migrations;
pub mod query;
pub mod sqlite_store;
pub mod store;

pub use connection::ConnectionHandle;
pub use query::{ClaimQuery, EdgeQuery, OrderBy, Page, PackQuery, SortDirection};
pub use sqlite_store::SqliteStore;
pub use store::{AccessOutcome, Storage};
