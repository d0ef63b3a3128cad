//! Watchable document store abstraction for ThesisTrack
//!
//! The workflow engine needs exactly three things from durable storage:
//! versioned document reads, conditional (compare-and-swap) writes, and a
//! push-based change feed per document. This crate defines that contract as
//! an object-safe trait with two implementations:
//! - [`MemoryStore`]: in-process store for tests and development
//! - [`PgStore`]: Postgres-backed store for deployment

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A document snapshot together with its storage version.
///
/// The version is the compare-and-swap token: it increments on every
/// committed write and is never surfaced to UI-facing code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedDocument {
    pub id: Uuid,
    pub data: Value,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Errors surfaced by document store implementations.
///
/// `VersionMismatch` is the only contention signal; transport failures are
/// kept distinct (`Unavailable`) so callers can apply retry policy to them
/// without also retrying lost races.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {0} already exists")]
    AlreadyExists(Uuid),

    #[error("document {0} not found")]
    NotFound(Uuid),

    #[error("version mismatch: expected {expected}, stored {actual}")]
    VersionMismatch { expected: i64, actual: i64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<StoreError> for thesistrack_common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => {
                thesistrack_common::Error::AlreadyExists(format!("document {id} already exists"))
            }
            StoreError::NotFound(id) => {
                thesistrack_common::Error::NotFound(format!("document {id} not found"))
            }
            StoreError::VersionMismatch { expected, actual } => {
                thesistrack_common::Error::Conflict(format!(
                    "document changed concurrently (expected version {expected}, stored {actual})"
                ))
            }
            StoreError::Serialization(err) => thesistrack_common::Error::Serialization(err),
            StoreError::Unavailable(msg) => thesistrack_common::Error::Unavailable(msg),
        }
    }
}

/// Stream of document snapshots produced by [`DocumentStore::subscribe`].
pub type DocumentStream = Pin<Box<dyn Stream<Item = VersionedDocument> + Send>>;

/// The storage contract consumed by the workflow engine.
///
/// Implementations must guarantee that `save_conditional` is atomic per
/// document: given two concurrent writers presenting the same expected
/// version, exactly one commits and the other observes `VersionMismatch`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document at version 1.
    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        data: Value,
    ) -> Result<VersionedDocument, StoreError>;

    /// Load a document snapshot, or `None` if it does not exist.
    async fn load(&self, collection: &str, id: Uuid)
        -> Result<Option<VersionedDocument>, StoreError>;

    /// Conditionally replace a document's data.
    ///
    /// Commits only when the stored version still equals `expected_version`;
    /// the committed document carries `expected_version + 1`.
    async fn save_conditional(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        data: Value,
    ) -> Result<VersionedDocument, StoreError>;

    /// Find documents whose top-level `field` equals `value`.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<VersionedDocument>, StoreError>;

    /// Subscribe to a document's change feed.
    ///
    /// Yields the current snapshot first (when the document exists), then one
    /// snapshot per committed write, in version order.
    async fn subscribe(&self, collection: &str, id: Uuid) -> Result<DocumentStream, StoreError>;
}
