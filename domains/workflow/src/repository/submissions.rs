//! Submission record repository
//!
//! Maps [`SubmissionRecord`] onto the document store's JSON envelope. The
//! store version rides alongside the record, never inside it: mutating
//! callers hold a `(record, version)` pair and commit through
//! [`SubmissionRepository::save`], the conditional-write path.

use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use serde_json::Value;
use tokio_stream::StreamExt;
use uuid::Uuid;

use thesistrack_common::{Error, Result};
use thesistrack_store::{DocumentStore, VersionedDocument};

use crate::domain::entities::{SubmissionRecord, WorkflowKind};

const COLLECTION: &str = "submissions";

/// Stream of decoded record snapshots from a watch subscription
pub type SubmissionStream = Pin<Box<dyn Stream<Item = Result<SubmissionRecord>> + Send>>;

#[derive(Clone)]
pub struct SubmissionRepository {
    store: Arc<dyn DocumentStore>,
}

impl SubmissionRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn decode(document: &VersionedDocument) -> Result<SubmissionRecord> {
        Ok(serde_json::from_value(document.data.clone())?)
    }

    /// Create the record, enforcing one active record per (subject, kind).
    ///
    /// A record blocks creation until it reaches `approved`; approved records
    /// stay forever (the audit trail is permanent) but no longer count as
    /// active.
    pub async fn create(&self, record: &SubmissionRecord) -> Result<SubmissionRecord> {
        if let Some(existing) = self
            .find_active_by_subject(record.subject_id, record.kind)
            .await?
        {
            return Err(Error::AlreadyExists(format!(
                "an active {} submission ({}) already exists for subject {}",
                record.kind, existing.id, record.subject_id
            )));
        }
        let data = serde_json::to_value(record)?;
        let document = self.store.insert(COLLECTION, record.id, data).await?;
        Self::decode(&document)
    }

    /// Find a record by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<SubmissionRecord>> {
        let document = self.store.load(COLLECTION, id).await?;
        document.as_ref().map(Self::decode).transpose()
    }

    /// Find a record by ID together with its concurrency token
    pub async fn find_versioned(&self, id: Uuid) -> Result<Option<(SubmissionRecord, i64)>> {
        let document = self.store.load(COLLECTION, id).await?;
        match document {
            Some(document) => Ok(Some((Self::decode(&document)?, document.version))),
            None => Ok(None),
        }
    }

    /// List all records for a subject, oldest first
    pub async fn find_by_subject(&self, subject_id: Uuid) -> Result<Vec<SubmissionRecord>> {
        let documents = self
            .store
            .find_by_field(COLLECTION, "subject_id", &Value::String(subject_id.to_string()))
            .await?;
        let mut records = documents
            .iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>>>()?;
        records.sort_by_key(|record| record.created_at);
        Ok(records)
    }

    /// The non-terminal record for (subject, kind), if one exists
    pub async fn find_active_by_subject(
        &self,
        subject_id: Uuid,
        kind: WorkflowKind,
    ) -> Result<Option<SubmissionRecord>> {
        Ok(self
            .find_by_subject(subject_id)
            .await?
            .into_iter()
            .find(|record| record.kind == kind && !record.is_terminal()))
    }

    /// Conditionally persist a mutated record.
    ///
    /// Fails with `Conflict` when another writer committed since
    /// `expected_version` was read.
    pub async fn save(
        &self,
        record: &SubmissionRecord,
        expected_version: i64,
    ) -> Result<SubmissionRecord> {
        let data = serde_json::to_value(record)?;
        let document = self
            .store
            .save_conditional(COLLECTION, record.id, expected_version, data)
            .await?;
        Self::decode(&document)
    }

    /// Live subscription to the active record for (subject, kind)
    pub async fn watch_subject(
        &self,
        subject_id: Uuid,
        kind: WorkflowKind,
    ) -> Result<SubmissionStream> {
        let record = self
            .find_active_by_subject(subject_id, kind)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "no active {kind} submission for subject {subject_id}"
                ))
            })?;
        self.watch(record.id).await
    }

    /// Live subscription to a record's committed changes
    pub async fn watch(&self, id: Uuid) -> Result<SubmissionStream> {
        let mut documents = self.store.subscribe(COLLECTION, id).await?;
        let stream = async_stream::stream! {
            while let Some(document) = documents.next().await {
                yield Self::decode(&document);
            }
        };
        Ok(Box::pin(stream))
    }
}
