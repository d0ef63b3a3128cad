//! In-memory document store
//!
//! Backs development mode and the test suites. Writes go through the same
//! compare-and-swap discipline as the durable store, and committed writes are
//! fanned out to subscribers over a broadcast channel.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use async_trait::async_trait;
use chrono::Utc;

use crate::{DocumentStore, DocumentStream, StoreError, VersionedDocument};

/// Committed write broadcast to subscribers
#[derive(Debug, Clone)]
struct ChangeEvent {
    collection: String,
    document: VersionedDocument,
}

/// In-memory watchable document store
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<Uuid, VersionedDocument>>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn publish(&self, collection: &str, document: &VersionedDocument) {
        // No receivers is fine; subscribers join and leave at will
        let _ = self.changes.send(ChangeEvent {
            collection: collection.to_string(),
            document: document.clone(),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        data: Value,
    ) -> Result<VersionedDocument, StoreError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        let document = VersionedDocument {
            id,
            data,
            version: 1,
            updated_at: Utc::now(),
        };
        documents.insert(id, document.clone());
        drop(collections);
        self.publish(collection, &document);
        Ok(document)
    }

    async fn load(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<VersionedDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(&id))
            .cloned())
    }

    async fn save_conditional(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        data: Value,
    ) -> Result<VersionedDocument, StoreError> {
        let mut collections = self.collections.write().await;
        let documents = collections
            .get_mut(collection)
            .ok_or(StoreError::NotFound(id))?;
        let stored = documents.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionMismatch {
                expected: expected_version,
                actual: stored.version,
            });
        }

        stored.data = data;
        stored.version += 1;
        stored.updated_at = Utc::now();
        let document = stored.clone();
        drop(collections);
        self.publish(collection, &document);
        Ok(document)
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<VersionedDocument>, StoreError> {
        let collections = self.collections.read().await;
        let matches = collections
            .get(collection)
            .map(|documents| {
                documents
                    .values()
                    .filter(|doc| doc.data.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }

    async fn subscribe(&self, collection: &str, id: Uuid) -> Result<DocumentStream, StoreError> {
        // Subscribe before reading the snapshot so a write landing in between
        // is not missed; stale events are filtered by version below.
        let mut rx = self.changes.subscribe();
        let snapshot = self.load(collection, id).await?;
        let collection = collection.to_string();

        let stream = async_stream::stream! {
            let mut last_version = 0;
            if let Some(document) = snapshot {
                last_version = document.version;
                yield document;
            }
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if event.collection == collection
                            && event.document.id == id
                            && event.document.version > last_version
                        {
                            last_version = event.document.version;
                            yield event.document;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
