//! Postgres-backed document store
//!
//! Documents live in a single `documents` table keyed by (collection, id),
//! with the payload as `jsonb` and the compare-and-swap version as a bigint.
//! The conditional write is a single `UPDATE ... WHERE version = $expected`,
//! so the version check and the write commit atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DocumentStore, DocumentStream, StoreError, VersionedDocument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT        NOT NULL,
    id          UUID        NOT NULL,
    data        JSONB       NOT NULL,
    version     BIGINT      NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, id)
)
"#;

/// How often `subscribe` polls for committed writes
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// 15-minute maximum subscription duration at 1s intervals prevents resource
/// leaks from abandoned watches
const MAX_POLLS: u32 = 900;

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    data: sqlx::types::Json<Value>,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for VersionedDocument {
    fn from(row: DocumentRow) -> Self {
        VersionedDocument {
            id: row.id,
            data: row.data.0,
            version: row.version,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres document store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist yet. Run once at startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        data: Value,
    ) -> Result<VersionedDocument, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (collection, id, data, version, updated_at)
            VALUES ($1, $2, $3, 1, NOW())
            ON CONFLICT (collection, id) DO NOTHING
            RETURNING id, data, version, updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(sqlx::types::Json(data))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or(StoreError::AlreadyExists(id))
    }

    async fn load(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<VersionedDocument>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data, version, updated_at FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn save_conditional(
        &self,
        collection: &str,
        id: Uuid,
        expected_version: i64,
        data: Value,
    ) -> Result<VersionedDocument, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents
            SET data = $4, version = version + 1, updated_at = NOW()
            WHERE collection = $1 AND id = $2 AND version = $3
            RETURNING id, data, version, updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(expected_version)
        .bind(sqlx::types::Json(data))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            // The guard did not match: either the document is gone or another
            // writer committed first. Re-read to report which.
            None => match self.load(collection, id).await? {
                Some(current) => Err(StoreError::VersionMismatch {
                    expected: expected_version,
                    actual: current.version,
                }),
                None => Err(StoreError::NotFound(id)),
            },
        }
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<VersionedDocument>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data, version, updated_at FROM documents WHERE collection = $1 AND data->$2 = $3",
        )
        .bind(collection)
        .bind(field)
        .bind(sqlx::types::Json(value.clone()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn subscribe(&self, collection: &str, id: Uuid) -> Result<DocumentStream, StoreError> {
        let store = self.clone();
        let collection = collection.to_string();

        let stream = async_stream::stream! {
            let mut last_version = 0;
            let mut polls: u32 = 0;

            loop {
                match store.load(&collection, id).await {
                    Ok(Some(document)) => {
                        if document.version > last_version {
                            last_version = document.version;
                            yield document;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::error!(error = %err, document_id = %id, "watch poll failed");
                        break;
                    }
                }

                polls += 1;
                if polls >= MAX_POLLS {
                    break;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        Ok(Box::pin(stream))
    }
}
