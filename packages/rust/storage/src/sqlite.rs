//! libSQL-backed entity store.
//!
//! One `entities` table keyed by (kind, key). Indexable fields and long-text
//! fields are serialized into separate JSON columns so that article bodies
//! never end up under an index (see `migrations.rs`).

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};

use civicore_shared::{CivicoreError, Result};

use crate::entity::{Entity, FieldMap};
use crate::{EntityStore, migrations};

/// Entity store handle wrapping a libSQL database.
pub struct SqliteStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CivicoreError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CivicoreError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CivicoreError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    CivicoreError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn upsert(&self, entity: Entity) -> Result<()> {
        let (props, blobs) = entity.partition_fields();
        let props_json = serde_json::to_string(&props)
            .map_err(|e| CivicoreError::Storage(e.to_string()))?;
        let blobs_json = if blobs.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&blobs)
                    .map_err(|e| CivicoreError::Storage(e.to_string()))?,
            )
        };
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO entities (kind, key, props, blobs, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (kind, key) DO UPDATE SET
                     props = excluded.props,
                     blobs = excluded.blobs,
                     updated_at = excluded.updated_at",
                params![
                    entity.kind.as_str(),
                    entity.key.as_str(),
                    props_json.as_str(),
                    blobs_json.as_deref(),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| CivicoreError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, kind: &str, key: &str) -> Result<Option<Entity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT props, blobs FROM entities WHERE kind = ?1 AND key = ?2",
                params![kind, key],
            )
            .await
            .map_err(|e| CivicoreError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let props: String = row
                    .get(0)
                    .map_err(|e| CivicoreError::Storage(e.to_string()))?;
                let blobs: Option<String> = row
                    .get(1)
                    .map_err(|e| CivicoreError::Storage(e.to_string()))?;
                Ok(Some(Entity {
                    kind: kind.to_string(),
                    key: key.to_string(),
                    fields: decode_fields(&props, blobs.as_deref())?,
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(CivicoreError::Storage(e.to_string())),
        }
    }

    async fn query_by_kind(&self, kind: &str) -> Result<Vec<Entity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT key, props, blobs FROM entities WHERE kind = ?1 ORDER BY key",
                params![kind],
            )
            .await
            .map_err(|e| CivicoreError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let key: String = row
                .get(0)
                .map_err(|e| CivicoreError::Storage(e.to_string()))?;
            let props: String = row
                .get(1)
                .map_err(|e| CivicoreError::Storage(e.to_string()))?;
            let blobs: Option<String> = row
                .get(2)
                .map_err(|e| CivicoreError::Storage(e.to_string()))?;
            results.push(Entity {
                kind: kind.to_string(),
                key,
                fields: decode_fields(&props, blobs.as_deref())?,
            });
        }
        Ok(results)
    }
}

/// Merge the two JSON field columns back into a single field map.
fn decode_fields(props: &str, blobs: Option<&str>) -> Result<FieldMap> {
    let mut fields: FieldMap = serde_json::from_str(props)
        .map_err(|e| CivicoreError::Storage(format!("corrupt props column: {e}")))?;
    if let Some(blobs) = blobs {
        let long: FieldMap = serde_json::from_str(blobs)
            .map_err(|e| CivicoreError::Storage(format!("corrupt blobs column: {e}")))?;
        fields.extend(long);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{FieldValue, KIND_ELECTION, KIND_NEWS_ARTICLE};

    async fn temp_store(tag: &str) -> (SqliteStore, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("civicore-{tag}-{}", uuid::Uuid::now_v7()));
        let store = SqliteStore::open(&dir.join("test.db")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn upsert_get_roundtrip() {
        let (store, dir) = temp_store("roundtrip").await;

        let entity = Entity::new(KIND_ELECTION, "General Election")
            .with_field("query_id", FieldValue::Str("4000".into()))
            .with_field("offices", FieldValue::StrList(vec!["Governor".into()]))
            .with_field("incumbents", FieldValue::BoolList(vec![false]));
        store.upsert(entity.clone()).await.unwrap();

        let stored = store
            .get(KIND_ELECTION, "General Election")
            .await
            .unwrap()
            .expect("stored entity");
        assert_eq!(stored, entity);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn long_text_survives_in_blob_column() {
        let (store, dir) = temp_store("blobs").await;

        let body = "word ".repeat(5000);
        let entity = Entity::new(KIND_NEWS_ARTICLE, "abc123")
            .with_field("title", FieldValue::Str("headline".into()))
            .with_field("content", FieldValue::LongText(body.clone()));
        store.upsert(entity).await.unwrap();

        let stored = store.get(KIND_NEWS_ARTICLE, "abc123").await.unwrap().unwrap();
        assert_eq!(
            stored.field("content").and_then(|f| f.as_long_text()),
            Some(body.as_str())
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn upsert_overwrites_and_reopen_persists() {
        let dir = std::env::temp_dir().join(format!("civicore-reopen-{}", uuid::Uuid::now_v7()));
        let db_path = dir.join("test.db");

        {
            let store = SqliteStore::open(&db_path).await.unwrap();
            store
                .upsert(
                    Entity::new(KIND_ELECTION, "Primary")
                        .with_field("state", FieldValue::Str("ny".into())),
                )
                .await
                .unwrap();
            store
                .upsert(
                    Entity::new(KIND_ELECTION, "Primary")
                        .with_field("state", FieldValue::Str("NY".into())),
                )
                .await
                .unwrap();
        }

        // Reopen and make sure the second write won and survived.
        let store = SqliteStore::open(&db_path).await.unwrap();
        let all = store.query_by_kind(KIND_ELECTION).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].field("state").and_then(|f| f.as_str()), Some("NY"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
