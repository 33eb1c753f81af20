//! In-memory entity store for testing and development.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use civicore_shared::Result;

use crate::entity::Entity;
use crate::EntityStore;

/// In-memory store backed by a `BTreeMap`.
///
/// Useful for tests and dry runs. Not suitable for production: data is lost
/// on process exit.
#[derive(Default)]
pub struct MemoryStore {
    entities: RwLock<BTreeMap<(String, String), Entity>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities across all kinds.
    pub fn len(&self) -> usize {
        self.entities.read().unwrap().len()
    }

    /// Whether the store holds no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all stored entities.
    pub fn clear(&self) {
        self.entities.write().unwrap().clear();
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn upsert(&self, entity: Entity) -> Result<()> {
        let key = (entity.kind.clone(), entity.key.clone());
        self.entities.write().unwrap().insert(key, entity);
        Ok(())
    }

    async fn get(&self, kind: &str, key: &str) -> Result<Option<Entity>> {
        Ok(self
            .entities
            .read()
            .unwrap()
            .get(&(kind.to_string(), key.to_string()))
            .cloned())
    }

    async fn query_by_kind(&self, kind: &str) -> Result<Vec<Entity>> {
        Ok(self
            .entities
            .read()
            .unwrap()
            .values()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect())
    }
}
