//! Entity store adapter for Civicore.
//!
//! The persistence seam both pipelines share. [`EntityStore`] exposes
//! key-based upsert and kind-scoped query over generic [`Entity`] records;
//! backends are pluggable:
//! - [`MemoryStore`] — in-memory map, for tests and dry runs
//! - [`SqliteStore`] — libSQL file database with versioned migrations
//!
//! Long-text fields ([`FieldValue::LongText`]) are stored but never enter
//! secondary index structures.

mod entity;
mod memory;
mod migrations;
pub mod records;
mod sqlite;

use async_trait::async_trait;
use civicore_shared::Result;

pub use entity::{
    Entity, FieldMap, FieldValue, KIND_CANDIDATE, KIND_ELECTION, KIND_NEWS_ARTICLE,
};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Key-based upsert and kind-scoped query over entities.
///
/// `upsert` replaces the record stored under (kind, key); merge semantics
/// are the caller's concern (read, mutate, upsert).
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert or replace the entity stored under its (kind, key).
    async fn upsert(&self, entity: Entity) -> Result<()>;

    /// Point read by (kind, key).
    async fn get(&self, kind: &str, key: &str) -> Result<Option<Entity>>;

    /// All entities of a kind, ordered by key.
    async fn query_by_kind(&self, kind: &str) -> Result<Vec<Entity>>;
}
