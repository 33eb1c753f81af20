//! SQL migration definitions for the Civicore entity database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: entities",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Kind-scoped, key-addressed entity records.
-- `props` holds the indexable fields as JSON; `blobs` holds long-text
-- fields (article bodies) and deliberately has no index on it.
CREATE TABLE IF NOT EXISTS entities (
    kind       TEXT NOT NULL,
    key        TEXT NOT NULL,
    props      TEXT NOT NULL,
    blobs      TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (kind, key)
);

CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities(kind);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
