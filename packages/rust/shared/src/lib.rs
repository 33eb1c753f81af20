//! Shared types, error model, and configuration for Civicore.
//!
//! This crate is the foundation depended on by all other Civicore crates.
//! It provides:
//! - [`CivicoreError`] — the unified error type
//! - Domain types ([`Election`], [`Candidate`], [`NewsArticle`]) and their
//!   deterministic identifiers
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CivicApiConfig, CompilerConfig, CrawlPoliciesConfig, DefaultsConfig, SearchConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    resolve_db_path,
};
pub use error::{CivicoreError, Result};
pub use types::{
    Candidate, ELECTION_DAY_HOUR, Election, NewsArticle, PARTY_SUFFIX, PLACEHOLDER_INCUMBENCY,
    TEST_ELECTION_ID, article_key, candidate_id,
};
