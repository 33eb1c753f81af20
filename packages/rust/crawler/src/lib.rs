//! Politeness-constrained news crawling for Civicore.
//!
//! This crate provides:
//! - [`robots`] — robots.txt permission resolution with fail-open policy
//! - [`politeness`] — per-host crawl spacing behind an injectable clock
//! - [`extract`] — boilerplate-stripping article extraction
//! - [`process`] — word-bounded abbreviated content
//! - [`relevance`] / [`search`] — the external collaborator seams
//! - [`engine`] — the per-candidate crawl orchestrator

pub mod engine;
pub mod extract;
pub mod politeness;
pub mod process;
pub mod relevance;
pub mod robots;
pub mod search;

pub use engine::{CrawlSummary, NewsCrawler};
pub use extract::extract_article;
pub use politeness::{Clock, PolitenessGate, ReserveInterrupted, TokioClock};
pub use process::{MAX_WORD_COUNT, abbreviate, process};
pub use relevance::{MentionRelevancy, RelevancyChecker};
pub use robots::{Grant, RobotsTxt, fetch_grant};
pub use search::{CustomSearchFinder, UrlFinder};
