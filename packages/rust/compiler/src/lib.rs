//! Civic-data compilation for Civicore.
//!
//! This crate provides:
//! - [`client`] — the Civic Information API client
//! - [`normalize`] — raw value → canonical field normalization
//! - [`compile`] — the two-stage election/contest compile pipeline

pub mod client;
pub mod compile;
pub mod normalize;

pub use client::{
    CivicClient, ContestsResponse, ElectionsResponse, RawCandidate, RawContest, RawElection,
};
pub use compile::{CompileSummary, InfoCompiler};
