//! Core domain types for civic-election records and news coverage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Reserved election id used by the Civic Information API for test/sample
/// data. Never persisted.
pub const TEST_ELECTION_ID: &str = "2000";

/// Suffix appended to a party name to form the affiliation label.
pub const PARTY_SUFFIX: &str = " Party";

/// Fixed reference hour (UTC) an election date is normalized to.
pub const ELECTION_DAY_HOUR: u32 = 4;

/// No incumbency signal is available from the contest feed; every candidate
/// is recorded with this placeholder.
pub const PLACEHOLDER_INCUMBENCY: bool = false;

// ---------------------------------------------------------------------------
// Deterministic identifiers
// ---------------------------------------------------------------------------

/// Derive the stable candidate id from (name, party).
///
/// SHA-256 over `name`, a zero-byte separator, and `party`, hex-encoded.
/// The separator keeps ("ab", "c") and ("a", "bc") distinct.
pub fn candidate_id(name: &str, party: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(party.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derive the stable news-article key from its canonical URL.
pub fn article_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Election
// ---------------------------------------------------------------------------

/// A single election, keyed by its name (unique within a run).
///
/// The three contest sequences are index-aligned: position *i* in each
/// describes one contest entry (office, candidate, incumbency). A contest
/// with several candidates contributes one entry per candidate, repeating
/// the office name, so the sequences never drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    /// Election name, used as the entity key.
    pub name: String,
    /// External query id assigned by the civic-data API.
    pub query_id: String,
    /// Election day, normalized to [`ELECTION_DAY_HOUR`] UTC.
    pub date: DateTime<Utc>,
    /// Two-letter uppercase state code, or empty when no region division
    /// was reported.
    pub state: String,
    /// Office names, one per contest entry.
    pub offices: Vec<String>,
    /// Candidate ids, aligned with `offices`.
    pub candidate_ids: Vec<String>,
    /// Incumbency flags, aligned with `offices`.
    pub incumbents: Vec<bool>,
}

impl Election {
    /// Create an election with empty contest sequences.
    pub fn new(
        name: impl Into<String>,
        query_id: impl Into<String>,
        date: DateTime<Utc>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            query_id: query_id.into(),
            date,
            state: state.into(),
            offices: Vec::new(),
            candidate_ids: Vec::new(),
            incumbents: Vec::new(),
        }
    }

    /// Append one aligned contest entry.
    pub fn push_contest_entry(
        &mut self,
        office: impl Into<String>,
        candidate_id: impl Into<String>,
        incumbent: bool,
    ) {
        self.offices.push(office.into());
        self.candidate_ids.push(candidate_id.into());
        self.incumbents.push(incumbent);
        debug_assert!(self.sequences_aligned());
    }

    /// Number of recorded contest entries.
    pub fn contest_len(&self) -> usize {
        self.offices.len()
    }

    /// Whether the three contest sequences have equal length.
    pub fn sequences_aligned(&self) -> bool {
        self.offices.len() == self.candidate_ids.len()
            && self.offices.len() == self.incumbents.len()
    }

    /// Iterate over the already-recorded (office, candidate id) pairs.
    pub fn contest_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.offices
            .iter()
            .zip(self.candidate_ids.iter())
            .map(|(office, id)| (office.as_str(), id.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A candidate appearing in one or more contests, keyed by the deterministic
/// id derived from (name, party).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Deterministic id, see [`candidate_id`].
    pub id: String,
    /// Candidate name as reported by the contest feed.
    pub name: String,
    /// Party-affiliation label: party name plus [`PARTY_SUFFIX`].
    pub party_affiliation: String,
    /// Always [`PLACEHOLDER_INCUMBENCY`].
    pub incumbent: bool,
}

impl Candidate {
    /// Build a candidate record from the (name, party) pair reported by the
    /// contest feed.
    pub fn new(name: impl Into<String>, party: &str) -> Self {
        let name = name.into();
        Self {
            id: candidate_id(&name, party),
            name,
            party_affiliation: format!("{party}{PARTY_SUFFIX}"),
            incumbent: PLACEHOLDER_INCUMBENCY,
        }
    }
}

// ---------------------------------------------------------------------------
// NewsArticle
// ---------------------------------------------------------------------------

/// An extracted news article, keyed by [`article_key`] of its URL.
///
/// `abbreviated_content` is `None` until content processing runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Extracted title; empty when the page carries none.
    pub title: String,
    /// Canonical URL the article was fetched from.
    pub url: String,
    /// Full body text after boilerplate removal.
    pub content: String,
    /// Word-count-bounded prefix of `content`, set by the content processor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviated_content: Option<String>,
}

impl NewsArticle {
    /// Create an unprocessed article.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            abbreviated_content: None,
        }
    }
}
