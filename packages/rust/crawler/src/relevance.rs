//! Relevancy filtering seam.
//!
//! Scoring an article against a candidate is an external concern; the engine
//! only consumes a yes/no predicate. [`MentionRelevancy`] is the default
//! collaborator wired in by the CLI.

use civicore_shared::NewsArticle;

/// Black-box predicate deciding whether an article is about a candidate.
pub trait RelevancyChecker: Send + Sync {
    fn is_relevant(&self, article: &NewsArticle, candidate_name: &str) -> bool;
}

/// Counts case-insensitive mentions of the candidate's full name across the
/// title and body.
pub struct MentionRelevancy {
    min_mentions: usize,
}

impl MentionRelevancy {
    /// Require at least `min_mentions` name occurrences.
    pub fn new(min_mentions: usize) -> Self {
        Self {
            min_mentions: min_mentions.max(1),
        }
    }
}

impl Default for MentionRelevancy {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RelevancyChecker for MentionRelevancy {
    fn is_relevant(&self, article: &NewsArticle, candidate_name: &str) -> bool {
        if candidate_name.is_empty() {
            return false;
        }
        let needle = candidate_name.to_lowercase();
        let haystack = format!("{} {}", article.title, article.content).to_lowercase();
        haystack.matches(needle.as_str()).count() >= self.min_mentions
    }
}
