//! Candidate URL discovery seam.
//!
//! Where article URLs come from is opaque to the crawl engine; it only sees
//! [`UrlFinder`]. [`CustomSearchFinder`] implements the seam against a
//! custom-search-style JSON endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use civicore_shared::{CivicoreError, Result};

/// Produces candidate-coverage URLs for a candidate name. May return an
/// empty list.
#[async_trait]
pub trait UrlFinder: Send + Sync {
    async fn find_urls(&self, candidate_name: &str) -> Result<Vec<Url>>;
}

// ---------------------------------------------------------------------------
// Custom-search implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
}

/// Queries a custom-search JSON endpoint (`?key=…&cx=…&q=<name>`) and
/// returns the result links in ranked order.
pub struct CustomSearchFinder {
    client: Client,
    base_url: String,
    api_key: String,
    engine_id: String,
}

impl CustomSearchFinder {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        }
    }
}

#[async_trait]
impl UrlFinder for CustomSearchFinder {
    async fn find_urls(&self, candidate_name: &str) -> Result<Vec<Url>> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", candidate_name),
            ])
            .send()
            .await
            .map_err(|e| CivicoreError::Network(format!("search query failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CivicoreError::Network(format!("search: HTTP {status}")));
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| CivicoreError::parse(format!("search response: {e}")))?;

        // Unparseable links are dropped rather than failing the batch.
        Ok(body
            .items
            .into_iter()
            .filter_map(|item| Url::parse(&item.link).ok())
            .collect())
    }
}
