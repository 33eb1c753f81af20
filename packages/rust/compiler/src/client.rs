//! Civic Information API client.
//!
//! Thin reqwest wrapper over the two endpoints the compiler consumes:
//! the election list and per-(election, address) contest queries. Response
//! structs keep only the fields the compiler reads; everything else in the
//! payload is ignored.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use civicore_shared::{CivicoreError, Result};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("civicore/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// `GET /elections` response.
#[derive(Debug, Deserialize)]
pub struct ElectionsResponse {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub elections: Vec<RawElection>,
}

/// One election as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawElection {
    pub id: String,
    pub name: String,
    #[serde(rename = "electionDay")]
    pub election_day: String,
    /// Hierarchical region-division identifier, when reported.
    #[serde(rename = "ocdDivisionId", default)]
    pub ocd_division_id: Option<String>,
}

/// `GET /voterinfo` response, reduced to its contest list.
#[derive(Debug, Deserialize)]
pub struct ContestsResponse {
    #[serde(default)]
    pub contests: Vec<RawContest>,
}

/// One contest at one address.
#[derive(Debug, Clone, Deserialize)]
pub struct RawContest {
    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub candidates: Vec<RawCandidate>,
}

/// One candidate within a contest.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCandidate {
    pub name: String,
    #[serde(default)]
    pub party: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the Civic Information API.
pub struct CivicClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CivicClient {
    /// Create a client against `base_url` authenticating with `api_key`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CivicoreError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Query the election list.
    pub async fn elections(&self) -> Result<ElectionsResponse> {
        let url = format!("{}/elections", self.base_url);
        self.get_json(&url, &[("key", self.api_key.as_str())]).await
    }

    /// Query the contests for one election at one address.
    pub async fn contests(&self, election_id: &str, address: &str) -> Result<ContestsResponse> {
        let url = format!("{}/voterinfo", self.base_url);
        self.get_json(
            &url,
            &[
                ("key", self.api_key.as_str()),
                ("address", address),
                ("electionId", election_id),
            ],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| CivicoreError::Network(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CivicoreError::Network(format!("{url}: HTTP {status}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| CivicoreError::parse(format!("{url}: {e}")))
    }
}
