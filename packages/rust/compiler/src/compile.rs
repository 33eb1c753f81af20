//! Two-stage civic-data compilation.
//!
//! Stage 1 ingests the base election list; stage 2 fans contest queries out
//! over the address corpus and folds the results into deduplicated election
//! and candidate records. Per-query failures skip that query only; storage
//! failures abort the run.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use civicore_shared::{
    Candidate, Election, PLACEHOLDER_INCUMBENCY, Result, TEST_ELECTION_ID, candidate_id,
};
use civicore_storage::records::{candidate_to_entity, election_from_entity, election_to_entity};
use civicore_storage::{EntityStore, KIND_ELECTION};

use crate::client::CivicClient;
use crate::normalize;

// ---------------------------------------------------------------------------
// CompileSummary
// ---------------------------------------------------------------------------

/// Outcome of one compile run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileSummary {
    /// Elections ingested (sentinel excluded).
    pub elections: usize,
    /// New contest entries appended across all elections.
    pub contest_entries: usize,
    /// Candidate records upserted.
    pub candidates: usize,
    /// Contest queries skipped on transient failure.
    pub skipped_queries: usize,
}

// ---------------------------------------------------------------------------
// InfoCompiler
// ---------------------------------------------------------------------------

/// Compiles the canonical election/candidate record set from the civic-data
/// API, one election and one address at a time.
pub struct InfoCompiler {
    client: CivicClient,
    addresses: Vec<String>,
}

impl InfoCompiler {
    /// Create a compiler querying contests at the given address corpus, in
    /// the listed order.
    pub fn new(client: CivicClient, addresses: Vec<String>) -> Self {
        Self { client, addresses }
    }

    /// Run stage 1 (base elections) then stage 2 (contests).
    #[instrument(skip_all, fields(run_id = %Uuid::now_v7()))]
    pub async fn compile_info(&self, store: &dyn EntityStore) -> Result<CompileSummary> {
        let mut elections = self.ingest_elections(store).await?;
        let mut summary = self.ingest_contests(store, &mut elections).await?;
        summary.elections = elections.len();

        info!(
            elections = summary.elections,
            candidates = summary.candidates,
            contest_entries = summary.contest_entries,
            skipped_queries = summary.skipped_queries,
            "compile completed"
        );
        Ok(summary)
    }

    /// Stage 1: query the election list and upsert one election record per
    /// non-sentinel entry. Existing records are merged — their contest
    /// sequences survive a re-ingest. A failed list query logs and yields an
    /// empty set; nothing else in the run can proceed without it anyway.
    pub async fn ingest_elections(&self, store: &dyn EntityStore) -> Result<Vec<Election>> {
        let resp = match self.client.elections().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "election list query failed");
                return Ok(Vec::new());
            }
        };

        debug!(kind = %resp.kind, count = resp.elections.len(), "election list received");

        let mut elections = Vec::new();
        for raw in resp.elections {
            // Sentinel test data is discarded entirely: no entity, no side
            // effects.
            if raw.id == TEST_ELECTION_ID {
                debug!(name = %raw.name, "discarding sentinel test election");
                continue;
            }

            let date = match normalize::election_date(&raw.election_day) {
                Ok(date) => date,
                Err(e) => {
                    warn!(name = %raw.name, error = %e, "unusable election day, skipping");
                    continue;
                }
            };
            let state = normalize::state_from_division(raw.ocd_division_id.as_deref());

            let election = match store.get(KIND_ELECTION, &raw.name).await? {
                Some(entity) => match election_from_entity(&entity) {
                    Ok(mut existing) => {
                        existing.query_id = raw.id;
                        existing.date = date;
                        existing.state = state;
                        existing
                    }
                    Err(e) => {
                        warn!(name = %raw.name, error = %e, "replacing unreadable election record");
                        Election::new(raw.name.clone(), raw.id, date, state)
                    }
                },
                None => Election::new(raw.name.clone(), raw.id, date, state),
            };

            store.upsert(election_to_entity(&election)).await?;
            debug!(name = %election.name, state = %election.state, "election ingested");
            elections.push(election);
        }
        Ok(elections)
    }

    /// Stage 2: for every (election, address) pair in fixed order, query
    /// contests and append aligned (office, candidate, incumbency) entries.
    /// Pairs already recorded for an election — from earlier addresses or an
    /// earlier run — are skipped before appending, so re-ingestion never
    /// duplicates sequence entries.
    pub async fn ingest_contests(
        &self,
        store: &dyn EntityStore,
        elections: &mut [Election],
    ) -> Result<CompileSummary> {
        let mut summary = CompileSummary::default();

        for election in elections.iter_mut() {
            let mut seen: HashSet<(String, String)> = election
                .contest_pairs()
                .map(|(office, id)| (office.to_string(), id.to_string()))
                .collect();

            for address in &self.addresses {
                let resp = match self.client.contests(&election.query_id, address).await {
                    Ok(resp) => resp,
                    Err(e) => {
                        warn!(
                            election = %election.name,
                            address = %address,
                            error = %e,
                            "contest query failed, skipping"
                        );
                        summary.skipped_queries += 1;
                        continue;
                    }
                };

                for contest in resp.contests {
                    let mut changed = false;
                    for raw in &contest.candidates {
                        let id = candidate_id(&raw.name, &raw.party);
                        if !seen.insert((contest.office.clone(), id.clone())) {
                            debug!(
                                office = %contest.office,
                                candidate = %raw.name,
                                "contest entry already recorded, skipping"
                            );
                            continue;
                        }

                        let candidate = Candidate::new(raw.name.clone(), &raw.party);
                        store.upsert(candidate_to_entity(&candidate)).await?;

                        election.push_contest_entry(&contest.office, id, PLACEHOLDER_INCUMBENCY);
                        summary.candidates += 1;
                        summary.contest_entries += 1;
                        changed = true;
                    }
                    if changed {
                        store.upsert(election_to_entity(election)).await?;
                    }
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use civicore_storage::records::election_from_entity;
    use civicore_storage::{KIND_CANDIDATE, MemoryStore};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADDRESS_A: &str = "Albany, NY";
    const ADDRESS_B: &str = "Buffalo, NY";

    async fn mount_elections(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/elections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "civicinfo#electionsqueryresponse",
                "elections": [{
                    "id": "2000",
                    "name": "VIP Test Election",
                    "electionDay": "2013-06-06"
                }, {
                    "id": "4000",
                    "name": "State Primary",
                    "electionDay": "2024-06-25",
                    "ocdDivisionId": "ocd-division/country:us/state:ny"
                }]
            })))
            .mount(server)
            .await;
    }

    fn governor_contests() -> serde_json::Value {
        serde_json::json!({
            "contests": [{
                "office": "Governor",
                "candidates": [
                    {"name": "Andrew Cuomo", "party": "Democratic"},
                    {"name": "Marc Molinaro", "party": "Republican"}
                ]
            }]
        })
    }

    async fn mount_contests(server: &MockServer, address: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/voterinfo"))
            .and(query_param("address", address))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn compiler(server: &MockServer, addresses: &[&str]) -> InfoCompiler {
        InfoCompiler::new(
            CivicClient::new(server.uri(), "test-key").unwrap(),
            addresses.iter().map(|a| a.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn sentinel_election_is_never_persisted() {
        let server = MockServer::start().await;
        mount_elections(&server).await;
        mount_contests(&server, ADDRESS_A, governor_contests()).await;

        let store = MemoryStore::new();
        compiler(&server, &[ADDRESS_A])
            .compile_info(&store)
            .await
            .unwrap();

        let elections = store.query_by_kind(KIND_ELECTION).await.unwrap();
        assert_eq!(elections.len(), 1);
        assert_eq!(elections[0].key, "State Primary");
        // Nothing about the sentinel leaked into candidates either.
        let candidates = store.query_by_kind(KIND_CANDIDATE).await.unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn election_fields_are_normalized() {
        let server = MockServer::start().await;
        mount_elections(&server).await;

        let store = MemoryStore::new();
        let elections = compiler(&server, &[])
            .ingest_elections(&store)
            .await
            .unwrap();

        assert_eq!(elections.len(), 1);
        let election = &elections[0];
        assert_eq!(election.query_id, "4000");
        assert_eq!(election.state, "NY");
        assert_eq!(
            election.date,
            Utc.with_ymd_and_hms(2024, 6, 25, 4, 0, 0).unwrap()
        );
        assert_eq!(election.contest_len(), 0);
    }

    #[tokio::test]
    async fn contests_build_aligned_sequences_and_candidates() {
        let server = MockServer::start().await;
        mount_elections(&server).await;
        mount_contests(&server, ADDRESS_A, governor_contests()).await;

        let store = MemoryStore::new();
        let summary = compiler(&server, &[ADDRESS_A])
            .compile_info(&store)
            .await
            .unwrap();

        assert_eq!(summary.elections, 1);
        assert_eq!(summary.contest_entries, 2);
        assert_eq!(summary.candidates, 2);

        let entity = store
            .get(KIND_ELECTION, "State Primary")
            .await
            .unwrap()
            .unwrap();
        let election = election_from_entity(&entity).unwrap();
        assert!(election.sequences_aligned());
        assert_eq!(election.offices, vec!["Governor", "Governor"]);
        assert_eq!(
            election.candidate_ids,
            vec![
                candidate_id("Andrew Cuomo", "Democratic"),
                candidate_id("Marc Molinaro", "Republican")
            ]
        );
        assert_eq!(election.incumbents, vec![false, false]);

        let cuomo = store
            .get(KIND_CANDIDATE, &candidate_id("Andrew Cuomo", "Democratic"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            cuomo.field("party_affiliation").and_then(|f| f.as_str()),
            Some("Democratic Party")
        );
        assert_eq!(cuomo.field("incumbent").and_then(|f| f.as_bool()), Some(false));
    }

    #[tokio::test]
    async fn duplicate_contests_across_addresses_are_deduped() {
        let server = MockServer::start().await;
        mount_elections(&server).await;
        // Both addresses report the same statewide contest.
        mount_contests(&server, ADDRESS_A, governor_contests()).await;
        mount_contests(&server, ADDRESS_B, governor_contests()).await;

        let store = MemoryStore::new();
        let summary = compiler(&server, &[ADDRESS_A, ADDRESS_B])
            .compile_info(&store)
            .await
            .unwrap();
        assert_eq!(summary.contest_entries, 2);

        let entity = store
            .get(KIND_ELECTION, "State Primary")
            .await
            .unwrap()
            .unwrap();
        let election = election_from_entity(&entity).unwrap();
        assert_eq!(election.contest_len(), 2);
    }

    #[tokio::test]
    async fn recompile_is_idempotent() {
        let server = MockServer::start().await;
        mount_elections(&server).await;
        mount_contests(&server, ADDRESS_A, governor_contests()).await;

        let store = MemoryStore::new();
        let compiler = compiler(&server, &[ADDRESS_A]);
        compiler.compile_info(&store).await.unwrap();
        let second = compiler.compile_info(&store).await.unwrap();

        // The second run re-reads the stored sequences and appends nothing.
        assert_eq!(second.contest_entries, 0);
        let entity = store
            .get(KIND_ELECTION, "State Primary")
            .await
            .unwrap()
            .unwrap();
        let election = election_from_entity(&entity).unwrap();
        assert_eq!(election.contest_len(), 2);
    }

    #[tokio::test]
    async fn failed_contest_query_skips_that_address_only() {
        let server = MockServer::start().await;
        mount_elections(&server).await;
        Mock::given(method("GET"))
            .and(path("/voterinfo"))
            .and(query_param("address", ADDRESS_A))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_contests(&server, ADDRESS_B, governor_contests()).await;

        let store = MemoryStore::new();
        let summary = compiler(&server, &[ADDRESS_A, ADDRESS_B])
            .compile_info(&store)
            .await
            .unwrap();

        assert_eq!(summary.skipped_queries, 1);
        assert_eq!(summary.contest_entries, 2);
    }

    #[tokio::test]
    async fn unreachable_api_compiles_nothing() {
        let server = MockServer::start().await;
        // No /elections mock: the list query 404s.
        let store = MemoryStore::new();
        let summary = compiler(&server, &[ADDRESS_A])
            .compile_info(&store)
            .await
            .unwrap();
        assert_eq!(summary, CompileSummary::default());
        assert!(store.is_empty());
    }
}
