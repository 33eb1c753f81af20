//! Per-candidate news crawl orchestration.
//!
//! For each candidate: discover URLs, gate every fetch through robots.txt
//! permission and per-host politeness spacing, extract and filter content,
//! then persist the processed article. Every per-URL failure is isolated —
//! a bad URL never aborts the rest of the batch. Only storage failures
//! propagate.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use civicore_shared::config::CrawlPoliciesConfig;
use civicore_shared::{CivicoreError, Result, article_key};
use civicore_storage::records::article_to_entity;
use civicore_storage::{EntityStore, KIND_NEWS_ARTICLE};

use crate::extract::extract_article;
use crate::politeness::{Clock, PolitenessGate, TokioClock};
use crate::process::process;
use crate::relevance::RelevancyChecker;
use crate::robots;
use crate::search::UrlFinder;

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("civicore/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// CrawlSummary
// ---------------------------------------------------------------------------

/// Outcome of one candidate's crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Articles extracted, filtered, and persisted.
    pub articles_stored: usize,
    /// URLs skipped for any reason (denied, absent, irrelevant, failed).
    pub urls_skipped: usize,
}

// ---------------------------------------------------------------------------
// NewsCrawler
// ---------------------------------------------------------------------------

/// Sequential fetch/extract/process/persist pipeline for candidate news.
pub struct NewsCrawler<C: Clock = TokioClock> {
    client: Client,
    gate: PolitenessGate<C>,
    finder: Box<dyn UrlFinder>,
    relevancy: Box<dyn RelevancyChecker>,
}

impl NewsCrawler<TokioClock> {
    /// Create a crawler with the given collaborators and crawl policies.
    pub fn new(
        policies: &CrawlPoliciesConfig,
        finder: Box<dyn UrlFinder>,
        relevancy: Box<dyn RelevancyChecker>,
    ) -> Result<Self> {
        Self::with_clock(policies, finder, relevancy, TokioClock)
    }
}

impl<C: Clock> NewsCrawler<C> {
    /// Create a crawler on a caller-supplied clock.
    pub fn with_clock(
        policies: &CrawlPoliciesConfig,
        finder: Box<dyn UrlFinder>,
        relevancy: Box<dyn RelevancyChecker>,
        clock: C,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(policies.max_redirects))
            .timeout(Duration::from_secs(policies.timeout_secs))
            .build()
            .map_err(|e| CivicoreError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            gate: PolitenessGate::with_clock(clock),
            finder,
            relevancy,
        })
    }

    /// Compile news articles for one candidate.
    ///
    /// URLs are processed in the order the finder returned them. Returns the
    /// summary; only a storage failure aborts the batch.
    #[instrument(skip_all, fields(candidate = %candidate_name, run_id = %Uuid::now_v7()))]
    pub async fn compile_articles(
        &self,
        candidate_name: &str,
        candidate_id: &str,
        store: &dyn EntityStore,
    ) -> Result<CrawlSummary> {
        let urls = match self.finder.find_urls(candidate_name).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!(error = %e, "url discovery failed, nothing to crawl");
                return Ok(CrawlSummary::default());
            }
        };

        info!(url_count = urls.len(), "starting candidate crawl");

        let mut summary = CrawlSummary::default();
        for url in urls {
            match self.crawl_one(&url, candidate_name, candidate_id, store).await? {
                true => summary.articles_stored += 1,
                false => summary.urls_skipped += 1,
            }
        }

        info!(
            stored = summary.articles_stored,
            skipped = summary.urls_skipped,
            "candidate crawl completed"
        );
        Ok(summary)
    }

    /// Process a single URL. Returns whether an article was stored. All
    /// per-URL failures resolve to `Ok(false)`; only storage errors escape.
    async fn crawl_one(
        &self,
        url: &Url,
        candidate_name: &str,
        candidate_id: &str,
        store: &dyn EntityStore,
    ) -> Result<bool> {
        // Articles are written once per URL and not revisited.
        if store
            .get(KIND_NEWS_ARTICLE, &article_key(url.as_str()))
            .await?
            .is_some()
        {
            debug!(%url, "article already stored, skipping");
            return Ok(false);
        }

        let grant = robots::fetch_grant(&self.client, url).await;
        if !grant.allowed {
            info!(%url, "disallowed by robots.txt, skipping");
            return Ok(false);
        }

        if let Some(delay) = grant.crawl_delay {
            let host = match robots::origin(url) {
                Ok(host) => host,
                Err(e) => {
                    warn!(%url, error = %e, "no host key, skipping");
                    return Ok(false);
                }
            };
            if self.gate.reserve(&host, delay).await.is_err() {
                info!(%url, "politeness wait interrupted, skipping");
                return Ok(false);
            }
        }

        let body = match self.fetch_document(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(%url, error = %e, "fetch failed, skipping");
                return Ok(false);
            }
        };

        let Some(article) = extract_article(Some(&body), url) else {
            debug!(%url, "no article content extracted, skipping");
            return Ok(false);
        };

        if !self.relevancy.is_relevant(&article, candidate_name) {
            debug!(%url, "article not relevant, skipping");
            return Ok(false);
        }

        let article = process(article);
        store.upsert(article_to_entity(candidate_id, &article)).await?;
        debug!(%url, title = %article.title, "article stored");
        Ok(true)
    }

    /// Fetch a document body. HTTP-level failures surface as network errors.
    async fn fetch_document(&self, url: &Url) -> Result<String> {
        let resp = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| CivicoreError::Network(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CivicoreError::Network(format!("{url}: HTTP {status}")));
        }

        resp.text()
            .await
            .map_err(|e| CivicoreError::Network(format!("{url}: body read failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use civicore_storage::MemoryStore;
    use std::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::relevance::MentionRelevancy;

    const CANDIDATE: &str = "Jane Smith";
    const CANDIDATE_ID: &str = "0f0f0f";

    /// Finder returning a fixed URL list.
    struct StaticFinder(Vec<Url>);

    #[async_trait]
    impl UrlFinder for StaticFinder {
        async fn find_urls(&self, _candidate_name: &str) -> Result<Vec<Url>> {
            Ok(self.0.clone())
        }
    }

    /// Finder that always fails.
    struct BrokenFinder;

    #[async_trait]
    impl UrlFinder for BrokenFinder {
        async fn find_urls(&self, _candidate_name: &str) -> Result<Vec<Url>> {
            Err(CivicoreError::Network("search down".into()))
        }
    }

    fn story_html(extra: &str) -> String {
        format!(
            r#"<html><head><title>Jane Smith leads primary</title></head>
<body><article><p>Jane Smith pulled ahead in early returns. {extra}</p></article></body></html>"#
        )
    }

    fn crawler(urls: Vec<Url>) -> NewsCrawler {
        NewsCrawler::new(
            &CrawlPoliciesConfig::default(),
            Box::new(StaticFinder(urls)),
            Box::new(MentionRelevancy::default()),
        )
        .unwrap()
    }

    async fn mount_page(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn page_url(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{route}", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn stores_relevant_article() {
        let server = MockServer::start().await;
        mount_page(&server, "/story", story_html("")).await;
        // robots.txt 404s: fail-open.

        let store = MemoryStore::new();
        let url = page_url(&server, "/story");
        let summary = crawler(vec![url.clone()])
            .compile_articles(CANDIDATE, CANDIDATE_ID, &store)
            .await
            .unwrap();

        assert_eq!(summary.articles_stored, 1);
        assert_eq!(summary.urls_skipped, 0);

        let stored = store
            .get(KIND_NEWS_ARTICLE, &article_key(url.as_str()))
            .await
            .unwrap()
            .expect("article entity");
        assert_eq!(
            stored.field("title").and_then(|f| f.as_str()),
            Some("Jane Smith leads primary")
        );
        assert!(
            stored
                .field("abbreviated_content")
                .and_then(|f| f.as_long_text())
                .is_some()
        );
    }

    #[tokio::test]
    async fn robots_disallow_skips_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /story\n"),
            )
            .mount(&server)
            .await;
        mount_page(&server, "/story", story_html("")).await;

        let store = MemoryStore::new();
        let summary = crawler(vec![page_url(&server, "/story")])
            .compile_articles(CANDIDATE, CANDIDATE_ID, &store)
            .await
            .unwrap();

        assert_eq!(summary.articles_stored, 0);
        assert_eq!(summary.urls_skipped, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn crawl_delay_spaces_same_host_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1\n"),
            )
            .mount(&server)
            .await;
        mount_page(&server, "/one", story_html("First story.")).await;
        mount_page(&server, "/two", story_html("Second story.")).await;

        let store = MemoryStore::new();
        let urls = vec![page_url(&server, "/one"), page_url(&server, "/two")];

        let started = Instant::now();
        let summary = crawler(urls)
            .compile_articles(CANDIDATE, CANDIDATE_ID, &store)
            .await
            .unwrap();

        assert_eq!(summary.articles_stored, 2);
        // First fetch is free; the second waits out the 1s spacing.
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn per_url_failures_do_not_abort_the_batch() {
        let server = MockServer::start().await;
        mount_page(&server, "/good", story_html("")).await;
        Mock::given(method("GET"))
            .and(path("/boom"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_page(
            &server,
            "/irrelevant",
            "<html><body><article><p>City budget passes.</p></article></body></html>".into(),
        )
        .await;

        let store = MemoryStore::new();
        let urls = vec![
            page_url(&server, "/boom"),
            page_url(&server, "/irrelevant"),
            page_url(&server, "/good"),
        ];
        let summary = crawler(urls)
            .compile_articles(CANDIDATE, CANDIDATE_ID, &store)
            .await
            .unwrap();

        assert_eq!(summary.articles_stored, 1);
        assert_eq!(summary.urls_skipped, 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn stored_articles_are_not_revisited() {
        let server = MockServer::start().await;
        mount_page(&server, "/story", story_html("")).await;

        let store = MemoryStore::new();
        let url = page_url(&server, "/story");
        let engine = crawler(vec![url.clone()]);

        let first = engine
            .compile_articles(CANDIDATE, CANDIDATE_ID, &store)
            .await
            .unwrap();
        assert_eq!(first.articles_stored, 1);

        let second = engine
            .compile_articles(CANDIDATE, CANDIDATE_ID, &store)
            .await
            .unwrap();
        assert_eq!(second.articles_stored, 0);
        assert_eq!(second.urls_skipped, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn finder_failure_yields_empty_run() {
        let engine = NewsCrawler::new(
            &CrawlPoliciesConfig::default(),
            Box::new(BrokenFinder),
            Box::new(MentionRelevancy::default()),
        )
        .unwrap();

        let store = MemoryStore::new();
        let summary = engine
            .compile_articles(CANDIDATE, CANDIDATE_ID, &store)
            .await
            .unwrap();
        assert_eq!(summary, CrawlSummary::default());
    }
}
