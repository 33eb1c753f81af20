//! robots.txt permission resolution.
//!
//! Before fetching a page, the crawler asks the target host's
//! `/robots.txt` for a [`Grant`]: may we access this path, and how much
//! spacing does the host want between fetches? A host without a readable
//! robots.txt fails open — access allowed, no delay. That is deliberate
//! policy, not error handling.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use civicore_shared::{CivicoreError, Result};

/// The user agent token all grants are evaluated for.
pub const WILDCARD_AGENT: &str = "*";

// ---------------------------------------------------------------------------
// Grant
// ---------------------------------------------------------------------------

/// A permission decision for one URL: access plus optional crawl delay.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    /// Whether the path may be fetched.
    pub allowed: bool,
    /// Minimum spacing the host asks for between fetches, if any.
    pub crawl_delay: Option<Duration>,
}

impl Grant {
    /// The fail-open grant used when no directives are available.
    pub fn allow_all() -> Self {
        Self {
            allowed: true,
            crawl_delay: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RobotsTxt
// ---------------------------------------------------------------------------

/// One Allow/Disallow path-prefix rule.
#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    prefix: String,
}

/// A block of rules applying to one or more user agents.
#[derive(Debug, Clone, Default)]
struct RuleGroup {
    agents: Vec<String>,
    rules: Vec<Rule>,
    crawl_delay: Option<Duration>,
}

impl RuleGroup {
    fn is_wildcard(&self) -> bool {
        self.agents.iter().any(|a| a == WILDCARD_AGENT)
    }

    fn matches(&self, agent_lower: &str) -> bool {
        self.agents
            .iter()
            .any(|a| a != WILDCARD_AGENT && agent_lower.contains(a.as_str()))
    }
}

/// Parsed robots.txt directives.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    groups: Vec<RuleGroup>,
    sitemaps: Vec<String>,
}

impl RobotsTxt {
    /// Parse robots.txt content. Unknown directives and malformed lines are
    /// ignored; an empty or unreadable file allows everything.
    pub fn parse(content: &str) -> Self {
        let mut robots = Self::default();
        let mut current: Option<RuleGroup> = None;
        // Consecutive User-agent lines share one group; any other directive
        // closes the agent list.
        let mut collecting_agents = false;

        for line in content.lines() {
            // Strip comments, then whitespace.
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if !collecting_agents {
                        if let Some(group) = current.take() {
                            robots.groups.push(group);
                        }
                        current = Some(RuleGroup::default());
                    }
                    if let Some(group) = current.as_mut() {
                        group.agents.push(value.to_lowercase());
                    }
                    collecting_agents = true;
                }
                "allow" | "disallow" => {
                    collecting_agents = false;
                    // An empty prefix matches nothing ("Disallow:" = allow all).
                    if value.is_empty() {
                        continue;
                    }
                    if let Some(group) = current.as_mut() {
                        group.rules.push(Rule {
                            allow: directive == "allow",
                            prefix: value.to_string(),
                        });
                    }
                }
                "crawl-delay" => {
                    collecting_agents = false;
                    if let Some(group) = current.as_mut() {
                        group.crawl_delay = value
                            .parse::<f64>()
                            .ok()
                            .filter(|d| d.is_finite() && *d >= 0.0)
                            .map(Duration::from_secs_f64);
                    }
                }
                "sitemap" => {
                    collecting_agents = false;
                    robots.sitemaps.push(value.to_string());
                }
                _ => {
                    collecting_agents = false;
                }
            }
        }
        if let Some(group) = current.take() {
            robots.groups.push(group);
        }
        robots
    }

    /// The rule group governing `agent`: a named match if one exists, else
    /// the wildcard group.
    fn group_for(&self, agent: &str) -> Option<&RuleGroup> {
        let agent_lower = agent.to_lowercase();
        self.groups
            .iter()
            .find(|g| g.matches(&agent_lower))
            .or_else(|| self.groups.iter().find(|g| g.is_wildcard()))
    }

    /// Whether `agent` may fetch `path`. The most specific (longest) matching
    /// prefix rule decides; on a length tie, Allow wins. No matching rule
    /// means allowed.
    pub fn is_allowed(&self, agent: &str, path: &str) -> bool {
        let Some(group) = self.group_for(agent) else {
            return true;
        };

        let mut verdict = true;
        let mut best_len = 0usize;
        for rule in &group.rules {
            if !path.starts_with(rule.prefix.as_str()) {
                continue;
            }
            let len = rule.prefix.len();
            if len > best_len || (len == best_len && rule.allow) {
                best_len = len;
                verdict = rule.allow;
            }
        }
        verdict
    }

    /// The crawl delay requested for `agent`, falling back to the wildcard
    /// group's delay.
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        let agent_lower = agent.to_lowercase();
        self.groups
            .iter()
            .find(|g| g.matches(&agent_lower))
            .and_then(|g| g.crawl_delay)
            .or_else(|| {
                self.groups
                    .iter()
                    .find(|g| g.is_wildcard())
                    .and_then(|g| g.crawl_delay)
            })
    }

    /// Sitemap URLs listed in the file.
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Evaluate a full [`Grant`] for `agent` and `path`.
    pub fn evaluate(&self, agent: &str, path: &str) -> Grant {
        Grant {
            allowed: self.is_allowed(agent, path),
            crawl_delay: self.crawl_delay(agent),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Extract the origin (scheme + host + port) from a URL. Doubles as the
/// politeness host key.
pub fn origin(url: &Url) -> Result<String> {
    let scheme = url.scheme();
    let host = url
        .host_str()
        .ok_or_else(|| CivicoreError::validation(format!("URL has no host: {url}")))?;

    match url.port() {
        Some(port) => Ok(format!("{scheme}://{host}:{port}")),
        None => Ok(format!("{scheme}://{host}")),
    }
}

/// Fetch and evaluate the crawl directives governing `url` for the wildcard
/// agent. Never fails: any fetch or read problem yields the fail-open grant.
pub async fn fetch_grant(client: &Client, url: &Url) -> Grant {
    let Ok(origin) = origin(url) else {
        return Grant::allow_all();
    };
    let robots_url = format!("{origin}/robots.txt");

    match client.get(&robots_url).send().await {
        Ok(resp) if resp.status().is_success() => match resp.text().await {
            Ok(content) => RobotsTxt::parse(&content).evaluate(WILDCARD_AGENT, url.path()),
            Err(e) => {
                debug!(%robots_url, error = %e, "robots.txt unreadable, failing open");
                Grant::allow_all()
            }
        },
        Ok(resp) => {
            debug!(%robots_url, status = %resp.status(), "no robots.txt, failing open");
            Grant::allow_all()
        }
        Err(e) => {
            debug!(%robots_url, error = %e, "robots.txt fetch failed, failing open");
            Grant::allow_all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_rules() {
        let content = r#"
User-agent: *
Disallow: /private/
Disallow: /admin/
Allow: /public/
Crawl-delay: 2

Sitemap: https://example.com/sitemap.xml
"#;
        let robots = RobotsTxt::parse(content);

        assert!(robots.is_allowed(WILDCARD_AGENT, "/public/page"));
        assert!(!robots.is_allowed(WILDCARD_AGENT, "/private/page"));
        assert!(!robots.is_allowed(WILDCARD_AGENT, "/admin/"));
        assert!(robots.is_allowed(WILDCARD_AGENT, "/other/page"));

        assert_eq!(
            robots.crawl_delay(WILDCARD_AGENT),
            Some(Duration::from_secs(2))
        );
        assert_eq!(robots.sitemaps().len(), 1);
    }

    #[test]
    fn allow_overrides_disallow_on_deeper_prefix() {
        let content = r#"
User-agent: *
Disallow: /private/
Allow: /private/reports/
"#;
        let robots = RobotsTxt::parse(content);
        assert!(!robots.is_allowed("*", "/private/secret"));
        assert!(robots.is_allowed("*", "/private/reports/2024"));
    }

    #[test]
    fn named_group_beats_wildcard() {
        let content = r#"
User-agent: *
Disallow: /

User-agent: goodbot
Allow: /
"#;
        let robots = RobotsTxt::parse(content);
        assert!(!robots.is_allowed("SomeBot", "/page"));
        assert!(robots.is_allowed("GoodBot/1.2", "/page"));
    }

    #[test]
    fn shared_agent_list_forms_one_group() {
        let content = r#"
User-agent: alpha
User-agent: beta
Disallow: /blocked/
"#;
        let robots = RobotsTxt::parse(content);
        assert!(!robots.is_allowed("alpha", "/blocked/x"));
        assert!(!robots.is_allowed("beta", "/blocked/x"));
        // No wildcard group: unrelated agents are unrestricted.
        assert!(robots.is_allowed("gamma", "/blocked/x"));
    }

    #[test]
    fn empty_file_allows_everything() {
        let robots = RobotsTxt::parse("");
        assert!(robots.is_allowed("*", "/any/path"));
        assert!(robots.crawl_delay("*").is_none());
    }

    #[test]
    fn fractional_crawl_delay() {
        let robots = RobotsTxt::parse("User-agent: *\nCrawl-delay: 0.5\n");
        assert_eq!(robots.crawl_delay("*"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn comments_and_junk_lines_are_ignored() {
        let content = r#"
# site robots
User-agent: *   # everyone
Disallow: /tmp/ # scratch space
not-a-directive
Unknown-directive: value
"#;
        let robots = RobotsTxt::parse(content);
        assert!(!robots.is_allowed("*", "/tmp/file"));
        assert!(robots.is_allowed("*", "/home"));
    }

    #[test]
    fn origin_includes_port() {
        let url = Url::parse("http://127.0.0.1:8080/news/story").unwrap();
        assert_eq!(origin(&url).unwrap(), "http://127.0.0.1:8080");

        let url = Url::parse("https://example.com/news").unwrap();
        assert_eq!(origin(&url).unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn missing_robots_fails_open() {
        let server = wiremock::MockServer::start().await;
        // No robots.txt mock mounted: the fetch 404s.
        let client = Client::new();
        let url = Url::parse(&format!("{}/news/story", server.uri())).unwrap();

        let grant = fetch_grant(&client, &url).await;
        assert!(grant.allowed);
        assert!(grant.crawl_delay.is_none());
    }

    #[tokio::test]
    async fn grant_reflects_served_directives() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/robots.txt"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /news/\nCrawl-delay: 3\n"),
            )
            .mount(&server)
            .await;

        let client = Client::new();
        let blocked = Url::parse(&format!("{}/news/story", server.uri())).unwrap();
        let grant = fetch_grant(&client, &blocked).await;
        assert!(!grant.allowed);
        assert_eq!(grant.crawl_delay, Some(Duration::from_secs(3)));

        let open = Url::parse(&format!("{}/about", server.uri())).unwrap();
        let grant = fetch_grant(&client, &open).await;
        assert!(grant.allowed);
    }
}
