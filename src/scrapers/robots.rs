//! robots.txt handling for generically discovered crawl paths.
//!
//! Feed-discovered URLs never pass through here: a published feed is an
//! explicit syndication grant. Hosts on the trusted list bypass the check.

use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::fetch::Fetcher;
use crate::store::KvCache;

const ROBOTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq)]
struct Rule {
    allow: bool,
    pattern: String,
}

/// Parsed rules for one user-agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsRules {
    rules: Vec<Rule>,
}

impl RobotsRules {
    /// Parse robots.txt, keeping the group for `agent` if one exists,
    /// otherwise the `*` group.
    pub fn parse(body: &str, agent: &str) -> Self {
        let agent = agent.to_ascii_lowercase();
        let mut specific = Vec::new();
        let mut wildcard = Vec::new();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_rules = false;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            match key.as_str() {
                "user-agent" => {
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_ascii_lowercase());
                }
                "allow" | "disallow" => {
                    in_rules = true;
                    // An empty Disallow allows everything.
                    if value.is_empty() {
                        continue;
                    }
                    let rule = Rule {
                        allow: key == "allow",
                        pattern: value.to_string(),
                    };
                    if group_agents.iter().any(|a| !a.is_empty() && agent.contains(a.as_str()) && a != "*") {
                        specific.push(rule.clone());
                    }
                    if group_agents.iter().any(|a| a == "*") {
                        wildcard.push(rule);
                    }
                }
                _ => {}
            }
        }

        Self {
            rules: if specific.is_empty() { wildcard } else { specific },
        }
    }

    /// Longest matching pattern wins; `Allow` wins ties.
    pub fn is_allowed(&self, path: &str) -> bool {
        let mut best: Option<(usize, bool)> = None;
        for rule in &self.rules {
            if pattern_matches(&rule.pattern, path) {
                let len = rule.pattern.len();
                best = match best {
                    Some((l, a)) if l > len || (l == len && a) => Some((l, a)),
                    _ => Some((len, rule.allow)),
                };
            }
        }
        best.map(|(_, allow)| allow).unwrap_or(true)
    }
}

/// robots.txt path matching with `*` wildcards and a `$` end anchor.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if !pattern.contains('*') && !pattern.ends_with('$') {
        return path.starts_with(pattern);
    }
    let (body, anchored) = match pattern.strip_suffix('$') {
        Some(body) => (body, true),
        None => (pattern, false),
    };
    let escaped: Vec<String> = body.split('*').map(regex::escape).collect();
    let mut re = format!("^{}", escaped.join(".*"));
    if anchored {
        re.push('$');
    }
    Regex::new(&re).map(|r| r.is_match(path)).unwrap_or(false)
}

/// Cached robots.txt gate.
pub struct RobotsGate {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn KvCache>,
    trusted_hosts: Vec<String>,
    agent: String,
}

impl RobotsGate {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<dyn KvCache>,
        trusted_hosts: Vec<String>,
        agent: &str,
    ) -> Self {
        // Product token only: "regional_news_ingest/0.1 (+...)" → "regional_news_ingest".
        let token = agent.split(['/', ' ']).next().unwrap_or(agent).to_string();
        Self {
            fetcher,
            cache,
            trusted_hosts: trusted_hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect(),
            agent: token,
        }
    }

    fn is_trusted(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.trusted_hosts
            .iter()
            .any(|t| host == *t || host.ends_with(&format!(".{t}")))
    }

    async fn robots_body(&self, url: &Url) -> String {
        let origin = url.origin().ascii_serialization();
        let key = format!("robots:{origin}");
        match self.cache.get(&key).await {
            Ok(Some(body)) => return body,
            Ok(None) => {}
            Err(e) => warn!(%origin, error = %e, "robots cache read failed"),
        }
        // Missing or unreachable robots.txt means no restrictions.
        let body = match self.fetcher.fetch(&format!("{origin}/robots.txt")).await {
            Ok(page) => page.body,
            Err(e) => {
                debug!(%origin, error = %e, "No robots.txt");
                String::new()
            }
        };
        if let Err(e) = self.cache.set(&key, &body, ROBOTS_TTL).await {
            warn!(%origin, error = %e, "robots cache write failed");
        }
        body
    }

    /// Whether a generic crawl may fetch `url`.
    pub async fn allowed(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.is_trusted(host) {
            return true;
        }
        let body = self.robots_body(url).await;
        let rules = RobotsRules::parse(&body, &self.agent);
        let mut path = url.path().to_string();
        if let Some(q) = url.query() {
            path.push('?');
            path.push_str(q);
        }
        rules.is_allowed(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCache;
    use crate::testing::MockFetcher;

    const ROBOTS: &str = "
User-agent: *
Disallow: /search
Disallow: /*.pdf$
Allow: /search/help

User-agent: BadBot
Disallow: /
";

    #[test]
    fn test_parse_wildcard_group() {
        let rules = RobotsRules::parse(ROBOTS, "regional_news_ingest");
        assert!(rules.is_allowed("/news/story"));
        assert!(!rules.is_allowed("/search?q=x"));
        assert!(rules.is_allowed("/search/help"));
        assert!(!rules.is_allowed("/files/report.pdf"));
        assert!(rules.is_allowed("/files/report.pdf.html"));
    }

    #[test]
    fn test_specific_group_overrides_wildcard() {
        let rules = RobotsRules::parse(ROBOTS, "badbot");
        assert!(!rules.is_allowed("/news/story"));
    }

    #[test]
    fn test_empty_robots_allows_all() {
        assert!(RobotsRules::parse("", "x").is_allowed("/anything"));
        let open = "User-agent: *\nDisallow:\n";
        assert!(RobotsRules::parse(open, "x").is_allowed("/anything"));
    }

    #[tokio::test]
    async fn test_gate_caches_and_trusts() {
        let fetcher = Arc::new(
            MockFetcher::new().text("https://e.com/robots.txt", "User-agent: *\nDisallow: /private\n"),
        );
        let cache = Arc::new(MemoryCache::new());
        let gate = RobotsGate::new(
            fetcher.clone(),
            cache,
            vec!["trusted.com".into()],
            "regional_news_ingest/0.1",
        );
        assert!(!gate.allowed(&Url::parse("https://e.com/private/x").unwrap()).await);
        assert!(gate.allowed(&Url::parse("https://e.com/news/x").unwrap()).await);
        assert_eq!(fetcher.fetch_count("https://e.com/robots.txt"), 1);
        assert!(gate.allowed(&Url::parse("https://www.trusted.com/private").unwrap()).await);
        assert!(!fetcher.was_fetched("https://www.trusted.com/robots.txt"));
    }
}
