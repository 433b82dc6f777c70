//! Breadth-first crawl of one site.
//!
//! The root is fetched first. If it fails the crawl stops there and the
//! outcome carries a single failed record. Otherwise robots.txt and
//! sitemap.xml are probed, then pages are visited level by level until
//! the frontier is empty or the page budget is spent. The budget counts
//! fetch attempts, failed ones included.

use crate::audit::blog;
use crate::audit::cms::{Cms, CmsSignatures};
use crate::crawler::content_extraction::PageView;
use crate::crawler::robots::RobotsRules;
use crate::crawler::url_utils::CrawlTarget;
use crate::crawler::{AuditConfig, FetchFailure, PageRecord};
use crate::http::{Fetched, Fetcher};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Everything a crawl produced, ready for aggregation
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Site that was crawled
    pub target: CrawlTarget,

    /// Records in fetch order, failures included
    pub pages: Vec<PageRecord>,

    /// Same-site URLs queued during the crawl, in discovery order
    pub discovered: Vec<Url>,

    /// `/sitemap.xml` answered with a sitemap document
    pub has_sitemap: bool,

    /// `/robots.txt` answered with at least one user-agent group
    pub has_robots_txt: bool,

    /// Platform fingerprinted on the first fetched page
    pub cms: Cms,

    /// Extra page fetched to settle blog detection
    pub blog_probe: Option<PageRecord>,

    /// Why the root page could not be fetched
    pub root_failure: Option<FetchFailure>,
}

impl CrawlOutcome {
    fn new(target: CrawlTarget) -> Self {
        Self {
            target,
            pages: Vec::new(),
            discovered: Vec::new(),
            has_sitemap: false,
            has_robots_txt: false,
            cms: Cms::NotDetected,
            blog_probe: None,
            root_failure: None,
        }
    }

    /// Records of pages that were fetched and parsed
    pub fn fetched_pages(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages.iter().filter(|p| p.is_ok())
    }
}

/// Spaces requests out by the configured delay
struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

/// Turn a fetch into a record, fingerprinting the CMS on the first page seen
fn record_page(
    fetched: Fetched,
    depth: u32,
    target: &CrawlTarget,
    cms: &mut Option<Cms>,
    signatures: &CmsSignatures,
) -> PageRecord {
    match fetched.result {
        Ok(page) => {
            if cms.is_none() {
                *cms = Some(signatures.detect(&page.body));
            }
            // Relative links resolve against where redirects landed
            let base = if target.contains(&page.final_url) {
                &page.final_url
            } else {
                &fetched.url
            };
            let view = PageView::parse(&page.body, base, target);
            PageRecord::from_view(
                fetched.url,
                depth,
                page.status,
                fetched.elapsed,
                page.body.len(),
                view,
            )
        }
        Err(failure) => {
            warn!(url = %fetched.url, %failure, "page failed");
            PageRecord::failed(fetched.url, depth, failure, fetched.elapsed)
        }
    }
}

fn is_sitemap(body: &str) -> bool {
    body.contains("<urlset") || body.contains("<sitemapindex")
}

/// Crawl a site breadth-first within the configured budget.
///
/// Never fails: unreachable pages become failed records and an
/// unreachable root is reported through `root_failure`.
#[instrument(skip(fetcher, config, signatures), fields(site = %target))]
pub async fn crawl_site(
    target: &CrawlTarget,
    fetcher: &Fetcher,
    config: &AuditConfig,
    signatures: &CmsSignatures,
) -> CrawlOutcome {
    info!(max_pages = config.max_pages, "Starting crawl");

    let mut outcome = CrawlOutcome::new(target.clone());
    let mut pacer = Pacer::new(config.rate_limit());
    let mut cms = None;
    let mut robots = RobotsRules::default();

    let mut frontier: VecDeque<(Url, u32)> = VecDeque::new();
    let mut visited: HashSet<Url> = HashSet::new();
    visited.insert(target.root().clone());
    frontier.push_back((target.root().clone(), 0));

    let mut attempts = 0;
    while attempts < config.max_pages {
        let Some((url, depth)) = frontier.pop_front() else {
            break;
        };
        attempts += 1;

        pacer.wait().await;
        let fetched = fetcher.fetch_html(&url).await;
        if let Some(landed) = fetched
            .result
            .as_ref()
            .ok()
            .and_then(|page| target.canonicalize(&page.final_url))
        {
            if landed != url {
                visited.insert(landed);
            }
        }
        let record = record_page(fetched, depth, target, &mut cms, signatures);

        if depth == 0 {
            if let Some(failure) = record.failure {
                warn!(%failure, "Root page unreachable, stopping");
                outcome.root_failure = Some(failure);
                outcome.pages.push(record);
                return outcome;
            }

            pacer.wait().await;
            let robots_fetch = fetcher
                .fetch_text(&target.well_known("/robots.txt"), config.probe_timeout)
                .await;
            if let Ok(page) = robots_fetch.result {
                robots = RobotsRules::parse(&page.body);
                outcome.has_robots_txt = robots.is_present();
            }

            pacer.wait().await;
            let sitemap_fetch = fetcher
                .fetch_text(&target.well_known("/sitemap.xml"), config.probe_timeout)
                .await;
            outcome.has_sitemap = sitemap_fetch
                .result
                .is_ok_and(|page| page.status == 200 && is_sitemap(&page.body));

            debug!(
                has_robots_txt = outcome.has_robots_txt,
                has_sitemap = outcome.has_sitemap,
                "Probed well-known files"
            );
        }

        for link in &record.links {
            if visited.contains(link) {
                continue;
            }
            if config.respect_robots_txt && !robots.allows(link.path()) {
                debug!(url = %link, "Disallowed by robots.txt");
                continue;
            }
            visited.insert(link.clone());
            outcome.discovered.push(link.clone());
            frontier.push_back((link.clone(), depth + 1));
        }

        outcome.pages.push(record);
    }

    outcome.cms = cms.unwrap_or(Cms::NotDetected);

    if let Some(candidate) = blog::probe_candidate(&outcome.pages, &outcome.discovered) {
        let depth = frontier
            .iter()
            .find(|(url, _)| *url == candidate)
            .map(|(_, depth)| *depth)
            .unwrap_or(1);
        debug!(url = %candidate, "Probing blog candidate");

        pacer.wait().await;
        let fetched = fetcher.probe_html(&candidate, config.probe_timeout).await;
        let mut probe_cms = Some(outcome.cms);
        outcome.blog_probe = Some(record_page(
            fetched,
            depth,
            target,
            &mut probe_cms,
            signatures,
        ));
    }

    info!(
        pages = outcome.pages.len(),
        fetched = outcome.fetched_pages().count(),
        cms = %outcome.cms,
        "Crawl finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Mock, Server, ServerGuard};

    fn config(max_pages: u32) -> AuditConfig {
        AuditConfig::builder()
            .max_pages(max_pages)
            .rate_limit_ms(0)
            .timeout(Duration::from_secs(5))
            .probe_timeout(Duration::from_secs(5))
            .build()
    }

    fn html_mock(server: &mut ServerGuard, path: &str, body: &str) -> Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(body)
    }

    async fn html(server: &mut ServerGuard, path: &str, body: &str) -> Mock {
        html_mock(server, path, body).create_async().await
    }

    async fn crawl(server: &ServerGuard, config: &AuditConfig) -> CrawlOutcome {
        let target = CrawlTarget::parse(&server.url()).unwrap();
        let fetcher = Fetcher::new(&config.user_agent, config.timeout).unwrap();
        crawl_site(&target, &fetcher, config, &CmsSignatures::shared()).await
    }

    fn paths(outcome: &CrawlOutcome) -> Vec<&str> {
        outcome.pages.iter().map(|p| p.url.path()).collect()
    }

    #[tokio::test]
    async fn test_breadth_first_order() {
        let mut server = Server::new_async().await;
        html(&mut server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
        html(&mut server, "/a", r#"<a href="/a/deep">Deep</a>"#).await;
        html(&mut server, "/b", "<p>b</p>").await;
        html(&mut server, "/a/deep", "<p>deep</p>").await;

        let outcome = crawl(&server, &config(30)).await;
        assert_eq!(paths(&outcome), vec!["/", "/a", "/b", "/a/deep"]);
        let depths: Vec<u32> = outcome.pages.iter().map(|p| p.depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 2]);
        assert!(outcome.root_failure.is_none());
    }

    #[tokio::test]
    async fn test_budget_is_respected() {
        let mut server = Server::new_async().await;
        html(
            &mut server,
            "/",
            r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a><a href="/d">D</a>"#,
        )
        .await;
        html(&mut server, "/a", "<p>a</p>").await;
        html(&mut server, "/b", "<p>b</p>").await;
        let c = html_mock(&mut server, "/c", "<p>c</p>")
            .expect(0)
            .create_async()
            .await;
        let d = html_mock(&mut server, "/d", "<p>d</p>")
            .expect(0)
            .create_async()
            .await;

        let outcome = crawl(&server, &config(3)).await;
        assert_eq!(outcome.pages.len(), 3);
        assert_eq!(outcome.discovered.len(), 4);
        c.assert_async().await;
        d.assert_async().await;
    }

    #[tokio::test]
    async fn test_cycles_fetch_each_page_once() {
        let mut server = Server::new_async().await;
        let root = html_mock(&mut server, "/", r#"<a href="/a">A</a><a href="/">Home</a>"#)
            .expect(1)
            .create_async()
            .await;
        let a = html_mock(
            &mut server,
            "/a",
            r#"<a href="/">Home</a><a href="/a/">Self</a><a href="/a#top">Top</a>"#,
        )
        .expect(1)
        .create_async()
        .await;

        let outcome = crawl(&server, &config(30)).await;
        assert_eq!(paths(&outcome), vec!["/", "/a"]);
        root.assert_async().await;
        a.assert_async().await;
    }

    #[tokio::test]
    async fn test_link_variants_fetched_once() {
        let mut server = Server::new_async().await;
        let host = server.host_with_port();
        html(
            &mut server,
            "/",
            &format!(
                r#"<a href="/services">A</a>
                   <a href="https://{host}/services">B</a>
                   <a href="http://{host}/services/">C</a>"#
            ),
        )
        .await;
        let services = html_mock(&mut server, "/services", "<p>Nos services</p>")
            .expect(1)
            .create_async()
            .await;

        let outcome = crawl(&server, &config(30)).await;
        assert_eq!(paths(&outcome), vec!["/", "/services"]);
        assert_eq!(outcome.discovered.len(), 1);
        services.assert_async().await;
    }

    #[tokio::test]
    async fn test_external_links_not_followed() {
        let mut server = Server::new_async().await;
        html(
            &mut server,
            "/",
            r#"<a href="https://partenaire.example.com/offre">Partenaire</a><a href="/contact">Contact</a>"#,
        )
        .await;
        html(&mut server, "/contact", "<p>contact</p>").await;

        let outcome = crawl(&server, &config(30)).await;
        assert_eq!(paths(&outcome), vec!["/", "/contact"]);
        assert!(
            outcome
                .discovered
                .iter()
                .all(|u| u.host_str() == Some("127.0.0.1"))
        );
    }

    #[tokio::test]
    async fn test_failed_pages_are_recorded() {
        let mut server = Server::new_async().await;
        html(&mut server, "/", r#"<a href="/casse">X</a><a href="/ok">OK</a>"#).await;
        server
            .mock("GET", "/casse")
            .with_status(500)
            .create_async()
            .await;
        html(&mut server, "/ok", "<p>ok</p>").await;

        let outcome = crawl(&server, &config(30)).await;
        assert_eq!(outcome.pages.len(), 3);
        assert_eq!(outcome.pages[1].failure, Some(FetchFailure::Status(500)));
        assert!(outcome.pages[2].is_ok());
        assert_eq!(outcome.fetched_pages().count(), 2);
    }

    #[tokio::test]
    async fn test_root_failure_stops_early() {
        let mut server = Server::new_async().await;
        server.mock("GET", "/").with_status(503).create_async().await;
        let robots = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *\nDisallow:")
            .expect(0)
            .create_async()
            .await;

        let outcome = crawl(&server, &config(30)).await;
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.root_failure, Some(FetchFailure::Status(503)));
        assert!(!outcome.has_robots_txt);
        assert!(outcome.blog_probe.is_none());
        robots.assert_async().await;
    }

    #[tokio::test]
    async fn test_robots_txt_is_respected() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("User-agent: *\nDisallow: /admin\n")
            .create_async()
            .await;
        html(&mut server, "/", r#"<a href="/admin/login">A</a><a href="/ok">OK</a>"#).await;
        html(&mut server, "/ok", "<p>ok</p>").await;
        let admin = html_mock(&mut server, "/admin/login", "<p>admin</p>")
            .expect(0)
            .create_async()
            .await;

        let outcome = crawl(&server, &config(30)).await;
        assert!(outcome.has_robots_txt);
        assert_eq!(paths(&outcome), vec!["/", "/ok"]);
        admin.assert_async().await;
    }

    #[tokio::test]
    async fn test_robots_txt_can_be_ignored() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *\nDisallow: /admin\n")
            .create_async()
            .await;
        html(&mut server, "/", r#"<a href="/admin/login">A</a>"#).await;
        html(&mut server, "/admin/login", "<p>admin</p>").await;

        let config = AuditConfig {
            respect_robots_txt: false,
            ..config(30)
        };
        let outcome = crawl(&server, &config).await;
        assert!(outcome.has_robots_txt);
        assert_eq!(paths(&outcome), vec!["/", "/admin/login"]);
    }

    #[tokio::test]
    async fn test_sitemap_probe() {
        let mut server = Server::new_async().await;
        html(&mut server, "/", "<p>accueil</p>").await;
        server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(
                r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"></urlset>"#,
            )
            .create_async()
            .await;

        let outcome = crawl(&server, &config(30)).await;
        assert!(outcome.has_sitemap);
        assert!(!outcome.has_robots_txt);
    }

    #[tokio::test]
    async fn test_sitemap_soft_404_is_not_a_sitemap() {
        let mut server = Server::new_async().await;
        html(&mut server, "/", "<p>accueil</p>").await;
        html(&mut server, "/sitemap.xml", "<html>Page introuvable</html>").await;

        let outcome = crawl(&server, &config(30)).await;
        assert!(!outcome.has_sitemap);
    }

    #[tokio::test]
    async fn test_cms_fingerprinted_on_first_page() {
        let mut server = Server::new_async().await;
        html(
            &mut server,
            "/",
            r#"<head><meta name="generator" content="WordPress 6.5"></head><body>ok</body>"#,
        )
        .await;

        let outcome = crawl(&server, &config(30)).await;
        assert_eq!(outcome.cms, Cms::WordPress);
    }

    #[tokio::test]
    async fn test_blog_probe_beyond_budget() {
        let mut server = Server::new_async().await;
        html(
            &mut server,
            "/",
            r#"<nav><a href="/services">Services</a><a href="/le-coin-deco">Actualités</a></nav>"#,
        )
        .await;
        let probe = html_mock(
            &mut server,
            "/le-coin-deco",
            r#"<time datetime="2024-01-10">10 janvier</time><time datetime="2024-02-10">10 février</time>"#,
        )
        .expect(1)
        .create_async()
        .await;

        let outcome = crawl(&server, &config(1)).await;
        assert_eq!(outcome.pages.len(), 1);
        let record = outcome.blog_probe.unwrap();
        assert_eq!(record.url.path(), "/le-coin-deco");
        assert_eq!(record.depth, 1);
        assert_eq!(record.dates.len(), 2);
        probe.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_probe_when_blog_crawled() {
        let mut server = Server::new_async().await;
        html(&mut server, "/", r#"<a href="/blog">Blog</a>"#).await;
        html(&mut server, "/blog", "<p>posts</p>").await;

        let outcome = crawl(&server, &config(30)).await;
        assert!(outcome.blog_probe.is_none());
        assert_eq!(paths(&outcome), vec!["/", "/blog"]);
    }
}
