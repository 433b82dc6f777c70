//! # Site Crawler Module
//!
//! This module visits a candidate business website breadth-first under a
//! fixed page budget and records what it sees on every page. It is the
//! first stage of an audit: the records it produces are reduced into a
//! signal bundle by the `audit` module.
//!
//! ## Key Components
//!
//! - `AuditConfig`: crawl budget, timeouts, politeness and policy thresholds
//! - `CrawlTarget`: the normalized root of the site under audit
//! - `PageRecord`: what was observed on one fetched (or failed) page
//! - `crawl_site`: the BFS engine
//!
//! ## Features
//!
//! - Same-site breadth-first traversal with a visited set
//! - Failures recorded per page, never aborting the crawl
//! - One-off probes for robots.txt, sitemap.xml and an unconfirmed blog
//! - Basic robots.txt courtesy for the `*` agent group

mod bfs;
mod config;
mod content_extraction;
mod error;
mod robots;
pub mod url_utils;

pub use bfs::{CrawlOutcome, crawl_site};
pub use config::{
    AuditConfig, AuditConfigBuilder, AuditPolicy, DEFAULT_MAX_PAGES, DEFAULT_PROBE_TIMEOUT_SECS,
    DEFAULT_RATE_LIMIT_MS, DEFAULT_TIMEOUT_SECS, MONTHLY_MAX_GAP_DAYS, QUARTERLY_MAX_GAP_DAYS,
    SHORT_TITLE_CHARS, STALE_AFTER_DAYS, THIN_PAGE_WORDS, WEEKLY_MAX_GAP_DAYS,
};
pub use content_extraction::{NavLink, PageView};
pub use error::{CrawlError, FetchFailure};
pub use robots::RobotsRules;
pub use url_utils::{CrawlTarget, same_site};

use crate::audit::dates::DateCandidate;
use std::time::Duration;
use url::Url;

/// Everything observed on one page of a crawl
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// Normalized URL that was requested
    pub url: Url,

    /// Link distance from the root
    pub depth: u32,

    /// HTTP status of a successful fetch
    pub status: Option<u16>,

    /// Why the page could not be used, if it could not
    pub failure: Option<FetchFailure>,

    /// Time spent fetching
    pub elapsed: Duration,

    /// Trimmed title, empty when missing
    pub title: String,

    /// Number of `<h1>` elements
    pub h1_count: usize,

    /// Non-empty meta description present
    pub has_meta_description: bool,

    /// Canonical link present
    pub has_canonical: bool,

    /// Robots meta asks for noindex
    pub noindex: bool,

    /// RSS or Atom feed advertised
    pub has_feed: bool,

    /// Visible words
    pub word_count: usize,

    /// Publication-date candidates
    pub dates: Vec<DateCandidate>,

    /// Same-site links found on the page
    pub links: Vec<Url>,

    /// Navigation links presented as a blog
    pub nav_blog_links: Vec<NavLink>,

    /// Links that look like individual articles
    pub article_link_count: usize,

    /// Raw HTML length in bytes
    pub html_len: usize,

    /// Visible text length in bytes
    pub text_len: usize,
}

impl PageRecord {
    /// Record a parsed page
    pub fn from_view(
        url: Url,
        depth: u32,
        status: u16,
        elapsed: Duration,
        html_len: usize,
        view: PageView,
    ) -> Self {
        Self {
            url,
            depth,
            status: Some(status),
            failure: None,
            elapsed,
            title: view.title,
            h1_count: view.h1_count,
            has_meta_description: view.has_meta_description,
            has_canonical: view.has_canonical,
            noindex: view.noindex,
            has_feed: view.has_feed,
            word_count: view.word_count,
            dates: view.dates,
            links: view.links,
            nav_blog_links: view.nav_blog_links,
            article_link_count: view.article_link_count,
            html_len,
            text_len: view.text.len(),
        }
    }

    /// Record a page that could not be fetched
    pub fn failed(url: Url, depth: u32, failure: FetchFailure, elapsed: Duration) -> Self {
        Self {
            url,
            depth,
            status: match failure {
                FetchFailure::Status(code) => Some(code),
                _ => None,
            },
            failure: Some(failure),
            elapsed,
            title: String::new(),
            h1_count: 0,
            has_meta_description: false,
            has_canonical: false,
            noindex: false,
            has_feed: false,
            word_count: 0,
            dates: Vec::new(),
            links: Vec::new(),
            nav_blog_links: Vec::new(),
            article_link_count: 0,
            html_len: 0,
            text_len: 0,
        }
    }

    /// Whether the page was fetched and parsed
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }

    /// Visible text length over raw HTML length
    pub fn text_html_ratio(&self) -> f64 {
        if self.html_len == 0 {
            0.0
        } else {
            self.text_len as f64 / self.html_len as f64
        }
    }

    /// A successful, empty page for tests
    #[cfg(test)]
    pub(crate) fn stub(url: Url) -> Self {
        Self {
            status: Some(200),
            failure: None,
            ..Self::failed(url, 0, FetchFailure::Other, Duration::ZERO)
        }
    }
}
