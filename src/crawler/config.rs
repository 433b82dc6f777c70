//! # Audit Configuration Module
//!
//! Configuration for a single site audit: the crawl budget, network
//! timeouts, politeness settings and the policy thresholds used when
//! turning crawled pages into signals. It uses a builder pattern for
//! flexible configuration.
//!
//! ## Key Components
//!
//! - `AuditConfig`: crawl parameters handed in by the caller
//! - `AuditConfigBuilder`: builder pattern implementation
//! - `AuditPolicy`: empirically tuned thresholds for the business-site domain
//!
//! The thresholds in `AuditPolicy` were tuned on French small-business
//! sites and should not be assumed to carry over to other kinds of sites.

use chrono::NaiveDate;
use std::time::Duration;

/// Pages fetched per site before the crawl stops
pub const DEFAULT_MAX_PAGES: u32 = 30;

/// Per-request timeout for crawled pages, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Timeout for robots.txt, sitemap.xml and the blog probe, in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Delay between consecutive requests, in milliseconds
pub const DEFAULT_RATE_LIMIT_MS: u64 = 500;

/// Most recent date older than this marks a site as abandoned (two years)
pub const STALE_AFTER_DAYS: i64 = 730;

/// Median gap at or under which publishing is weekly
pub const WEEKLY_MAX_GAP_DAYS: f64 = 10.0;

/// Median gap at or under which publishing is monthly
pub const MONTHLY_MAX_GAP_DAYS: f64 = 45.0;

/// Median gap at or under which publishing is quarterly
pub const QUARTERLY_MAX_GAP_DAYS: f64 = 120.0;

/// Pages with fewer visible words are counted as empty
pub const THIN_PAGE_WORDS: usize = 50;

/// Titles shorter than this are reported as too short
pub const SHORT_TITLE_CHARS: usize = 20;

/// Thresholds used by the signal aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct AuditPolicy {
    /// Age in days after which the latest date means "abandoned"
    pub stale_after_days: i64,

    /// Cadence boundaries on the median gap, in days
    pub weekly_max_gap_days: f64,
    pub monthly_max_gap_days: f64,
    pub quarterly_max_gap_days: f64,

    /// Word count under which a page is thin
    pub thin_page_words: usize,

    /// Character count under which a title is short
    pub short_title_chars: usize,
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            stale_after_days: STALE_AFTER_DAYS,
            weekly_max_gap_days: WEEKLY_MAX_GAP_DAYS,
            monthly_max_gap_days: MONTHLY_MAX_GAP_DAYS,
            quarterly_max_gap_days: QUARTERLY_MAX_GAP_DAYS,
            thin_page_words: THIN_PAGE_WORDS,
            short_title_chars: SHORT_TITLE_CHARS,
        }
    }
}

/// Configuration for one site audit
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Maximum number of pages to fetch
    pub max_pages: u32,

    /// Per-request timeout for crawled pages
    pub timeout: Duration,

    /// Timeout for the robots.txt, sitemap and blog probes
    pub probe_timeout: Duration,

    /// Rate limit in milliseconds between requests
    pub rate_limit_ms: u64,

    /// Whether to skip paths disallowed for all agents in robots.txt
    pub respect_robots_txt: bool,

    /// User agent to use for requests
    pub user_agent: String,

    /// Date the audit is evaluated against; `None` means today
    pub as_of: Option<NaiveDate>,

    /// Classification thresholds
    pub policy: AuditPolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            respect_robots_txt: true,
            user_agent: "Mozilla/5.0 (compatible; SEOAuditBot/1.0)".to_string(),
            as_of: None,
            policy: AuditPolicy::default(),
        }
    }
}

/// Builder for AuditConfig
#[derive(Debug, Default)]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: AuditConfig::default(),
        }
    }

    /// Set the maximum number of pages to fetch
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the timeout for site probes
    pub fn probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.config.probe_timeout = probe_timeout;
        self
    }

    /// Set the rate limit in milliseconds between requests
    pub fn rate_limit_ms(mut self, rate_limit_ms: u64) -> Self {
        self.config.rate_limit_ms = rate_limit_ms;
        self
    }

    /// Set whether to respect robots.txt
    pub fn respect_robots_txt(mut self, respect_robots_txt: bool) -> Self {
        self.config.respect_robots_txt = respect_robots_txt;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Evaluate dates against a fixed day instead of today
    pub fn as_of(mut self, as_of: NaiveDate) -> Self {
        self.config.as_of = Some(as_of);
        self
    }

    /// Replace the classification thresholds
    pub fn policy(mut self, policy: AuditPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Build the configuration
    pub fn build(self) -> AuditConfig {
        self.config
    }
}

impl AuditConfig {
    /// Create a new builder
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder::new()
    }

    /// Get the rate limit as a Duration
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// The day dates are measured against
    pub fn reference_date(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
