//! # Site Audit Module
//!
//! Reduces a crawl into the flat [`SignalBundle`] handed to prospect
//! scoring. The reduction is a pure function of the crawl outcome and a
//! reference date, so the same crawl always yields the same bundle.
//!
//! ## Key Components
//!
//! - `blog`: blog detection from paths, navigation and a probe page
//! - `cms`: platform fingerprinting
//! - `dates`: date mining and publishing cadence
//! - `status`: the blog and site activity classification
//! - `Auditor`: crawl + aggregate for one site at a time

pub mod blog;
pub mod cms;
pub mod dates;
mod report;
pub mod status;

pub use report::render_text;

use crate::audit::cms::{Cms, CmsSignatures};
use crate::audit::dates::{Cadence, DatePool};
use crate::audit::status::{DateSignal, SiteStatus, classify_activity, classify_blog};
use crate::crawler::{AuditConfig, AuditPolicy, CrawlOutcome, CrawlTarget, PageRecord, crawl_site};
use crate::error::{Error, Result};
use crate::http::Fetcher;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Path fragments of pages that are short by nature
const THIN_PAGE_EXCLUSIONS: &[&str] = &[
    "contact",
    "mentions-legales",
    "mentions_legales",
    "cgv",
    "cgu",
    "privacy",
    "politique",
    "login",
    "connexion",
];

/// Reported when not a single page could be fetched
pub const NO_PAGE_ERROR: &str = "Aucune page accessible";

/// Every indicator gathered for one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub nb_pages: usize,
    pub profondeur_max: u32,
    pub has_sitemap: bool,
    pub has_robots_txt: bool,
    pub has_blog: bool,
    pub blog_url: Option<String>,
    pub has_rss: bool,
    pub blog_status: SiteStatus,
    pub derniere_maj_blog: Option<NaiveDate>,
    pub frequence_publication: Cadence,
    pub derniere_date: Option<NaiveDate>,
    pub activite_status: SiteStatus,
    pub pages_sans_title: usize,
    pub pages_title_court: usize,
    /// Share of pages repeating a title already seen on the site
    pub titles_dupliques: f64,
    pub pages_sans_meta_desc: usize,
    pub pages_sans_h1: usize,
    pub pages_h1_multiple: usize,
    pub pages_sans_canonical: usize,
    pub pages_noindex: usize,
    pub mots_moyen_par_page: usize,
    pub pages_vides: usize,
    /// Mean of the per-page visible text over HTML ratios
    pub ratio_texte_html: f64,
    pub cms_detecte: Cms,
    pub pages_en_erreur: usize,
    pub audit_erreur: Option<String>,
}

impl Default for SignalBundle {
    fn default() -> Self {
        Self {
            nb_pages: 0,
            profondeur_max: 0,
            has_sitemap: false,
            has_robots_txt: false,
            has_blog: false,
            blog_url: None,
            has_rss: false,
            blog_status: SiteStatus::Absent,
            derniere_maj_blog: None,
            frequence_publication: Cadence::Rare,
            derniere_date: None,
            activite_status: SiteStatus::Absent,
            pages_sans_title: 0,
            pages_title_court: 0,
            titles_dupliques: 0.0,
            pages_sans_meta_desc: 0,
            pages_sans_h1: 0,
            pages_h1_multiple: 0,
            pages_sans_canonical: 0,
            pages_noindex: 0,
            mots_moyen_par_page: 0,
            pages_vides: 0,
            ratio_texte_html: 0.0,
            cms_detecte: Cms::NotDetected,
            pages_en_erreur: 0,
            audit_erreur: None,
        }
    }
}

impl SignalBundle {
    /// Bundle for a site where nothing could be fetched
    pub fn unreachable() -> Self {
        Self {
            audit_erreur: Some(NO_PAGE_ERROR.to_string()),
            ..Self::default()
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_structural_page(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    THIN_PAGE_EXCLUSIONS.iter().any(|keyword| path.contains(keyword))
}

/// Pages repeating a title already used by an earlier page
fn duplicate_title_pages(pages: &[&PageRecord]) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for page in pages.iter().filter(|p| !p.title.is_empty()) {
        *counts.entry(page.title.as_str()).or_default() += 1;
    }
    counts.values().map(|n| n - 1).sum()
}

/// Reduce a crawl into its signal bundle, measuring ages against `today`
pub fn aggregate(outcome: &CrawlOutcome, today: NaiveDate, policy: &AuditPolicy) -> SignalBundle {
    let fetched: Vec<&PageRecord> = outcome.fetched_pages().collect();
    if fetched.is_empty() {
        return SignalBundle::unreachable();
    }
    let nb_pages = fetched.len();
    let count = |predicate: fn(&PageRecord) -> bool| fetched.iter().filter(|p| predicate(p)).count();

    let blog = blog::detect(&outcome.pages, outcome.blog_probe.as_ref());

    let mut site_dates = DatePool::new();
    for page in &fetched {
        site_dates.add_page(&page.dates);
    }
    if let Some(probe) = outcome.blog_probe.as_ref().filter(|p| p.is_ok()) {
        site_dates.add_page(&probe.dates);
    }
    let site_signal = DateSignal {
        latest: site_dates.latest(),
        cadence: site_dates.cadence(policy),
    };

    let blog_signal = blog
        .as_ref()
        .map(|b| DateSignal {
            latest: b.dates.latest(),
            cadence: b.dates.cadence(policy),
        })
        .unwrap_or(DateSignal::NONE);

    let blog_status = classify_blog(blog.is_some(), blog_signal, today, policy);
    let activite_status = classify_activity(blog_status, site_signal, today, policy);

    // Blog dates are the trusted source whenever they exist
    let activity_signal = if blog_signal.latest.is_some() {
        blog_signal
    } else {
        site_signal
    };

    let total_words: usize = fetched.iter().map(|p| p.word_count).sum();
    let ratio_sum: f64 = fetched.iter().map(|p| p.text_html_ratio()).sum();
    let pages_vides = fetched
        .iter()
        .filter(|p| p.word_count < policy.thin_page_words && !is_structural_page(p.url.path()))
        .count();
    let short_title = fetched
        .iter()
        .filter(|p| !p.title.is_empty() && p.title.chars().count() < policy.short_title_chars)
        .count();

    SignalBundle {
        nb_pages,
        profondeur_max: fetched.iter().map(|p| p.depth).max().unwrap_or_default(),
        has_sitemap: outcome.has_sitemap,
        has_robots_txt: outcome.has_robots_txt,
        has_blog: blog.is_some(),
        blog_url: blog.as_ref().map(|b| b.url.to_string()),
        has_rss: fetched.iter().any(|p| p.has_feed),
        blog_status,
        derniere_maj_blog: blog_signal.latest,
        frequence_publication: activity_signal.cadence.unwrap_or(Cadence::Rare),
        derniere_date: activity_signal.latest,
        activite_status,
        pages_sans_title: count(|p| p.title.is_empty()),
        pages_title_court: short_title,
        titles_dupliques: round2(duplicate_title_pages(&fetched) as f64 / nb_pages as f64),
        pages_sans_meta_desc: count(|p| !p.has_meta_description),
        pages_sans_h1: count(|p| p.h1_count == 0),
        pages_h1_multiple: count(|p| p.h1_count > 1),
        pages_sans_canonical: count(|p| !p.has_canonical),
        pages_noindex: count(|p| p.noindex),
        mots_moyen_par_page: (total_words as f64 / nb_pages as f64).round() as usize,
        pages_vides,
        ratio_texte_html: round2(ratio_sum / nb_pages as f64),
        cms_detecte: outcome.cms,
        pages_en_erreur: outcome.pages.len() - nb_pages,
        audit_erreur: None,
    }
}

/// Audits sites one at a time with a shared client and signature table
#[derive(Debug, Clone)]
pub struct Auditor {
    fetcher: Fetcher,
    config: AuditConfig,
    signatures: Arc<CmsSignatures>,
}

impl Auditor {
    /// Create an auditor using the built-in CMS signatures
    pub fn new(config: AuditConfig) -> Result<Self> {
        if config.max_pages == 0 {
            return Err(Error::Config("max_pages must be at least 1".to_string()));
        }
        if config.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".to_string()));
        }
        let fetcher = Fetcher::new(&config.user_agent, config.timeout)?;
        Ok(Self {
            fetcher,
            config,
            signatures: CmsSignatures::shared(),
        })
    }

    /// Use a custom signature table
    pub fn with_signatures(mut self, signatures: Arc<CmsSignatures>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Crawl a site without reducing it
    pub async fn crawl(&self, target: &CrawlTarget) -> CrawlOutcome {
        crawl_site(target, &self.fetcher, &self.config, &self.signatures).await
    }

    /// Crawl and aggregate one site.
    ///
    /// Only an unusable URL is an error; an unreachable site gives a bundle
    /// with `audit_erreur` set.
    #[instrument(skip(self))]
    pub async fn audit(&self, url: &str) -> Result<SignalBundle> {
        let target = CrawlTarget::parse(url)?;
        let outcome = self.crawl(&target).await;
        let bundle = aggregate(&outcome, self.config.reference_date(), &self.config.policy);
        info!(
            site = %target,
            nb_pages = bundle.nb_pages,
            blog_status = %bundle.blog_status,
            activite_status = %bundle.activite_status,
            "Audit complete"
        );
        Ok(bundle)
    }
}

/// Audit a single site with a one-off auditor
pub async fn audit_site(url: &str, config: AuditConfig) -> Result<SignalBundle> {
    Auditor::new(config)?.audit(url).await
}
