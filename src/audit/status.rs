//! Blog and activity classification.
//!
//! Pure functions over an already reduced set of signals, so every branch
//! can be tested without a crawl.

use crate::audit::dates::Cadence;
use crate::crawler::AuditPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How alive a blog, or a site as a whole, looks.
///
/// Variants are ordered from least to most active; the ordering is what the
/// no-blog cap relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SiteStatus {
    #[serde(rename = "absent")]
    Absent,
    #[serde(rename = "présent")]
    Present,
    #[serde(rename = "abandonné")]
    Abandoned,
    #[serde(rename = "semi-actif")]
    SemiActive,
    #[serde(rename = "actif")]
    Active,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Absent => "absent",
            SiteStatus::Present => "présent",
            SiteStatus::Abandoned => "abandonné",
            SiteStatus::SemiActive => "semi-actif",
            SiteStatus::Active => "actif",
        }
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best status a site without a blog can reach
pub const NO_BLOG_CAP: SiteStatus = SiteStatus::SemiActive;

/// Dated evidence reduced to what classification needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSignal {
    /// Most recent date, if any
    pub latest: Option<NaiveDate>,
    /// Publishing cadence, `None` when fewer than two dates
    pub cadence: Option<Cadence>,
}

impl DateSignal {
    pub const NONE: DateSignal = DateSignal {
        latest: None,
        cadence: None,
    };
}

/// Classify from dates alone; `None` when there is no date at all
fn classify_dated(signal: DateSignal, today: NaiveDate, policy: &AuditPolicy) -> Option<SiteStatus> {
    let latest = signal.latest?;
    let status = if (today - latest).num_days() > policy.stale_after_days {
        SiteStatus::Abandoned
    } else if signal.cadence.is_some_and(|c| c.is_regular()) {
        SiteStatus::Active
    } else {
        SiteStatus::SemiActive
    };
    Some(status)
}

/// Status of the blog.
///
/// No blog is `absent`; a blog without usable dates is `présent`; an old
/// latest post is `abandonné`; weekly or monthly posting is `actif`;
/// anything else is `semi-actif`.
pub fn classify_blog(
    blog_found: bool,
    blog_dates: DateSignal,
    today: NaiveDate,
    policy: &AuditPolicy,
) -> SiteStatus {
    if !blog_found {
        return SiteStatus::Absent;
    }
    classify_dated(blog_dates, today, policy).unwrap_or(SiteStatus::Present)
}

/// Status of the site as a whole.
///
/// With a blog this mirrors the blog status. Without one, only the dates
/// pooled from every page are available, and those come largely from
/// footers and legal pages, so the result never exceeds `semi-actif`.
pub fn classify_activity(
    blog_status: SiteStatus,
    site_dates: DateSignal,
    today: NaiveDate,
    policy: &AuditPolicy,
) -> SiteStatus {
    if blog_status != SiteStatus::Absent {
        return blog_status;
    }
    classify_dated(site_dates, today, policy)
        .map(|status| status.min(NO_BLOG_CAP))
        .unwrap_or(SiteStatus::Absent)
}
