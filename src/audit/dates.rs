//! Publication dates and publishing cadence.
//!
//! Dates are mined from three places, in decreasing order of trust:
//! `<time>` elements and structured data (JSON-LD, `article:*` meta,
//! microdata) on one side, and `/2023/06/15/`-style URL segments on the
//! other. The cadence is classified from the median gap between distinct
//! dates.

use crate::crawler::AuditPolicy;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Year 2010–2029, month and day, separated by `-` or `/`
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"20[12]\d[-/](0[1-9]|1[0-2])[-/](0[1-9]|[12]\d|3[01])")
        .expect("date pattern is valid")
});

/// JSON-LD date properties
static JSON_LD_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""date(?:Published|Modified|Created)"\s*:\s*"([^"]{0,40})""#)
        .expect("json-ld pattern is valid")
});

static TIME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time").expect("time selector is valid"));

static JSON_LD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("json-ld selector is valid")
});

static META_DATE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"meta[property="article:published_time"], meta[property="article:modified_time"], [itemprop="datePublished"], [itemprop="dateModified"]"#,
    )
    .expect("meta date selector is valid")
});

/// Where a date candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateSource {
    /// A `<time>` element
    TimeTag,
    /// JSON-LD, Open Graph article meta or microdata
    StructuredData,
    /// Year/month/day segments in the page URL
    UrlPattern,
}

impl DateSource {
    /// Higher is more trustworthy
    pub fn reliability(&self) -> u8 {
        match self {
            DateSource::TimeTag | DateSource::StructuredData => 2,
            DateSource::UrlPattern => 1,
        }
    }
}

/// A date found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCandidate {
    /// Text the date was read from
    pub raw: String,
    /// Parsed calendar date
    pub date: NaiveDate,
    /// Where it came from
    pub source: DateSource,
}

impl DateCandidate {
    /// Find the first plausible date inside `text`
    pub fn find(text: &str, source: DateSource) -> Option<Self> {
        let found = DATE_PATTERN.find(text)?;
        let raw = found.as_str();
        let date = parse_date(raw)?;
        Some(Self {
            raw: raw.to_string(),
            date,
            source,
        })
    }
}

/// Parse `YYYY-MM-DD` or `YYYY/MM/DD`
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&raw.replace('/', "-"), "%Y-%m-%d").ok()
}

/// Publishing frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Hebdomadaire,
    Mensuelle,
    Trimestrielle,
    Rare,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Hebdomadaire => "hebdomadaire",
            Cadence::Mensuelle => "mensuelle",
            Cadence::Trimestrielle => "trimestrielle",
            Cadence::Rare => "rare",
        }
    }

    /// Weekly or monthly publishing
    pub fn is_regular(&self) -> bool {
        matches!(self, Cadence::Hebdomadaire | Cadence::Mensuelle)
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract every date candidate from a parsed page
pub fn extract_candidates(document: &Html, url: &str) -> Vec<DateCandidate> {
    let mut candidates = Vec::new();

    for element in document.select(&TIME_SELECTOR) {
        let text = element
            .value()
            .attr("datetime")
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| element.text().collect::<String>());
        candidates.extend(DateCandidate::find(&text, DateSource::TimeTag));
    }

    for element in document.select(&JSON_LD_SELECTOR) {
        let text = element.text().collect::<String>();
        for capture in JSON_LD_DATE.captures_iter(&text) {
            candidates.extend(DateCandidate::find(&capture[1], DateSource::StructuredData));
        }
    }

    for element in document.select(&META_DATE_SELECTOR) {
        let value = element.value();
        if let Some(text) = value
            .attr("content")
            .or_else(|| value.attr("datetime"))
        {
            candidates.extend(DateCandidate::find(text, DateSource::StructuredData));
        }
    }

    candidates.extend(DateCandidate::find(url, DateSource::UrlPattern));
    candidates
}

/// Keep only the candidates of the most reliable kind present on one page
pub fn most_reliable(candidates: &[DateCandidate]) -> Vec<&DateCandidate> {
    let best = candidates
        .iter()
        .map(|c| c.source.reliability())
        .max()
        .unwrap_or_default();
    candidates
        .iter()
        .filter(|c| c.source.reliability() == best)
        .collect()
}

/// Dates pooled across pages, deduplicated and sorted oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatePool {
    dates: BTreeSet<NaiveDate>,
}

impl DatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one page's candidates, keeping only its most reliable kind
    pub fn add_page(&mut self, candidates: &[DateCandidate]) {
        self.dates
            .extend(most_reliable(candidates).into_iter().map(|c| c.date));
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Most recent date
    pub fn latest(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Cadence of the pooled dates, `None` with fewer than two of them
    pub fn cadence(&self, policy: &AuditPolicy) -> Option<Cadence> {
        let sorted: Vec<NaiveDate> = self.dates.iter().copied().collect();
        classify_cadence(&sorted, policy)
    }
}

/// Classify publishing frequency from a date series.
///
/// Duplicates are ignored. Gaps are taken newest first and the median gap
/// is compared to the policy boundaries. Fewer than two distinct dates
/// gives `None`.
pub fn classify_cadence(dates: &[NaiveDate], policy: &AuditPolicy) -> Option<Cadence> {
    let distinct: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    if distinct.len() < 2 {
        return None;
    }

    let newest_first: Vec<NaiveDate> = distinct.into_iter().rev().collect();
    let mut gaps: Vec<i64> = newest_first
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).num_days())
        .collect();
    gaps.sort_unstable();

    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) as f64 / 2.0
    } else {
        gaps[mid] as f64
    };

    let cadence = if median <= policy.weekly_max_gap_days {
        Cadence::Hebdomadaire
    } else if median <= policy.monthly_max_gap_days {
        Cadence::Mensuelle
    } else if median <= policy.quarterly_max_gap_days {
        Cadence::Trimestrielle
    } else {
        Cadence::Rare
    };
    Some(cadence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(start: NaiveDate, step_days: i64, count: i64) -> Vec<NaiveDate> {
        (0..count).map(|i| start + Duration::days(i * step_days)).collect()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2023-06-15"), Some(day(2023, 6, 15)));
        assert_eq!(parse_date("2023/06/15"), Some(day(2023, 6, 15)));
        assert_eq!(parse_date("2023-06"), None);
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2023-02-31"), None);
    }

    #[test]
    fn test_cadence_weekly() {
        let dates = series(day(2024, 1, 1), 7, 6);
        assert_eq!(
            classify_cadence(&dates, &AuditPolicy::default()),
            Some(Cadence::Hebdomadaire)
        );
    }

    #[test]
    fn test_cadence_monthly_and_quarterly() {
        let policy = AuditPolicy::default();
        assert_eq!(
            classify_cadence(&series(day(2024, 1, 1), 20, 5), &policy),
            Some(Cadence::Mensuelle)
        );
        assert_eq!(
            classify_cadence(&series(day(2023, 1, 1), 90, 4), &policy),
            Some(Cadence::Trimestrielle)
        );
    }

    #[test]
    fn test_cadence_rare() {
        let dates = series(day(2020, 1, 1), 200, 4);
        assert_eq!(
            classify_cadence(&dates, &AuditPolicy::default()),
            Some(Cadence::Rare)
        );
    }

    #[test]
    fn test_cadence_needs_two_distinct_dates() {
        let policy = AuditPolicy::default();
        assert_eq!(classify_cadence(&[], &policy), None);
        assert_eq!(classify_cadence(&[day(2024, 1, 1)], &policy), None);
        assert_eq!(
            classify_cadence(&[day(2024, 1, 1), day(2024, 1, 1)], &policy),
            None
        );
    }

    #[test]
    fn test_cadence_uses_median_not_mean() {
        // Four weekly posts then a year of silence: the median stays weekly
        let mut dates = series(day(2023, 1, 1), 7, 4);
        dates.push(day(2024, 1, 1));
        dates.push(day(2024, 1, 8));
        assert_eq!(
            classify_cadence(&dates, &AuditPolicy::default()),
            Some(Cadence::Hebdomadaire)
        );
    }

    #[test]
    fn test_cadence_order_independent() {
        let policy = AuditPolicy::default();
        let mut dates = series(day(2024, 1, 1), 30, 5);
        let forward = classify_cadence(&dates, &policy);
        dates.reverse();
        assert_eq!(classify_cadence(&dates, &policy), forward);
    }

    #[test]
    fn test_extract_time_tag() {
        let html = Html::parse_document(
            r#"<time datetime="2023-06-15T10:00:00+02:00">15 juin</time><time>2023/07/01</time>"#,
        );
        let found = extract_candidates(&html, "https://example.fr/");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.source == DateSource::TimeTag));
        assert_eq!(found[0].date, day(2023, 6, 15));
        assert_eq!(found[1].date, day(2023, 7, 1));
    }

    #[test]
    fn test_extract_structured_data() {
        let html = Html::parse_document(
            r#"<head>
            <script type="application/ld+json">{"@type": "Article", "datePublished": "2023-06-15", "dateModified": "2023-08-02T09:00"}</script>
            <meta property="article:published_time" content="2023-05-01T08:00:00Z">
            </head>"#,
        );
        let found = extract_candidates(&html, "https://example.fr/");
        let dates: Vec<NaiveDate> = found.iter().map(|c| c.date).collect();
        assert!(dates.contains(&day(2023, 6, 15)));
        assert!(dates.contains(&day(2023, 8, 2)));
        assert!(dates.contains(&day(2023, 5, 1)));
        assert!(found.iter().all(|c| c.source == DateSource::StructuredData));
    }

    #[test]
    fn test_extract_url_pattern() {
        let html = Html::parse_document("<p>Pas de date ici</p>");
        let found = extract_candidates(&html, "https://example.fr/2023/06/15/portes-ouvertes");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, DateSource::UrlPattern);
        assert_eq!(found[0].raw, "2023/06/15");
    }

    #[test]
    fn test_no_dates() {
        let html = Html::parse_document("<p>Rien</p>");
        assert!(extract_candidates(&html, "https://example.fr/").is_empty());
    }

    #[test]
    fn test_time_tag_outranks_url() {
        let candidates = vec![
            DateCandidate::find("2021/01/01", DateSource::UrlPattern).unwrap(),
            DateCandidate::find("2023-06-15", DateSource::TimeTag).unwrap(),
        ];
        let kept = most_reliable(&candidates);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].date, day(2023, 6, 15));

        let mut pool = DatePool::new();
        pool.add_page(&candidates);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.latest(), Some(day(2023, 6, 15)));
    }

    #[test]
    fn test_pool_deduplicates() {
        let mut pool = DatePool::new();
        let a = DateCandidate::find("2024-01-10", DateSource::TimeTag).unwrap();
        pool.add_page(std::slice::from_ref(&a));
        pool.add_page(std::slice::from_ref(&a));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.cadence(&AuditPolicy::default()), None);
    }
}
