//! Blog detection.
//!
//! A crawled page whose path has a blog-like segment (`/blog`,
//! `/actualites`, `/news`, ...) is a blog page outright. A navigation link
//! whose label mentions a blog only nominates a candidate: the target page
//! must itself carry at least two dated items or two article-like links
//! before it counts, so a menu entry pointing at an empty "Actualités" page
//! does not make a blog.

use crate::audit::dates::{DatePool, most_reliable};
use crate::crawler::PageRecord;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Path segments that mark a blog section
const BLOG_PATH_SEGMENTS: &[&str] = &[
    "blog", "blogs", "actualites", "actualite", "actus", "actu", "fil-dactualite",
    "fil-actualite", "news", "articles", "article", "journal", "mag", "magazine", "ressources",
    "publications", "posts", "edito", "chroniques", "insights", "presse", "communiques",
    "breves", "dossiers", "tribunes",
];

/// Words in a menu label that point at a blog
const BLOG_LABEL_WORDS: &[&str] = &[
    "blog", "actualité", "actualités", "actualite", "actualites", "actus", "news", "journal",
    "magazine", "mag", "ressources", "publications", "édito", "edito", "insights", "presse",
    "communiqués", "communiques", "brèves", "breves", "chroniques", "dossiers", "articles",
];

/// Distinct dates or article links a nominated page needs to be a blog
const MIN_BLOG_ITEMS: usize = 2;

static ARTICLE_LINK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/20\d{2}/",
        r"/(article|post|billet|actu)s?[-/]",
        r"-\d{4}-\d{2}-\d{2}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("article link pattern is valid"))
    .collect()
});

/// Whether a URL path lives under a blog section
pub fn is_blog_path(path: &str) -> bool {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .any(|segment| {
            BLOG_PATH_SEGMENTS.contains(&segment.as_str()) || segment.starts_with("blog")
        })
}

/// Whether a menu label (or path) names a blog
pub fn is_blog_label(label: &str) -> bool {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| BLOG_LABEL_WORDS.contains(&word))
}

/// Whether an href looks like a single article
pub fn looks_like_article(href: &str) -> bool {
    let href = href.to_ascii_lowercase();
    ARTICLE_LINK_PATTERNS.iter().any(|re| re.is_match(&href))
}

/// Whether a nominated page actually hosts posts
pub fn confirms_blog(page: &PageRecord) -> bool {
    if !page.is_ok() {
        return false;
    }
    let distinct: HashSet<_> = most_reliable(&page.dates).into_iter().map(|c| c.date).collect();
    distinct.len() >= MIN_BLOG_ITEMS || page.article_link_count >= MIN_BLOG_ITEMS
}

/// A blog found on the site, with the dates of its pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogEvidence {
    /// Blog index, or the first blog page reached
    pub url: Url,
    /// Dates from blog pages only
    pub dates: DatePool,
}

fn is_under(page: &Url, root: &Url) -> bool {
    let root_path = root.path().trim_end_matches('/');
    let path = page.path();
    path == root_path || path.starts_with(&format!("{}/", root_path))
}

fn evidence_from(root: &Url, pages: &[&PageRecord]) -> BlogEvidence {
    let mut dates = DatePool::new();
    for page in pages.iter().filter(|p| is_under(&p.url, root)) {
        dates.add_page(&page.dates);
    }
    BlogEvidence {
        url: root.clone(),
        dates,
    }
}

/// Find the site's blog among crawled pages and the optional probe.
///
/// Checked in order: pages with a blog path; a crawled page nominated by
/// navigation that confirms; the probe page.
pub fn detect(pages: &[PageRecord], probe: Option<&PageRecord>) -> Option<BlogEvidence> {
    let fetched: Vec<&PageRecord> = pages.iter().filter(|p| p.is_ok()).collect();

    let blog_pages: Vec<&PageRecord> = fetched
        .iter()
        .copied()
        .filter(|p| is_blog_path(p.url.path()))
        .collect();
    if let Some(first) = blog_pages.first() {
        let mut dates = DatePool::new();
        for page in &blog_pages {
            dates.add_page(&page.dates);
        }
        return Some(BlogEvidence {
            url: first.url.clone(),
            dates,
        });
    }

    for link in fetched.iter().flat_map(|p| &p.nav_blog_links) {
        if let Some(page) = fetched.iter().find(|p| p.url == link.url) {
            if confirms_blog(page) {
                return Some(evidence_from(&page.url, &fetched));
            }
        }
    }

    let probe = probe.filter(|p| p.is_ok())?;
    if is_blog_path(probe.url.path()) || confirms_blog(probe) {
        let mut pool: Vec<&PageRecord> = fetched;
        pool.push(probe);
        return Some(evidence_from(&probe.url, &pool));
    }
    None
}

/// Pick one uncrawled URL worth fetching to settle blog detection.
///
/// Only needed when no crawled page already established a blog. A
/// discovered URL with a blog path is preferred over a navigation label.
pub fn probe_candidate(pages: &[PageRecord], discovered: &[Url]) -> Option<Url> {
    if detect(pages, None).is_some() {
        return None;
    }

    let fetched: HashSet<&Url> = pages.iter().map(|p| &p.url).collect();

    discovered
        .iter()
        .find(|url| !fetched.contains(url) && is_blog_path(url.path()))
        .or_else(|| {
            pages
                .iter()
                .flat_map(|p| &p.nav_blog_links)
                .map(|link| &link.url)
                .find(|url| !fetched.contains(url))
        })
        .cloned()
}
