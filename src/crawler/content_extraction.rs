//! Page parsing for the crawler module
//!
//! Turns raw HTML into a [`PageView`]: the metadata completeness flags,
//! the visible text, the same-site links and the date candidates the
//! aggregator needs. Parsing is best-effort; malformed markup just yields
//! fewer signals.

use crate::audit::blog;
use crate::audit::dates::{DateCandidate, extract_candidates};
use crate::crawler::url_utils::{CrawlTarget, normalize_link};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Elements whose text is not part of the page's own content
const IGNORED_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "header", "footer", "nav"];

/// Class fragments that mark a navigation container
const NAV_CLASS_HINTS: &[&str] = &["nav", "menu", "header"];

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect(concat!("valid selector: ", $css)));
    };
}

selector!(TITLE, "title");
selector!(H1, "h1");
selector!(META_NAMED, "meta[name]");
selector!(CANONICAL, "link[rel]");
selector!(FEED, "link[type]");
selector!(ANCHOR, "a[href]");

/// A link to a page that navigation presents as the blog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub url: Url,
    pub text: String,
}

/// Structured view of one HTML page
#[derive(Debug, Clone, Default)]
pub struct PageView {
    /// Trimmed `<title>` text, empty if missing
    pub title: String,
    /// Number of `<h1>` elements
    pub h1_count: usize,
    /// `<meta name="description">` present with non-blank content
    pub has_meta_description: bool,
    /// `<link rel="canonical">` present
    pub has_canonical: bool,
    /// `<meta name="robots">` contains `noindex`
    pub noindex: bool,
    /// RSS or Atom feed advertised
    pub has_feed: bool,
    /// Visible text, whitespace-collapsed
    pub text: String,
    /// Number of words in `text`
    pub word_count: usize,
    /// Same-site links, normalized and deduplicated, in document order
    pub links: Vec<Url>,
    /// Navigation links whose label or target looks like a blog
    pub nav_blog_links: Vec<NavLink>,
    /// Links that look like individual articles
    pub article_link_count: usize,
    /// Dates found on the page
    pub dates: Vec<DateCandidate>,
}

impl PageView {
    /// Parse `html` fetched from `url`, keeping links that belong to `target`
    pub fn parse(html: &str, url: &Url, target: &CrawlTarget) -> Self {
        let document = Html::parse_document(html);

        let title = document
            .select(&TITLE)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .unwrap_or_default();

        let h1_count = document.select(&H1).count();

        let mut has_meta_description = false;
        let mut noindex = false;
        for meta in document.select(&META_NAMED) {
            let name = meta.value().attr("name").unwrap_or_default();
            let content = meta.value().attr("content").unwrap_or_default();
            if name.eq_ignore_ascii_case("description") && !content.trim().is_empty() {
                has_meta_description = true;
            } else if name.eq_ignore_ascii_case("robots")
                && content.to_ascii_lowercase().contains("noindex")
            {
                noindex = true;
            }
        }

        let has_canonical = document.select(&CANONICAL).any(|link| {
            link.value()
                .attr("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")))
        });

        let has_feed = document.select(&FEED).any(|link| {
            let kind = link.value().attr("type").unwrap_or_default().to_ascii_lowercase();
            kind.contains("rss") || kind.contains("atom")
        });

        let text = visible_text(&document);
        let word_count = text.split_whitespace().count();

        let mut links = Vec::new();
        let mut seen = HashSet::new();
        let mut nav_blog_links = Vec::new();
        let mut article_link_count = 0;

        for anchor in document.select(&ANCHOR) {
            let href = anchor.value().attr("href").unwrap_or_default();
            if blog::looks_like_article(href) {
                article_link_count += 1;
            }

            let Some(link) = normalize_link(url, href).and_then(|l| target.canonicalize(&l)) else {
                continue;
            };

            if in_navigation(&anchor) {
                let label = collapse_whitespace(&anchor.text().collect::<String>());
                if blog::is_blog_label(&label) || blog::is_blog_label(link.path()) {
                    nav_blog_links.push(NavLink {
                        url: link.clone(),
                        text: label,
                    });
                }
            }

            if seen.insert(link.clone()) {
                links.push(link);
            }
        }

        let dates = extract_candidates(&document, url.as_str());

        Self {
            title,
            h1_count,
            has_meta_description,
            has_canonical,
            noindex,
            has_feed,
            text,
            word_count,
            links,
            nav_blog_links,
            article_link_count,
            dates,
        }
    }
}

/// Text outside scripts, styles and page chrome
fn visible_text(document: &Html) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| IGNORED_TEXT_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

/// Whether an anchor sits inside `<nav>`, `<header>` or a menu-like container
fn in_navigation(anchor: &ElementRef) -> bool {
    anchor.ancestors().any(|ancestor| {
        let Some(el) = ancestor.value().as_element() else {
            return false;
        };
        if matches!(el.name(), "nav" | "header") {
            return true;
        }
        el.attr("class").is_some_and(|class| {
            let class = class.to_ascii_lowercase();
            NAV_CLASS_HINTS.iter().any(|hint| class.contains(hint))
        })
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
