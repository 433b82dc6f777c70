//! URL normalization and the same-site predicate.
//!
//! Every URL the crawler touches goes through [`normalize_link`], and every
//! host comparison goes through [`same_site`]. Same-site URLs are then
//! rewritten onto the root's scheme and host by [`CrawlTarget::canonicalize`],
//! so `www.` and `http`/`https` variants share one visited-set key.

use crate::crawler::error::CrawlError;
use std::fmt;
use url::Url;

/// File extensions that never lead to an HTML page
const NON_HTML_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".xml",
    ".zip", ".rar", ".gz", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".mp3", ".mp4",
    ".avi", ".mov", ".wav",
];

/// Site key of a host: lowercase, without a leading `www.`
pub fn site_key(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}

/// Whether two URLs belong to the same site
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => site_key(ha) == site_key(hb),
        _ => false,
    }
}

/// The root of a crawl: scheme and host of the site under audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    root: Url,
    site: String,
}

impl CrawlTarget {
    /// Build a target from user input.
    ///
    /// Bare domains get an `https://` prefix. Path, query and fragment are
    /// dropped; the root always ends with a single `/`.
    pub fn parse(input: &str) -> Result<Self, CrawlError> {
        let trimmed = input.trim();
        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else if trimmed.contains("://") {
            let scheme = trimmed.split("://").next().unwrap_or_default();
            return Err(CrawlError::UnsupportedScheme {
                scheme: scheme.to_string(),
                url: trimmed.to_string(),
            });
        } else {
            format!("https://{}", trimmed)
        };

        let parsed = Url::parse(&with_scheme)?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CrawlError::MissingHost(trimmed.to_string()))?
            .to_ascii_lowercase();

        let mut root = parsed.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        root.set_host(Some(&host))?;

        Ok(Self {
            site: site_key(&host),
            root,
        })
    }

    /// Root URL, always with a trailing slash
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Host without `www.`, used for same-site checks
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Whether `url` belongs to this site
    pub fn contains(&self, url: &Url) -> bool {
        same_site(&self.root, url)
    }

    /// Rewrite a same-site URL onto the root's scheme, host and port.
    ///
    /// Returns `None` for URLs of other sites.
    pub fn canonicalize(&self, url: &Url) -> Option<Url> {
        if !self.contains(url) {
            return None;
        }
        let mut canonical = url.clone();
        canonical.set_scheme(self.root.scheme()).ok()?;
        canonical.set_host(self.root.host_str()).ok()?;
        canonical.set_port(self.root.port()).ok()?;
        Some(canonical)
    }

    /// Absolute URL of a well-known path such as `/robots.txt`
    pub fn well_known(&self, path: &str) -> Url {
        let mut url = self.root.clone();
        url.set_path(path);
        url
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

/// Resolve `href` against `base` and normalize it for the visited set.
///
/// Returns `None` for non-HTTP schemes, unparsable links and obvious
/// non-HTML assets. Query and fragment are removed and the trailing slash
/// is dropped from any path other than `/`.
pub fn normalize_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:", "file:", "ftp:"]
        .iter()
        .any(|p| lower.starts_with(p))
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);

    let path = url.path().to_ascii_lowercase();
    if NON_HTML_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return None;
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        url.set_path("/");
    } else {
        url.set_path(&trimmed);
    }
    Some(url)
}
