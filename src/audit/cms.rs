//! CMS fingerprinting from raw HTML.
//!
//! Signatures are checked in order and the first hit wins: generator meta
//! tags first since they are explicit, then asset paths, then script
//! markers. The built-in table is built once per process and shared.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

/// Content-management platform behind a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cms {
    WordPress,
    Wix,
    Shopify,
    Squarespace,
    Webflow,
    Joomla,
    Drupal,
    #[serde(rename = "none")]
    NotDetected,
}

impl Cms {
    /// Convert to the string used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Cms::WordPress => "WordPress",
            Cms::Wix => "Wix",
            Cms::Shopify => "Shopify",
            Cms::Squarespace => "Squarespace",
            Cms::Webflow => "Webflow",
            Cms::Joomla => "Joomla",
            Cms::Drupal => "Drupal",
            Cms::NotDetected => "none",
        }
    }
}

impl std::fmt::Display for Cms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a signature looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// Case-insensitive substring of `<meta name="generator" content="...">`
    Generator,
    /// Substring of an asset URL anywhere in the markup
    AssetPath,
    /// Substring of inline script or platform-specific markup
    ScriptMarker,
}

/// One fingerprint rule
#[derive(Debug, Clone)]
pub struct Signature {
    pub cms: Cms,
    pub kind: SignatureKind,
    pub pattern: &'static str,
}

static GENERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta\s[^>]*?(?:name\s*=\s*["']generator["'][^>]*?content\s*=\s*["']([^"']*)["']|content\s*=\s*["']([^"']*)["'][^>]*?name\s*=\s*["']generator["'])"#,
    )
    .expect("generator pattern is valid")
});

static BUILTIN: LazyLock<Arc<CmsSignatures>> = LazyLock::new(|| Arc::new(CmsSignatures::builtin()));

/// Ordered signature table
#[derive(Debug, Clone)]
pub struct CmsSignatures {
    rules: Vec<Signature>,
}

impl CmsSignatures {
    /// Shared built-in table
    pub fn shared() -> Arc<CmsSignatures> {
        Arc::clone(&BUILTIN)
    }

    /// Build a table from explicit rules, in match order
    pub fn from_rules(rules: Vec<Signature>) -> Self {
        Self { rules }
    }

    fn builtin() -> Self {
        use Cms::*;
        use SignatureKind::*;

        let table: &[(Cms, SignatureKind, &'static str)] = &[
            (WordPress, Generator, "wordpress"),
            (Wix, Generator, "wix.com"),
            (Shopify, Generator, "shopify"),
            (Squarespace, Generator, "squarespace"),
            (Webflow, Generator, "webflow"),
            (Joomla, Generator, "joomla"),
            (Drupal, Generator, "drupal"),
            (WordPress, AssetPath, "/wp-content/"),
            (WordPress, AssetPath, "/wp-includes/"),
            (WordPress, AssetPath, "/wp-json"),
            (WordPress, AssetPath, "/wp-admin"),
            (Wix, AssetPath, "static.wixstatic.com"),
            (Wix, AssetPath, "static.parastorage.com"),
            (Shopify, AssetPath, "cdn.shopify.com"),
            (Shopify, AssetPath, "myshopify.com"),
            (Squarespace, AssetPath, "static1.squarespace.com"),
            (Squarespace, AssetPath, "assets.squarespace.com"),
            (Webflow, AssetPath, "assets.website-files.com"),
            (Webflow, AssetPath, "uploads-ssl.webflow.com"),
            (Joomla, AssetPath, "/media/jui/"),
            (Joomla, AssetPath, "/components/com_"),
            (Drupal, AssetPath, "/sites/default/files/"),
            (Drupal, AssetPath, "/core/misc/drupal.js"),
            (Wix, ScriptMarker, "_wix_browser_sess"),
            (Wix, ScriptMarker, "X-Wix-"),
            (Shopify, ScriptMarker, "Shopify.theme"),
            (Squarespace, ScriptMarker, "Static.SQUARESPACE_CONTEXT"),
            (Webflow, ScriptMarker, "data-wf-page"),
            (Joomla, ScriptMarker, "Joomla!"),
            (Drupal, ScriptMarker, "drupalSettings"),
            (Drupal, ScriptMarker, "drupal.js"),
        ];

        Self::from_rules(
            table
                .iter()
                .map(|&(cms, kind, pattern)| Signature { cms, kind, pattern })
                .collect(),
        )
    }

    /// Identify the platform of a page. No match gives `Cms::NotDetected`.
    pub fn detect(&self, html: &str) -> Cms {
        let generators: Vec<String> = GENERATOR
            .captures_iter(html)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().to_ascii_lowercase())
            .collect();

        self.rules
            .iter()
            .find(|rule| match rule.kind {
                SignatureKind::Generator => {
                    let needle = rule.pattern.to_ascii_lowercase();
                    generators.iter().any(|g| g.contains(&needle))
                }
                SignatureKind::AssetPath | SignatureKind::ScriptMarker => {
                    html.contains(rule.pattern)
                }
            })
            .map(|rule| rule.cms)
            .unwrap_or(Cms::NotDetected)
    }
}
