//! # prospect-audit - Website auditing for business prospecting
//!
//! This crate crawls the website of a small business and reduces what it
//! finds into a flat set of signals: how complete the on-page SEO is,
//! whether the site runs a blog and how alive it is, and which CMS it is
//! built on. The signals feed a downstream prospect scoring step.
//!
//! ## Features
//!
//! - Breadth-first, same-site crawl under a page budget
//! - Per-page metadata, content and link extraction
//! - Publication date mining and cadence classification
//! - Blog detection with navigation-label confirmation
//! - CMS fingerprinting from ordered signatures
//! - Async API with Tokio, structured logging with tracing
//!
//! ## Example
//!
//! ```rust,no_run
//! use prospect_audit::audit::Auditor;
//! use prospect_audit::crawler::AuditConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuditConfig::builder().max_pages(20).build();
//!     let auditor = Auditor::new(config)?;
//!
//!     let bundle = auditor.audit("boulangerie-martin.fr").await?;
//!     println!("{}", serde_json::to_string_pretty(&bundle)?);
//!     Ok(())
//! }
//! ```

mod error;
pub mod http;

pub mod audit;
pub mod crawler;

pub use error::Error;

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::audit::{Auditor, SignalBundle, audit_site};
    pub use crate::crawler::AuditConfig;
    pub use crate::error::Error;
    pub use crate::error::Result;
}
