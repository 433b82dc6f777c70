//! HTTP fetcher used by the crawler
//!
//! Thin wrapper over a reqwest client with a hard per-request timeout. It
//! never retries and never returns an error for a bad page: every outcome
//! is a [`Fetched`] value the crawler can record.

use crate::crawler::FetchFailure;
use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, redirect};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};
use url::Url;

/// Maximum number of redirects followed for a single page
const MAX_REDIRECTS: usize = 5;

/// A successful response with an HTML body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,
    /// Response body decoded as text
    pub body: String,
    /// Content-Type header, if any
    pub content_type: Option<String>,
    /// URL after redirects
    pub final_url: Url,
}

/// Outcome of a single GET
#[derive(Debug, Clone)]
pub struct Fetched {
    /// URL that was requested
    pub url: Url,
    /// Wall-clock time spent on the request
    pub elapsed: Duration,
    /// The page, or why there is none
    pub result: std::result::Result<FetchedPage, FetchFailure>,
}

/// HTTP client for fetching site pages
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: ReqwestClient,
    timeout: Duration,
}

impl Fetcher {
    /// Create a fetcher with the given user agent and per-request timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR,fr;q=0.9"));

        let client = ReqwestClient::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(Error::Http)?;

        Ok(Self { client, timeout })
    }

    /// Fetch a page that is expected to be HTML
    #[instrument(skip(self), fields(url = %url), level = "debug")]
    pub async fn fetch_html(&self, url: &Url) -> Fetched {
        self.fetch(url, true, self.timeout).await
    }

    /// Fetch an HTML page with a shorter, probe-specific timeout
    #[instrument(skip(self), fields(url = %url), level = "debug")]
    pub async fn probe_html(&self, url: &Url, timeout: Duration) -> Fetched {
        self.fetch(url, true, timeout).await
    }

    /// Fetch any text resource (robots.txt, sitemap.xml) with its own timeout
    #[instrument(skip(self), fields(url = %url), level = "debug")]
    pub async fn fetch_text(&self, url: &Url, timeout: Duration) -> Fetched {
        self.fetch(url, false, timeout).await
    }

    async fn fetch(&self, url: &Url, require_html: bool, timeout: Duration) -> Fetched {
        let started = Instant::now();
        let result = self.execute(url, require_html, timeout).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(page) => debug!(status = page.status, ?elapsed, "fetched"),
            Err(failure) => debug!(%failure, ?elapsed, "fetch failed"),
        }

        Fetched {
            url: url.clone(),
            elapsed,
            result,
        }
    }

    async fn execute(
        &self,
        url: &Url,
        require_html: bool,
        timeout: Duration,
    ) -> std::result::Result<FetchedPage, FetchFailure> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchFailure::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if require_html && !is_html(content_type.as_deref()) {
            return Err(FetchFailure::NotHtml);
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::from_reqwest(&e))?;

        Ok(FetchedPage {
            status: status.as_u16(),
            body,
            content_type,
            final_url,
        })
    }
}

/// Servers that omit Content-Type are given the benefit of the doubt
fn is_html(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fetcher() -> Fetcher {
        Fetcher::new("test-agent/1.0", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(Some("text/html; charset=utf-8")));
        assert!(is_html(Some("application/xhtml+xml")));
        assert!(is_html(None));
        assert!(!is_html(Some("application/pdf")));
    }

    #[tokio::test]
    async fn test_fetch_html_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", "test-agent/1.0")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><title>Accueil</title></html>")
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/", server.url())).unwrap();
        let fetched = fetcher().fetch_html(&url).await;
        let page = fetched.result.unwrap();
        assert_eq!(page.status, 200);
        assert!(page.body.contains("Accueil"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_html_status_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/missing", server.url())).unwrap();
        let fetched = fetcher().fetch_html(&url).await;
        assert_eq!(fetched.result.unwrap_err(), FetchFailure::Status(404));
    }

    #[tokio::test]
    async fn test_fetch_html_rejects_non_html() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/data")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/data", server.url())).unwrap();
        let fetched = fetcher().fetch_html(&url).await;
        assert_eq!(fetched.result.unwrap_err(), FetchFailure::NotHtml);
    }

    #[tokio::test]
    async fn test_fetch_text_accepts_any_type() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("User-agent: *\nDisallow:")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/robots.txt", server.url())).unwrap();
        let fetched = fetcher().fetch_text(&url, Duration::from_secs(2)).await;
        assert!(fetched.result.unwrap().body.contains("User-agent"));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
        let fetched = fetcher().fetch_html(&url).await;
        assert!(fetched.result.unwrap_err().is_unreachable());
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let fetcher = Fetcher::new("test-agent/1.0", Duration::from_millis(200)).unwrap();
        let url = Url::parse(&format!("http://{}/", addr)).unwrap();
        let fetched = fetcher.fetch_html(&url).await;
        assert_eq!(fetched.result.unwrap_err(), FetchFailure::Timeout);
    }
}
