use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use axum::http::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, COOKIE, HOST, PRAGMA,
};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// Value of the skip header on internal requests.
pub const SKIP_MARKER: &str = "1";

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Retrieves the HTML rendering of a page.
///
/// `None` means "unavailable" and is an ordinary outcome: callers fall back
/// to serving the request normally.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &Url, headers: HeaderMap) -> Option<String>;
}

/// Same-origin GET through a shared `reqwest` client. One attempt, no retry.
#[derive(Debug, Clone)]
pub struct SelfFetcher {
    client: reqwest::Client,
}

impl SelfFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .redirect(reqwest::redirect::Policy::limited(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("build self-fetch http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for SelfFetcher {
    async fn fetch_html(&self, url: &Url, headers: HeaderMap) -> Option<String> {
        let response = match self.client.get(url.clone()).headers(headers).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(%url, %err, "self-fetch failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, %status, "self-fetch returned non-success status");
            return None;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !content_type.contains("text/html") {
            tracing::debug!(%url, %content_type, "self-fetch returned non-html content");
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(err) => {
                tracing::debug!(%url, %err, "read self-fetch body");
                None
            }
        }
    }
}

/// Fetches the HTML for the page `parts` points at, marked as internal.
pub async fn fetch_page_html(
    fetcher: &dyn PageFetcher,
    parts: &Parts,
    skip_header: &HeaderName,
    origin: Option<&Url>,
) -> Option<String> {
    let Some(url) = page_url(parts, origin) else {
        tracing::debug!(uri = %parts.uri, "cannot build absolute url for self-fetch");
        return None;
    };
    fetcher
        .fetch_html(&url, forward_headers(&parts.headers, skip_header))
        .await
}

/// Absolute URL of the inbound request.
///
/// Absolute request targets are used as-is. Otherwise the path and query
/// replace those of `origin`, or are appended to the `Host` header. The path
/// is never resolved as a reference, so `//other.host/x` stays on this host.
pub fn page_url(parts: &Parts, origin: Option<&Url>) -> Option<Url> {
    let uri = &parts.uri;
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Url::parse(&uri.to_string()).ok();
    }

    if let Some(origin) = origin {
        let mut url = origin.clone();
        url.set_path(uri.path());
        url.set_query(uri.query());
        return Some(url);
    }

    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

    let host = parts.headers.get(HOST)?.to_str().ok()?;
    let scheme = parts
        .headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| *v == "http" || *v == "https")
        .unwrap_or("http");
    Url::parse(&format!("{scheme}://{host}{path_and_query}")).ok()
}

/// Headers for the internal request: identity headers are forwarded, `accept`
/// is forced to HTML, and the skip marker is set.
pub fn forward_headers(incoming: &HeaderMap, skip_header: &HeaderName) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for name in [COOKIE, ACCEPT_LANGUAGE] {
        if let Some(value) = incoming.get(&name) {
            headers.insert(name, value.clone());
        }
    }

    headers.insert(skip_header.clone(), HeaderValue::from_static(SKIP_MARKER));
    headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}
