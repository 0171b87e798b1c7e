use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_TYPE, VARY};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::artifact::{artifact_relative_path, is_contained_route};
use crate::content_signal::CONTENT_SIGNAL_HEADER;
use crate::convert::{ConverterOptions, MarkdownConverter};
use crate::fetch::{PageFetcher, SKIP_MARKER, SelfFetcher, fetch_page_html};
use crate::options::NegotiationOptions;
use crate::strip::BoilerplateStripper;
use crate::tokens::estimate_tokens;

pub const MARKDOWN_TOKENS_HEADER: &str = "x-markdown-tokens";
pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

/// Compiled, immutable form of [`NegotiationOptions`]. Share it behind an
/// `Arc`; concurrent requests need no locking.
pub struct Negotiator {
    skip_header: HeaderName,
    vary_header: bool,
    content_signal: Option<HeaderValue>,
    origin: Option<Url>,
    artifacts_dir: Option<PathBuf>,
    stripper: BoilerplateStripper,
    converter: MarkdownConverter,
    fetcher: Arc<dyn PageFetcher>,
}

impl std::fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("skip_header", &self.skip_header)
            .field("vary_header", &self.vary_header)
            .field("content_signal", &self.content_signal)
            .field("origin", &self.origin)
            .field("artifacts_dir", &self.artifacts_dir)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum Negotiation {
    PassThrough(PassReason),
    Markdown(MarkdownResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    /// The request is our own self-fetch.
    InternalFetch,
    /// The caller did not ask for Markdown.
    NotRequested,
    /// The HTML rendering could not be fetched.
    Unavailable,
}

impl PassReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::InternalFetch => "internal fetch",
            Self::NotRequested => "markdown not requested",
            Self::Unavailable => "html unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownResponse {
    pub body: String,
    pub tokens: usize,
    pub vary: bool,
    pub content_signal: Option<HeaderValue>,
}

impl IntoResponse for MarkdownResponse {
    fn into_response(self) -> Response {
        let mut resp = Response::new(Body::from(self.body));
        let headers = resp.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(MARKDOWN_CONTENT_TYPE));
        headers.insert(
            HeaderName::from_static(MARKDOWN_TOKENS_HEADER),
            HeaderValue::from(self.tokens),
        );
        if self.vary {
            headers.insert(VARY, HeaderValue::from_static("accept"));
        }
        if let Some(signal) = self.content_signal {
            headers.insert(HeaderName::from_static(CONTENT_SIGNAL_HEADER), signal);
        }
        resp
    }
}

impl Negotiator {
    /// Builds a negotiator that self-fetches over HTTP.
    pub fn new(options: NegotiationOptions) -> anyhow::Result<Self> {
        let fetcher = SelfFetcher::new()?;
        Self::with_fetcher(options, Arc::new(fetcher))
    }

    pub fn with_fetcher(
        options: NegotiationOptions,
        fetcher: Arc<dyn PageFetcher>,
    ) -> anyhow::Result<Self> {
        let skip_header = HeaderName::from_bytes(options.skip_header.trim().as_bytes())
            .with_context(|| format!("invalid skip header name: {:?}", options.skip_header))?;
        let content_signal = options
            .content_signal
            .header_value()
            .map(|value| HeaderValue::from_str(&value))
            .transpose()
            .context("build content-signal header")?;
        let stripper = BoilerplateStripper::new(&options.strip_selectors)
            .context("compile strip selectors")?;
        let converter = MarkdownConverter::new(ConverterOptions::AGENT)?;

        Ok(Self {
            skip_header,
            vary_header: options.vary_header,
            content_signal,
            origin: options.origin,
            artifacts_dir: options.artifacts_dir,
            stripper,
            converter,
            fetcher,
        })
    }

    pub async fn negotiate(&self, parts: &Parts) -> Negotiation {
        if self.is_internal(&parts.headers) {
            return Negotiation::PassThrough(PassReason::InternalFetch);
        }

        if !crate::detect::wants_markdown(&parts.headers, &parts.uri) {
            return Negotiation::PassThrough(PassReason::NotRequested);
        }

        if let Some(markdown) = self.read_artifact(parts.uri.path()).await {
            tracing::debug!(path = %parts.uri.path(), "serving pre-built markdown");
            return Negotiation::Markdown(self.respond(markdown));
        }

        let Some(html) =
            fetch_page_html(self.fetcher.as_ref(), parts, &self.skip_header, self.origin.as_ref())
                .await
        else {
            return Negotiation::PassThrough(PassReason::Unavailable);
        };

        Negotiation::Markdown(self.render(&html))
    }

    /// Strips, converts, and wraps `html` as a Markdown reply.
    pub fn render(&self, html: &str) -> MarkdownResponse {
        let cleaned = self.stripper.strip(html);
        self.respond(self.converter.convert(&cleaned))
    }

    fn respond(&self, markdown: String) -> MarkdownResponse {
        MarkdownResponse {
            tokens: estimate_tokens(&markdown),
            body: markdown,
            vary: self.vary_header,
            content_signal: self.content_signal.clone(),
        }
    }

    fn is_internal(&self, headers: &HeaderMap) -> bool {
        headers
            .get(&self.skip_header)
            .is_some_and(|value| value.as_bytes() == SKIP_MARKER.as_bytes())
    }

    async fn read_artifact(&self, path: &str) -> Option<String> {
        let dir = self.artifacts_dir.as_ref()?;
        if !is_contained_route(path) {
            return None;
        }
        let file = dir.join(artifact_relative_path(path));
        match tokio::fs::read_to_string(&file).await {
            Ok(markdown) => Some(markdown),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::debug!(file = %file.display(), %err, "read pre-built markdown");
                None
            }
        }
    }
}

/// axum middleware: `from_fn_with_state(Arc<Negotiator>, markdown_middleware)`.
pub async fn markdown_middleware(
    State(negotiator): State<Arc<Negotiator>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    match negotiator.negotiate(&parts).await {
        Negotiation::Markdown(markdown) => markdown.into_response(),
        Negotiation::PassThrough(reason) => {
            tracing::debug!(uri = %parts.uri, reason = reason.as_str(), "pass through");
            let mut response = next.run(Request::from_parts(parts, body)).await;
            // The HTML reply still varies on `accept` for shared caches.
            if negotiator.vary_header && reason != PassReason::InternalFetch {
                response
                    .headers_mut()
                    .append(VARY, HeaderValue::from_static("accept"));
            }
            response
        }
    }
}
