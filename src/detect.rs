use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, Uri};

pub const MARKDOWN_MEDIA_TYPE: &str = "text/markdown";

/// Whether the caller asked for Markdown, either through `Accept` or with
/// `?markdown=1`. Anything unparseable counts as "no".
pub fn wants_markdown(headers: &HeaderMap, uri: &Uri) -> bool {
    accepts_markdown(headers) || query_requests_markdown(uri)
}

fn accepts_markdown(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.to_ascii_lowercase().contains(MARKDOWN_MEDIA_TYPE))
}

fn query_requests_markdown(uri: &Uri) -> bool {
    let Some(query) = uri.query() else {
        return false;
    };
    url::form_urlencoded::parse(query.as_bytes())
        .any(|(key, value)| key == "markdown" && value == "1")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(accept: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(accept) = accept {
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }
        headers
    }

    fn uri(raw: &str) -> Uri {
        raw.parse().expect("parse uri")
    }

    #[test]
    fn accept_header_selects_markdown() {
        assert!(wants_markdown(&headers(Some("text/markdown")), &uri("/")));
        assert!(wants_markdown(
            &headers(Some("text/html;q=0.9, Text/Markdown")),
            &uri("/docs")
        ));
    }

    #[test]
    fn query_flag_selects_markdown() {
        assert!(wants_markdown(&headers(None), &uri("/docs?markdown=1")));
        assert!(wants_markdown(
            &headers(Some("text/html")),
            &uri("/docs?lang=en&markdown=1")
        ));
        assert!(wants_markdown(&headers(None), &uri("/?markdown=0&markdown=1")));
    }

    #[test]
    fn other_requests_do_not() {
        assert!(!wants_markdown(&headers(None), &uri("/")));
        assert!(!wants_markdown(&headers(Some("text/html")), &uri("/")));
        assert!(!wants_markdown(&headers(None), &uri("/?markdown=true")));
        assert!(!wants_markdown(&headers(None), &uri("/?markdown=0")));
        assert!(!wants_markdown(&headers(None), &uri("/?markdowns=1")));
    }

    #[test]
    fn non_ascii_accept_value_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_bytes(b"text/\xffmarkdown").expect("opaque header value"),
        );
        assert!(!wants_markdown(&headers, &uri("/")));
    }
}
