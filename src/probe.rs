use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::fetch::{declared_length, execute_request, get_http_client};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Generic binary types some hosts use instead of a video mime type
const BINARY_STREAM_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

/// Outcome of a metadata-only request against a direct link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Probe {
    pub is_media: bool,
    /// Declared size in bytes, 0 when unknown
    pub size_hint: u64,
}

impl Probe {
    /// The probe could not confirm media; the pipeline may still proceed
    pub fn is_inconclusive(&self) -> bool {
        !self.is_media
    }
}

pub fn is_media_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("video") || BINARY_STREAM_TYPES.iter().any(|t| ct.starts_with(t))
}

/// Issue a HEAD request and classify the declared content type.
///
/// Never fails: any network error or non-success status reads as "not media".
pub async fn probe(url: &str, headers: HeaderMap, timeout: Duration) -> Probe {
    let client = match get_http_client(timeout) {
        Ok(client) => client,
        Err(_) => return Probe::default(),
    };
    let response = match execute_request(&client, reqwest::Method::HEAD, url, headers).await {
        Ok(response) => response,
        Err(e) => {
            debug!(url, error = %e, "probe failed");
            return Probe::default();
        }
    };

    let is_media = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_media_type);
    Probe {
        is_media,
        size_hint: declared_length(&response).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubResponse, StubServer};

    #[test]
    fn test_media_types() {
        assert!(is_media_type("video/mp4"));
        assert!(is_media_type("Video/MP2T"));
        assert!(is_media_type("application/octet-stream"));
        assert!(!is_media_type("text/html; charset=utf-8"));
        assert!(!is_media_type("application/json"));
    }

    #[tokio::test]
    async fn test_probe_video() {
        let server = StubServer::start(StubResponse::ok("video/mp4", vec![0u8; 321])).await;
        let result = probe(&server.url("/movie.mp4"), HeaderMap::new(), DEFAULT_PROBE_TIMEOUT).await;
        assert_eq!(
            result,
            Probe {
                is_media: true,
                size_hint: 321
            }
        );
        let requests = server.requests();
        assert_eq!(requests[0].method, "HEAD");
    }

    #[tokio::test]
    async fn test_probe_html() {
        let server = StubServer::start(StubResponse::ok("text/html", b"<html>".to_vec())).await;
        let result = probe(&server.url("/page.mp4"), HeaderMap::new(), DEFAULT_PROBE_TIMEOUT).await;
        assert!(!result.is_media);
        assert!(result.is_inconclusive());
    }

    #[tokio::test]
    async fn test_probe_network_failure() {
        let url = StubServer::unused_url("/x.mp4");
        let result = probe(&url, HeaderMap::new(), DEFAULT_PROBE_TIMEOUT).await;
        assert_eq!(result, Probe::default());
    }

    #[tokio::test]
    async fn test_head_not_allowed() {
        let server = StubServer::start(StubResponse {
            content_type: Some("video/mp4".to_string()),
            ..StubResponse::status(405)
        })
        .await;
        let result = probe(&server.url("/movie.mp4"), HeaderMap::new(), DEFAULT_PROBE_TIMEOUT).await;
        assert_eq!(result, Probe::default());
        assert_eq!(server.requests()[0].method, "HEAD");
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        let server = StubServer::start(
            StubResponse::ok("video/mp4", Vec::new()).with_delay(Duration::from_secs(3)),
        )
        .await;
        let result = probe(&server.url("/x.mp4"), HeaderMap::new(), Duration::from_millis(200)).await;
        assert_eq!(result, Probe::default());
    }
}
