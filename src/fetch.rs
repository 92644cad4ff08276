use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use std::time::Duration;
use tracing::debug;

use crate::core::MediaBuffer;
use crate::error::{FetchFailure, NeonError, Result};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialize HTTP client with the given overall timeout.
///
/// No cookie store is enabled, so nothing carries over between targets.
pub fn get_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| NeonError::FetchFailed(FetchFailure::Network(e.to_string())))
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> NeonError {
    if e.is_timeout() {
        NeonError::FetchFailed(FetchFailure::Timeout)
    } else {
        NeonError::FetchFailed(FetchFailure::Network(e.to_string()))
    }
}

/// Execute HTTP request with error handling
pub(crate) async fn execute_request(
    client: &reqwest::Client,
    method: reqwest::Method,
    url: &str,
    headers: HeaderMap,
) -> Result<reqwest::Response> {
    let response = client
        .request(method, url)
        .headers(headers)
        .send()
        .await
        .map_err(map_reqwest_error)?;

    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(NeonError::FetchFailed(FetchFailure::HttpStatus(
            status.as_u16(),
        )))
    }
}

/// Size the server announced for the body, if any
pub(crate) fn declared_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| response.content_length())
}

/// Retrieves a whole response body into memory under a byte ceiling
#[derive(Debug, Clone)]
pub struct Fetcher {
    timeout: Duration,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Download `url` into memory.
    ///
    /// A declared length above `max_bytes` fails before any body read. Bodies
    /// without a declared length are cut off as soon as they cross the limit.
    pub async fn fetch(&self, url: &str, headers: HeaderMap, max_bytes: u64) -> Result<MediaBuffer> {
        let client = get_http_client(self.timeout)?;
        let response = execute_request(&client, reqwest::Method::GET, url, headers).await?;

        let declared = declared_length(&response);
        if let Some(size) = declared
            && size > max_bytes
        {
            return Err(NeonError::TooLarge {
                size,
                max: max_bytes,
            });
        }

        let capacity = declared.unwrap_or(0).min(max_bytes) as usize;
        let mut data = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let size = (data.len() + chunk.len()) as u64;
            if size > max_bytes {
                return Err(NeonError::TooLarge {
                    size,
                    max: max_bytes,
                });
            }
            data.extend_from_slice(&chunk);
        }

        debug!(url, bytes = data.len(), "buffered response body");
        Ok(MediaBuffer::new(data))
    }
}
