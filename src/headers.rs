use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use url::Url;

use crate::classify::parse_absolute;
use crate::error::Result;

/// Browser user agents rotated per request
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36",
];

/// `scheme://host[:port]` of the URL itself
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Pick a user agent uniformly at random. Not a security measure.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Build request headers that make the target host see a same-site request.
///
/// Referer and Origin always come from `url` itself, never from the page that
/// linked to it.
pub fn headers_for(url: &str) -> Result<HeaderMap> {
    let parsed = parse_absolute(url)?;
    let origin = origin_of(&parsed);

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(REFERER, HeaderValue::from_str(&format!("{}/", origin))?);
    headers.insert(ORIGIN, HeaderValue::from_str(&origin)?);
    Ok(headers)
}
