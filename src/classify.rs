use chrono::{DateTime, Utc};
use url::Url;

use crate::core::{MediaMarker, Target, TargetKind};
use crate::error::{NeonError, Result};
use crate::utils::get_md5;

/// Query parameter some hosts use to carry the real filename
const NAME_PARAM: &str = "name";

/// Parse `input` as an absolute URL with a scheme and a host
pub fn parse_absolute(input: &str) -> Result<Url> {
    let url = Url::parse(input.trim())
        .map_err(|e| NeonError::InvalidUrlKind(format!("{}: {}", input, e)))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(NeonError::InvalidUrlKind(format!("{}: missing host", input)));
    }
    Ok(url)
}

/// Decides whether a URL is a direct media link and derives its filename.
///
/// The fallback timestamp is captured once at construction so classifying the
/// same URL twice yields the same target.
#[derive(Debug, Clone)]
pub struct Classifier {
    fallback_prefix: String,
    created_at: DateTime<Utc>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("video")
    }
}

impl Classifier {
    pub fn new(fallback_prefix: impl Into<String>) -> Self {
        Self::at(fallback_prefix, Utc::now())
    }

    pub fn at(fallback_prefix: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            fallback_prefix: fallback_prefix.into(),
            created_at,
        }
    }

    pub fn classify(&self, input: &str) -> Result<Target> {
        let url = parse_absolute(input)?;
        let raw_url = input.trim().to_string();

        // Substring match, so a query value mentioning ".mp4" also counts as direct
        if MediaMarker::find_in(&raw_url).is_none() {
            return Ok(Target {
                raw_url,
                derived_filename: None,
                kind: TargetKind::Platform,
            });
        }

        let filename = name_param(&url)
            .or_else(|| last_segment(&url))
            .unwrap_or_else(|| self.fallback_name(&raw_url));

        Ok(Target {
            raw_url,
            derived_filename: Some(filename),
            kind: TargetKind::Direct,
        })
    }

    /// `<prefix>_<timestamp>_<hash><ext>`, unique per URL within a session.
    /// The extension follows the media marker found in `url`.
    pub fn fallback_name(&self, url: &str) -> String {
        let hash = get_md5(url);
        let extension = MediaMarker::find_in(url).map_or(".mp4", |m| m.extension());
        format!(
            "{}_{}_{}{}",
            self.fallback_prefix,
            self.created_at.format("%Y%m%d%H%M%S"),
            &hash[..8],
            extension
        )
    }
}

fn name_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, v)| k == NAME_PARAM && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

fn last_segment(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    if !segment.contains('.') {
        return None;
    }
    let decoded = urlencoding::decode(segment)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(decoded)
}

/// Classify with a classifier created now
pub fn classify(url: &str) -> Result<Target> {
    Classifier::default().classify(url)
}
