use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::core::ExtractionResult;
use crate::error::{ExtractionFailure, Result};
use crate::utils::sanitize_title;

#[cfg(feature = "ytdlp")]
pub mod ytdlp;

#[cfg(feature = "ytdlp")]
pub use ytdlp::YtDlpResolver;

/// Raw, untrusted output of a metadata resolver
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResolvedMedia {
    pub title: Option<String>,
    /// Direct stream location
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub filesize: Option<u64>,
}

/// External capability that turns a hosting page into a direct stream
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Name of the resolver (for logging)
    fn name(&self) -> &'static str;

    /// Resolve `url`, preferring the best available single-file quality
    async fn resolve(&self, url: &str) -> std::result::Result<ResolvedMedia, ExtractionFailure>;
}

/// Normalizes whatever the resolver returns into an [`ExtractionResult`].
///
/// Pure with respect to queue state: it only produces metadata.
#[derive(Clone)]
pub struct ExtractionAdapter {
    resolver: Arc<dyn MediaResolver>,
}

impl std::fmt::Debug for ExtractionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionAdapter")
            .field("resolver", &self.resolver.name())
            .finish()
    }
}

impl ExtractionAdapter {
    pub fn new(resolver: Arc<dyn MediaResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver_name(&self) -> &'static str {
        self.resolver.name()
    }

    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        let media = self.resolver.resolve(url).await?;
        debug!(url, resolver = self.resolver.name(), "resolver returned metadata");
        normalize(media).map_err(Into::into)
    }
}

/// Validate and clean resolver output
pub fn normalize(media: ResolvedMedia) -> std::result::Result<ExtractionResult, ExtractionFailure> {
    let direct_url = media
        .url
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
        .ok_or(ExtractionFailure::NoStream)?;

    let title = media
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "video".to_string());
    let filename = format!("{}.mp4", sanitize_title(&title));

    let mut result = ExtractionResult::new(title, direct_url, filename);
    if let Some(thumbnail) = media.thumbnail {
        result = result.with_thumbnail(thumbnail);
    }
    if let Some(duration) = media.duration {
        result = result.with_duration(duration);
    }
    if let Some(uploader) = media.uploader {
        result = result.with_uploader(uploader);
    }
    if let Some(size) = media.filesize {
        result = result.with_content_length(size);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NeonError;
    use crate::test_support::StubResolver;

    #[test]
    fn test_normalize_sanitizes_title() {
        let result = normalize(ResolvedMedia {
            title: Some("Night/Drive: part 1?".to_string()),
            url: Some("https://cdn.example/v.mp4".to_string()),
            duration: Some(62.5),
            uploader: Some("someone".to_string()),
            filesize: Some(1024),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(result.title, "Night/Drive: part 1?");
        assert_eq!(result.filename, "NightDrive part 1.mp4");
        assert_eq!(result.duration, Some(62.5));
        assert_eq!(result.content_length, Some(1024));
        assert_eq!(result.uploader.as_deref(), Some("someone"));
    }

    #[test]
    fn test_normalize_missing_title() {
        let result = normalize(ResolvedMedia {
            url: Some("https://cdn.example/v".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(result.filename, "video.mp4");
    }

    #[test]
    fn test_normalize_no_stream() {
        assert_eq!(
            normalize(ResolvedMedia::default()),
            Err(ExtractionFailure::NoStream)
        );
        assert_eq!(
            normalize(ResolvedMedia {
                url: Some("javascript:alert(1)".to_string()),
                ..Default::default()
            }),
            Err(ExtractionFailure::NoStream)
        );
    }

    #[tokio::test]
    async fn test_adapter_surfaces_failure() {
        let adapter = ExtractionAdapter::new(Arc::new(StubResolver::failing(
            ExtractionFailure::Unsupported,
        )));
        let err = adapter
            .extract("https://video-platform.example/watch?id=42")
            .await
            .unwrap_err();
        assert_eq!(err, NeonError::ExtractionFailed(ExtractionFailure::Unsupported));
    }

    #[tokio::test]
    async fn test_adapter_success() {
        let resolver = Arc::new(StubResolver::returning(ResolvedMedia {
            title: Some("Clip".to_string()),
            url: Some("https://cdn.example/clip".to_string()),
            ..Default::default()
        }));
        let adapter = ExtractionAdapter::new(resolver.clone());
        let result = adapter.extract("https://p.example/watch?id=1").await.unwrap();
        assert_eq!(result.direct_url, "https://cdn.example/clip");
        assert_eq!(result.filename, "Clip.mp4");
        assert_eq!(resolver.calls(), 1);
    }
}
