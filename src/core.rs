use serde::{Deserialize, Serialize};
use std::io::Cursor;
pub use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::error::NeonError;
use crate::utils::safe_filename;

/// How a queued URL reaches its media bytes
#[derive(Display, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Copy)]
pub enum TargetKind {
    /// The URL already points at a media file
    Direct,
    /// The URL is a hosting page that needs extraction
    Platform,
}

/// File markers that identify a direct media link
#[derive(EnumIter, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Copy)]
pub enum MediaMarker {
    Mp4,
    M3u8,
    Webm,
}

impl MediaMarker {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaMarker::Mp4 => ".mp4",
            MediaMarker::M3u8 => ".m3u8",
            MediaMarker::Webm => ".webm",
        }
    }

    /// First marker mentioned anywhere in `url`
    pub fn find_in(url: &str) -> Option<Self> {
        let lower = url.to_ascii_lowercase();
        Self::iter().find(|m| lower.contains(m.extension()))
    }
}

/// A classified queue entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    pub raw_url: String,
    /// Known up front for direct links, filled from metadata for platform pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_filename: Option<String>,
    pub kind: TargetKind,
}

/// Metadata and stream location for one target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub title: String,
    pub direct_url: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

impl ExtractionResult {
    pub fn new(title: String, direct_url: String, filename: String) -> Self {
        Self {
            title,
            direct_url,
            filename,
            thumbnail: None,
            duration: None,
            uploader: None,
            content_length: None,
        }
    }

    /// Synthesize a result for a direct link, which needs no extraction
    pub fn direct(target: &Target) -> Self {
        let filename = target
            .derived_filename
            .clone()
            .unwrap_or_else(|| "video.mp4".to_string());
        let title = filename
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| filename.clone());
        Self::new(title, target.raw_url.clone(), filename)
    }

    pub fn with_thumbnail(mut self, thumbnail: String) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    /// Set duration in seconds
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_uploader(mut self, uploader: String) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }
}

/// Fully buffered response body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaBuffer {
    data: Vec<u8>,
}

impl MediaBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn byte_count(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Reader positioned at the first byte
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.data)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

/// Lifecycle of one queue item
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Fetching,
    Ready(MediaBuffer),
    Failed(NeonError),
}

impl FetchState {
    pub fn label(&self) -> &'static str {
        match self {
            FetchState::Idle => "not fetched",
            FetchState::Fetching => "fetching",
            FetchState::Ready(_) => "ready",
            FetchState::Failed(_) => "failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, FetchState::Ready(_))
    }
}

/// Downloadable payload handed to the caller
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub filename: &'a str,
    pub mime: &'static str,
    pub data: &'a [u8],
}

impl Artifact<'_> {
    /// Filename safe to join onto a local directory
    pub fn disk_name(&self) -> String {
        safe_filename(self.filename)
    }
}
