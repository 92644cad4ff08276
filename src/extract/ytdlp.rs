use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{MediaResolver, ResolvedMedia};
use crate::error::ExtractionFailure;

static UNSUPPORTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)unsupported url|no suitable extractor").unwrap());

static NETWORK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)timed out|unable to download|connection (refused|reset|aborted)|name or service not known|failed to resolve|network is unreachable|http error 5\d\d",
    )
    .unwrap()
});

/// Subset of the `--dump-single-json` document that the pipeline uses
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<f64>,
}

impl From<YtDlpInfo> for ResolvedMedia {
    fn from(info: YtDlpInfo) -> Self {
        ResolvedMedia {
            title: info.title,
            url: info.url,
            thumbnail: info.thumbnail,
            duration: info.duration,
            uploader: info.uploader,
            filesize: info
                .filesize
                .or(info.filesize_approx.map(|s| s.max(0.0) as u64)),
        }
    }
}

/// Resolver backed by the `yt-dlp` executable
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    binary: String,
    timeout: Duration,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp", Duration::from_secs(60))
    }
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build command arguments
    fn build_args(&self, url: &str) -> Vec<String> {
        vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--format".to_string(),
            "best".to_string(),
            "--socket-timeout".to_string(),
            self.timeout.as_secs().max(1).to_string(),
            url.to_string(),
        ]
    }
}

/// Map yt-dlp's stderr onto the three failure modes
pub fn classify_stderr(stderr: &str) -> ExtractionFailure {
    if UNSUPPORTED_RE.is_match(stderr) {
        return ExtractionFailure::Unsupported;
    }
    if NETWORK_RE.is_match(stderr) {
        let line = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or(stderr)
            .trim();
        return ExtractionFailure::Network(line.to_string());
    }
    ExtractionFailure::NoStream
}

fn parse_output(stdout: &[u8]) -> Result<ResolvedMedia, ExtractionFailure> {
    let info: YtDlpInfo = serde_json::from_slice(stdout).map_err(|e| {
        warn!(error = %e, "yt-dlp printed unreadable JSON");
        ExtractionFailure::NoStream
    })?;
    Ok(info.into())
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, ExtractionFailure> {
        let args = self.build_args(url);
        debug!(binary = %self.binary, ?args, "running extractor");

        let mut command = Command::new(&self.binary);
        command.args(&args).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(ExtractionFailure::Network(format!(
                    "extraction timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
            Ok(Err(e)) => {
                return Err(ExtractionFailure::Network(format!(
                    "cannot run {}: {}",
                    self.binary, e
                )));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_stderr(&stderr));
        }
        parse_output(&output.stdout)
    }
}
