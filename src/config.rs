use std::time::Duration;

/// Default memory ceiling for a single buffered fetch, in megabytes
pub const MAX_MEMORY_MB: u64 = 500;

/// Number of fetches a session runs at once
pub const WORKER_COUNT: usize = 1;

pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Mime type reported for every buffered artifact
pub const ARTIFACT_MIME: &str = "video/mp4";

/// Session configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on the bytes buffered for one item
    pub max_bytes: u64,
    /// Timeout for the HEAD probe of a direct link
    pub probe_timeout: Duration,
    /// Overall timeout for a buffered fetch
    pub fetch_timeout: Duration,
    /// Timeout handed to the extraction capability
    pub extract_timeout: Duration,
    /// Number of log entries kept before the oldest are dropped
    pub log_capacity: usize,
    /// Stem of generated filenames when a URL carries none
    pub fallback_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_bytes: MAX_MEMORY_MB * 1024 * 1024,
            probe_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(30),
            extract_timeout: Duration::from_secs(60),
            log_capacity: DEFAULT_LOG_CAPACITY,
            fallback_prefix: "video".to_string(),
        }
    }
}

impl Config {
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_max_mb(self, mb: u64) -> Self {
        self.with_max_bytes(mb.saturating_mul(1024 * 1024))
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_extract_timeout(mut self, timeout: Duration) -> Self {
        self.extract_timeout = timeout;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn with_fallback_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fallback_prefix = prefix.into();
        self
    }
}
