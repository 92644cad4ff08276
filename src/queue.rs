use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::VERSION;
use crate::classify::Classifier;
use crate::config::{ARTIFACT_MIME, Config, WORKER_COUNT};
use crate::core::{
    Artifact, ExtractionResult, FetchState, MediaBuffer, Target, TargetKind,
};
use crate::error::{FetchFailure, NeonError, Result};
use crate::extract::{ExtractionAdapter, MediaResolver};
use crate::fetch::Fetcher;
use crate::headers::headers_for;
use crate::log::{EventLog, LogEntry};
use crate::probe::{Probe, probe};

/// One queued URL and everything known about it this session
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub input: String,
    /// `None` when the input is not an absolute URL
    pub target: Option<Target>,
    pub resolution: Option<ExtractionResult>,
    pub probe: Option<Probe>,
    state: FetchState,
}

impl QueueItem {
    fn new(input: String, classified: Result<Target>) -> Self {
        let (target, state) = match classified {
            Ok(target) => (Some(target), FetchState::Idle),
            Err(e) => (None, FetchState::Failed(e)),
        };
        Self {
            input,
            target,
            resolution: None,
            probe: None,
            state,
        }
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Best filename known so far
    pub fn filename(&self) -> Option<&str> {
        self.resolution
            .as_ref()
            .map(|r| r.filename.as_str())
            .or_else(|| self.target.as_ref()?.derived_filename.as_deref())
    }
}

/// Settles an item left in `Fetching` when the fetch future is dropped early
struct FetchGuard<'a> {
    session: &'a mut Session,
    index: usize,
    armed: bool,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let err = NeonError::FetchFailed(FetchFailure::Interrupted);
        self.session.log.error(format!("[{}] {}", self.index, err));
        if let Some(item) = self.session.items.get_mut(self.index) {
            item.state = FetchState::Failed(err);
        }
    }
}

/// Per-item status for the diagnostics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ItemStatus {
    pub index: usize,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TargetKind>,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub version: &'static str,
    pub max_bytes: u64,
    pub workers: usize,
    pub logs: Vec<LogEntry>,
    pub items: Vec<ItemStatus>,
}

/// Session-scoped batch queue with one fetch state per item.
///
/// Fetches run one at a time: `trigger_fetch` borrows the session mutably and
/// resolves to `Ready` or `Failed` before it returns.
#[derive(Debug)]
pub struct Session {
    config: Config,
    classifier: Classifier,
    extractor: ExtractionAdapter,
    fetcher: Fetcher,
    items: Vec<QueueItem>,
    log: EventLog,
}

impl Session {
    pub fn new(config: Config, extractor: ExtractionAdapter) -> Self {
        Self {
            classifier: Classifier::new(config.fallback_prefix.clone()),
            fetcher: Fetcher::new(config.fetch_timeout),
            log: EventLog::new(config.log_capacity),
            items: Vec::new(),
            extractor,
            config,
        }
    }

    pub fn with_resolver(config: Config, resolver: Arc<dyn MediaResolver>) -> Self {
        Self::new(config, ExtractionAdapter::new(resolver))
    }

    /// Session that resolves platform pages through `yt-dlp`
    #[cfg(feature = "ytdlp")]
    pub fn with_ytdlp(config: Config) -> Self {
        let resolver = crate::extract::YtDlpResolver::default().with_timeout(config.extract_timeout);
        Self::with_resolver(config, Arc::new(resolver))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Drop the queue and the log and start over with a fresh classifier
    pub fn reset(&mut self) {
        self.items.clear();
        self.log.clear();
        self.classifier = Classifier::new(self.config.fallback_prefix.clone());
    }

    /// Replace the active queue; every item starts over
    pub fn set_queue<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.items = urls
            .into_iter()
            .map(|u| u.as_ref().trim().to_string())
            .filter(|u| !u.is_empty())
            .map(|u| {
                let classified = self.classifier.classify(&u);
                QueueItem::new(u, classified)
            })
            .collect();

        self.log
            .info(format!("queue replaced with {} item(s)", self.items.len()));
        for (index, item) in self.items.iter().enumerate() {
            match (&item.target, &item.state) {
                (Some(target), _) => {
                    debug!(index, kind = %target.kind, url = %target.raw_url, "classified");
                }
                (None, FetchState::Failed(e)) => {
                    self.log.error(format!("[{}] {}", index, e));
                }
                _ => {}
            }
        }
    }

    /// Newline-separated batch input
    pub fn set_queue_text(&mut self, text: &str) {
        self.set_queue(text.lines());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Result<&QueueItem> {
        self.items
            .get(index)
            .ok_or(NeonError::IndexOutOfRange(index))
    }

    pub fn get_state(&self, index: usize) -> Result<&FetchState> {
        Ok(self.item(index)?.state())
    }

    /// Resolved direct URL for playback, once known
    pub fn preview_url(&self, index: usize) -> Option<&str> {
        self.items
            .get(index)?
            .resolution
            .as_ref()
            .map(|r| r.direct_url.as_str())
    }

    /// Resolve metadata for display without fetching the payload
    pub async fn resolve(&mut self, index: usize) -> Result<&ExtractionResult> {
        let target = self.item(index)?.target.clone();
        let Some(target) = target else {
            return Err(NeonError::InvalidUrlKind(self.items[index].input.clone()));
        };
        match self.resolve_target(index, &target).await {
            Ok(result) => Ok(&*self.items[index].resolution.insert(result)),
            Err(e) => {
                self.log.error(format!("[{}] {}", index, e));
                Err(e)
            }
        }
    }

    async fn resolve_target(&mut self, index: usize, target: &Target) -> Result<ExtractionResult> {
        match target.kind {
            TargetKind::Direct => {
                let headers = headers_for(&target.raw_url)?;
                let result = probe(&target.raw_url, headers, self.config.probe_timeout).await;
                if result.is_inconclusive() {
                    self.log.info(format!(
                        "[{}] probe inconclusive for {}, continuing",
                        index, target.raw_url
                    ));
                } else {
                    self.log.info(format!(
                        "[{}] probe ok, {} bytes declared",
                        index, result.size_hint
                    ));
                }
                self.items[index].probe = Some(result);

                let mut resolution = ExtractionResult::direct(target);
                if result.size_hint > 0 {
                    resolution = resolution.with_content_length(result.size_hint);
                }
                Ok(resolution)
            }
            TargetKind::Platform => {
                let result = self.extractor.extract(&target.raw_url).await?;
                self.log.info(format!(
                    "[{}] {} resolved \"{}\"",
                    index,
                    self.extractor.resolver_name(),
                    result.title
                ));
                Ok(result)
            }
        }
    }

    /// Fetch item `index` into memory. Returns once the item is `Ready` or `Failed`.
    pub async fn trigger_fetch(&mut self, index: usize) -> Result<&FetchState> {
        let max = self.config.max_bytes;
        let item = self.item(index)?;
        if matches!(item.state, FetchState::Fetching) {
            return Err(NeonError::AlreadyFetching(index));
        }
        let over_limit = matches!(
            &item.state,
            FetchState::Failed(NeonError::TooLarge { max: failed_at, .. }) if *failed_at == max
        );
        let target = item.target.clone();
        let input = item.input.clone();

        if over_limit {
            self.log.info(format!(
                "[{}] skipped, payload already exceeded the {} byte limit",
                index, max
            ));
            return Ok(&self.items[index].state);
        }

        let Some(target) = target else {
            self.items[index].state = FetchState::Failed(NeonError::InvalidUrlKind(input));
            return Ok(&self.items[index].state);
        };

        self.items[index].state = FetchState::Fetching;
        self.log
            .info(format!("[{}] fetching {}", index, target.raw_url));

        let mut guard = FetchGuard {
            session: &mut *self,
            index,
            armed: true,
        };
        let outcome = guard.session.run_fetch(index, &target).await;
        guard.armed = false;
        drop(guard);

        let state = match outcome {
            Ok(buffer) => {
                self.log.info(format!(
                    "[{}] ready, {} bytes buffered",
                    index,
                    buffer.byte_count()
                ));
                FetchState::Ready(buffer)
            }
            Err(e) => {
                self.log.error(format!("[{}] {}", index, e));
                FetchState::Failed(e)
            }
        };
        self.items[index].state = state;
        Ok(&self.items[index].state)
    }

    async fn run_fetch(&mut self, index: usize, target: &Target) -> Result<MediaBuffer> {
        let resolution = self.resolve_target(index, target).await?;
        let direct_url = resolution.direct_url.clone();
        let content_length = resolution.content_length;
        self.items[index].resolution = Some(resolution);

        let max = self.config.max_bytes;
        if let Some(size) = content_length
            && size > max
        {
            return Err(NeonError::TooLarge { size, max });
        }

        let headers = headers_for(&direct_url)?;
        self.fetcher.fetch(&direct_url, headers, max).await
    }

    /// Move a failed or stuck item back to `Idle` so it can be triggered again
    pub fn retry(&mut self, index: usize) -> Result<&FetchState> {
        let item = self
            .items
            .get_mut(index)
            .ok_or(NeonError::IndexOutOfRange(index))?;
        if matches!(item.state, FetchState::Failed(_) | FetchState::Fetching) {
            item.state = FetchState::Idle;
            self.log.info(format!("[{}] reset for retry", index));
        }
        Ok(&self.items[index].state)
    }

    /// Buffered bytes, only once the item is `Ready`
    pub fn peek_buffer(&self, index: usize) -> Result<&MediaBuffer> {
        match self.get_state(index)? {
            FetchState::Ready(buffer) => Ok(buffer),
            _ => Err(NeonError::NotReady(index)),
        }
    }

    /// Payload, filename and mime type ready for transfer
    pub fn artifact(&self, index: usize) -> Result<Artifact<'_>> {
        let buffer = self.peek_buffer(index)?;
        let filename = self.items[index].filename().unwrap_or("video.mp4");
        Ok(Artifact {
            filename,
            mime: ARTIFACT_MIME,
            data: buffer.as_slice(),
        })
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    /// Read-only snapshot for operators
    pub fn diagnostics(&self) -> Diagnostics {
        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| ItemStatus {
                index,
                url: item.input.clone(),
                kind: item.target.as_ref().map(|t| t.kind),
                state: item.state.label(),
                filename: item.filename().map(str::to_string),
                reason: match &item.state {
                    FetchState::Failed(e) => Some(e.to_string()),
                    _ => None,
                },
                bytes: match &item.state {
                    FetchState::Ready(buffer) => Some(buffer.byte_count()),
                    _ => None,
                },
            })
            .collect();

        Diagnostics {
            version: VERSION,
            max_bytes: self.config.max_bytes,
            workers: WORKER_COUNT,
            logs: self.log.recent(self.config.log_capacity),
            items,
        }
    }
}
