use thiserror::Error;

/// Why the extraction capability could not produce a playable stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("unsupported")]
    Unsupported,

    #[error("network: {0}")]
    Network(String),

    #[error("no stream")]
    NoStream,
}

/// Why a buffered fetch failed after the request was issued
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("network: {0}")]
    Network(String),

    #[error("timeout")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// The caller dropped the fetch before it settled
    #[error("interrupted")]
    Interrupted,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NeonError {
    #[error("Invalid URL: {0}")]
    InvalidUrlKind(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(#[from] ExtractionFailure),

    #[error("Payload of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] FetchFailure),

    #[error("Item {0} is not ready")]
    NotReady(usize),

    #[error("No queue item at index {0}")]
    IndexOutOfRange(usize),

    #[error("Item {0} is already being fetched")]
    AlreadyFetching(usize),

    #[error("Invalid header value: {0}")]
    Header(String),
}

impl NeonError {
    /// Whether re-triggering the same item may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NeonError::ExtractionFailed(_) | NeonError::FetchFailed(_)
        )
    }
}

impl From<reqwest::header::InvalidHeaderValue> for NeonError {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        NeonError::Header(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NeonError>;
