pub mod classify;
pub mod config;
pub mod core;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod headers;
pub mod log;
pub mod probe;
pub mod queue;
mod utils;

#[cfg(test)]
mod test_support;

pub use classify::{Classifier, classify};
pub use config::Config;
pub use crate::core::{Artifact, ExtractionResult, FetchState, MediaBuffer, Target, TargetKind};
pub use error::{ExtractionFailure, FetchFailure, NeonError, Result};
pub use extract::{ExtractionAdapter, MediaResolver, ResolvedMedia};
pub use fetch::Fetcher;
pub use headers::headers_for;
pub use log::{EventLog, Level, LogEntry};
pub use probe::{Probe, probe};
pub use queue::{Diagnostics, Session};

#[cfg(feature = "ytdlp")]
pub use extract::YtDlpResolver;

/// Crate version with the git revision it was built from
pub const VERSION: &str = const_str::concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    git_version::git_version!(args = ["--always", "--dirty=-modified"], fallback = "unknown"),
    ")"
);
