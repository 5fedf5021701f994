//! Harness error type.
//!
//! Everything that can go wrong before or after a run: loading a world,
//! parsing a ground-truth file, reading a run configuration, writing or
//! verifying a report directory. Failures inside a run never surface here;
//! they end up in the report.

use linkscout_kernel::proof::canon::CanonError;
use linkscout_search::error::SearchError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// The world description is structurally invalid.
    #[error("invalid world: {detail}")]
    InvalidWorld { detail: String },

    /// The world description is not valid JSON for the schema.
    #[error("world parse error: {detail}")]
    WorldParse { detail: String },

    /// A ground-truth wiring file line could not be parsed.
    #[error("ground truth line {line}: {detail}")]
    GroundTruthParse { line: usize, detail: String },

    /// The run configuration is malformed or names something unknown.
    #[error("run configuration error: {detail}")]
    Config { detail: String },

    /// File system error while reading inputs or writing a report directory.
    #[error("I/O error: {detail}")]
    Io { detail: String },

    /// A report directory failed verification.
    #[error("report directory verification failed: {detail}")]
    Verify { detail: String },

    #[error(transparent)]
    Canon(#[from] CanonError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl HarnessError {
    pub(crate) fn io(context: &str, err: &std::io::Error) -> Self {
        Self::Io {
            detail: format!("{context}: {err}"),
        }
    }
}
