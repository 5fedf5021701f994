//! Typed search errors.
//!
//! `SearchError` represents pre-flight failures only: it is returned before
//! any session is opened. Runtime outcomes (sub-goal timeouts, stuck agents,
//! deaths, gates without candidates) are never errors; they are absorbed by
//! the strategies and surface in the run report.
//!
//! [`Interrupted`] is the single runtime error the actuation layer may raise.
//! It unwinds to the run entry point, which still returns a complete report.

/// Pre-flight validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("invalid engine configuration: {detail}")]
    InvalidConfig { detail: String },
    #[error("invalid {strategy} policy: {detail}")]
    InvalidPolicy {
        strategy: &'static str,
        detail: String,
    },
}

/// The actuation layer was cancelled from outside (e.g. a hard timeout
/// imposed by the caller, or the environment process went away).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("actuation interrupted: {detail}")]
pub struct Interrupted {
    pub detail: String,
}

impl Interrupted {
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
